//! Comment thread store
//!
//! Append-only discussion per application. Replies reference their parent
//! by id; the parent must already exist and belong to the same application,
//! which keeps the reply graph an acyclic tree.
//!
//! Comments are deliberately not gated by the voting deadline, by the
//! commenter's vote state, or by the application's active flag.

use super::error::{VotingError, VotingResult};
use super::traits::VotingStore;
use super::types::*;
use serde::Serialize;
use std::collections::HashMap;

/// Append a comment by `member_id` on `application_id`.
pub async fn add_comment<S: VotingStore + ?Sized>(
    store: &S,
    application_id: ApplicationId,
    member_id: MemberId,
    content: &str,
    stance: Stance,
    parent_id: Option<CommentId>,
    now: Timestamp,
) -> VotingResult<Comment> {
    let content = content.trim();
    if content.is_empty() {
        return Err(VotingError::EmptyComment);
    }

    if let Some(parent_id) = parent_id {
        let parent = store
            .get_comment(parent_id)
            .await?
            .ok_or(VotingError::UnknownParent(parent_id))?;
        if parent.application_id != application_id {
            tracing::warn!(
                application_id = %application_id,
                parent = %parent_id,
                parent_application = %parent.application_id,
                "reply refused: parent belongs to another application"
            );
            return Err(VotingError::CrossApplicationParent {
                parent: parent_id,
                parent_application: parent.application_id,
                application: application_id,
            });
        }
    }

    let comment = store
        .append_comment(
            &NewComment {
                application_id,
                member_id,
                parent_id,
                content: content.to_string(),
                stance,
            },
            now,
        )
        .await?;

    tracing::debug!(
        application_id = %application_id,
        comment_id = %comment.id,
        stance = %stance,
        "comment added"
    );
    Ok(comment)
}

/// Comment joined with its author, as shown to voters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    pub id: CommentId,
    pub parent_id: Option<CommentId>,
    pub content: String,
    pub stance: Stance,
    pub voter_name: String,
    pub voter_position: String,
    pub created_at: Timestamp,
}

/// Comments for an application, newest first
pub async fn list_comments<S: VotingStore + ?Sized>(
    store: &S,
    application_id: ApplicationId,
) -> VotingResult<Vec<CommentView>> {
    let members: HashMap<MemberId, VotingMember> = store
        .list_members()
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();

    let views = store
        .comments_for_application(application_id)
        .await?
        .into_iter()
        .map(|c| {
            let (voter_name, voter_position) = members
                .get(&c.member_id)
                .map(|m| (m.name.clone(), m.position.clone()))
                .unwrap_or_default();
            CommentView {
                id: c.id,
                parent_id: c.parent_id,
                content: c.content,
                stance: c.stance,
                voter_name,
                voter_position,
                created_at: c.created_at,
            }
        })
        .collect();

    Ok(views)
}
