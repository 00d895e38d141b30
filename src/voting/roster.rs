//! Voting member roster
//!
//! Members are never hard-deleted. The active flag only decides who gets a
//! token for applications created afterwards; tokens already issued to a
//! member stay valid after deactivation.

use super::error::{StoreError, VotingError, VotingResult};
use super::traits::VotingStore;
use super::types::*;

fn non_empty(field: &'static str, value: &str) -> Result<String, ParseError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ParseError::MissingField(field));
    }
    Ok(value.to_string())
}

fn map_conflict(err: StoreError, email: &str) -> VotingError {
    match err {
        StoreError::Conflict(_) => VotingError::DuplicateMember(email.to_string()),
        other => other.into(),
    }
}

/// Add an active member
pub async fn add_member<S: VotingStore + ?Sized>(
    store: &S,
    name: &str,
    position: &str,
    email: &str,
    now: Timestamp,
) -> VotingResult<VotingMember> {
    let member = NewMember {
        name: non_empty("name", name)?,
        position: non_empty("position", position)?,
        email: validate_email(email)?,
    };

    let record = store
        .insert_member(&member, now)
        .await
        .map_err(|e| map_conflict(e, &member.email))?;
    tracing::info!(member_id = %record.id, position = %record.position, "voting member added");
    Ok(record)
}

/// Apply a partial update to a member
pub async fn update_member<S: VotingStore + ?Sized>(
    store: &S,
    id: MemberId,
    update: MemberUpdate,
) -> VotingResult<VotingMember> {
    let update = MemberUpdate {
        name: update.name.as_deref().map(|n| non_empty("name", n)).transpose()?,
        position: update
            .position
            .as_deref()
            .map(|p| non_empty("position", p))
            .transpose()?,
        email: update.email.as_deref().map(validate_email).transpose()?,
        is_active: update.is_active,
    };

    let email = update.email.clone().unwrap_or_default();
    let record = store
        .update_member(id, &update)
        .await
        .map_err(|e| map_conflict(e, &email))?
        .ok_or(VotingError::UnknownMember(id))?;
    tracing::info!(member_id = %id, active = record.is_active, "voting member updated");
    Ok(record)
}

/// Soft-delete a member
pub async fn deactivate_member<S: VotingStore + ?Sized>(
    store: &S,
    id: MemberId,
) -> VotingResult<VotingMember> {
    update_member(
        store,
        id,
        MemberUpdate {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
}
