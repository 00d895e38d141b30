//! Vote ledger
//!
//! `cast_vote` checks, in order: token exists, deadline not passed, token
//! still unvoted, rejection carries a reason. The write itself is a
//! compare-and-set on the unvoted state, so of any number of concurrent
//! casts for one token exactly one succeeds and the rest see
//! `AlreadyVoted`. There is no update or delete for a cast vote.

use super::deadline;
use super::error::{StoreError, VotingError, VotingResult};
use super::traits::VotingStore;
use super::types::*;

/// Cast a ballot with `token` at time `now`.
pub async fn cast_vote<S: VotingStore + ?Sized>(
    store: &S,
    token: &VotingToken,
    ballot: Ballot,
    now: Timestamp,
) -> VotingResult<VoteToken> {
    let record = store
        .get_token(token)
        .await?
        .ok_or(VotingError::UnknownToken)?;

    let application = store
        .get_application(record.application_id)
        .await?
        .ok_or_else(|| {
            StoreError::Corrupt(format!(
                "token references missing application {}",
                record.application_id
            ))
        })?;

    if let Err(e) = deadline::ensure_open(&application, now) {
        tracing::info!(
            application_id = %application.id,
            member_id = %record.member_id,
            "vote refused after deadline"
        );
        return Err(e);
    }

    if record.state.is_cast() {
        return Err(VotingError::AlreadyVoted);
    }

    let state = match ballot {
        Ballot::Accept => VoteState::Accepted { cast_at: now },
        Ballot::Reject { reason } => {
            let reason = reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .ok_or(VotingError::MissingJustification)?;
            VoteState::Rejected {
                reason,
                cast_at: now,
            }
        }
    };

    if !store.record_vote(token, &state).await? {
        tracing::info!(
            application_id = %application.id,
            member_id = %record.member_id,
            "concurrent cast lost the race"
        );
        return Err(VotingError::AlreadyVoted);
    }

    tracing::info!(
        application_id = %application.id,
        member_id = %record.member_id,
        vote = %state.value(),
        "vote cast"
    );

    Ok(VoteToken { state, ..record })
}
