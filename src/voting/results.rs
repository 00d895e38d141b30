//! Result aggregation
//!
//! Tallies are always derived from the ledger on demand. There is no cached
//! counter to drift from the tokens of record.

use super::error::{VotingError, VotingResult};
use super::traits::VotingStore;
use super::types::*;
use serde::Serialize;
use std::collections::HashMap;

/// Vote counts for one application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteSummary {
    pub accept: u32,
    pub reject: u32,
    pub unvoted: u32,
    pub voted: u32,
    /// Tokens issued; eligibility is frozen at issuance
    pub total: u32,
}

impl VoteSummary {
    /// Tally a set of tokens
    pub fn tally<'a>(tokens: impl IntoIterator<Item = &'a VoteToken>) -> Self {
        let mut summary = VoteSummary::default();
        for token in tokens {
            match token.state.value() {
                VoteValue::Accept => summary.accept += 1,
                VoteValue::Reject => summary.reject += 1,
                VoteValue::Unvoted => summary.unvoted += 1,
            }
            summary.total += 1;
        }
        summary.voted = summary.accept + summary.reject;
        summary
    }
}

/// One issued ballot, as shown in the results view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BallotView {
    pub voter_name: String,
    pub voter_position: String,
    pub vote: VoteValue,
    pub rejection_reason: Option<String>,
    pub voted_at: Option<Timestamp>,
}

/// Aggregated results of an application
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteResults {
    pub application: ApplicationSummary,
    pub summary: VoteSummary,
    pub rejection_reasons: Vec<String>,
    pub ballots: Vec<BallotView>,
}

/// Compute results for an application from its tokens.
pub async fn compute_results<S: VotingStore + ?Sized>(
    store: &S,
    application_id: ApplicationId,
) -> VotingResult<VoteResults> {
    let application = store
        .get_application(application_id)
        .await?
        .ok_or(VotingError::UnknownApplication(application_id))?;

    let tokens = store.tokens_for_application(application_id).await?;
    let members: HashMap<MemberId, VotingMember> = store
        .list_members()
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();

    let summary = VoteSummary::tally(&tokens);

    let rejection_reasons = tokens
        .iter()
        .filter_map(|t| t.state.rejection_reason())
        .map(str::to_string)
        .collect();

    let ballots = tokens
        .iter()
        .map(|t| {
            let (voter_name, voter_position) = members
                .get(&t.member_id)
                .map(|m| (m.name.clone(), m.position.clone()))
                .unwrap_or_default();
            BallotView {
                voter_name,
                voter_position,
                vote: t.state.value(),
                rejection_reason: t.state.rejection_reason().map(str::to_string),
                voted_at: t.state.cast_at(),
            }
        })
        .collect();

    Ok(VoteResults {
        application: application.summary(),
        summary,
        rejection_reasons,
        ballots,
    })
}
