//! Property-based tests for the ledger and aggregator
//!
//! Tests for:
//! - Write-once: at most one successful cast per token
//! - Reason iff reject
//! - Tally consistency: accept + reject + unvoted == total, voted == cast tokens

use super::ledger::cast_vote;
use super::mock::MemoryStore;
use super::results::compute_results;
use super::traits::VotingStore;
use super::types::*;
use super::VotingError;
use proptest::prelude::*;
use std::collections::HashMap;

const DEADLINE: u64 = 500;

#[derive(Debug, Clone)]
struct Attempt {
    voter: usize,
    reject: bool,
    reason: Option<String>,
    at: u64,
}

fn attempt_strategy(voters: usize) -> impl Strategy<Value = Attempt> {
    (
        0..voters,
        any::<bool>(),
        prop::option::of(prop_oneof![Just(String::new()), Just("  ".to_string()), "[a-z ]{1,20}"]),
        0u64..(DEADLINE * 2),
    )
        .prop_map(|(voter, reject, reason, at)| Attempt {
            voter,
            reject,
            reason,
            at,
        })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn setup(voters: usize) -> (MemoryStore, ApplicationId, Vec<VotingToken>) {
    let store = MemoryStore::new();
    let mut grants = Vec::new();
    for i in 0..voters {
        let member = store
            .insert_member(
                &NewMember {
                    name: format!("m{}", i),
                    position: "WG".to_string(),
                    email: format!("m{}@x.org", i),
                },
                Timestamp(0),
            )
            .await
            .unwrap();
        grants.push(TokenGrant {
            token: VotingToken::new(format!("t{}", i)),
            member_id: member.id,
        });
    }
    let (app, _) = store
        .insert_application(
            &NewApplication {
                submitter_name: "Admin".to_string(),
                candidate_full_name: "Candidate".to_string(),
                grant_type: GrantType::Stsm,
                date: "2026-12-01".to_string(),
                place: "Halle".to_string(),
                amount_requested: 1.0,
                currency: "EUR".to_string(),
                description: String::new(),
                voting_deadline: Timestamp(DEADLINE),
            },
            "CA000000",
            &grants,
            Timestamp(0),
        )
        .await
        .unwrap();
    let tokens = grants.into_iter().map(|g| g.token).collect();
    (store, app.id, tokens)
}

proptest! {
    /// Property: For any interleaving of cast attempts, each token succeeds at
    /// most once, its stored state is the first successful ballot, and the
    /// tally always partitions the issued tokens.
    #[test]
    fn ledger_is_write_once_and_tally_consistent(
        voters in 1usize..6,
        attempts in prop::collection::vec(attempt_strategy(6), 0..40),
    ) {
        runtime().block_on(async {
            let (store, app, tokens) = setup(voters).await;
            let mut first_success: HashMap<usize, VoteState> = HashMap::new();

            for attempt in attempts.iter().filter(|a| a.voter < voters) {
                let ballot = if attempt.reject {
                    Ballot::Reject { reason: attempt.reason.clone() }
                } else {
                    Ballot::Accept
                };

                match cast_vote(&store, &tokens[attempt.voter], ballot, Timestamp(attempt.at)).await {
                    Ok(record) => {
                        prop_assert!(attempt.at <= DEADLINE);
                        prop_assert!(
                            first_success.insert(attempt.voter, record.state.clone()).is_none(),
                            "token succeeded twice"
                        );
                    }
                    Err(VotingError::DeadlineExpired { .. }) => prop_assert!(attempt.at > DEADLINE),
                    Err(VotingError::AlreadyVoted) => {
                        prop_assert!(first_success.contains_key(&attempt.voter));
                    }
                    Err(VotingError::MissingJustification) => {
                        prop_assert!(attempt.reject);
                        prop_assert!(attempt
                            .reason
                            .as_deref()
                            .map(|r| r.trim().is_empty())
                            .unwrap_or(true));
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {:?}", other),
                }
            }

            for (i, token) in tokens.iter().enumerate() {
                let stored = store.get_token(token).await.unwrap().unwrap();
                match first_success.get(&i) {
                    Some(state) => prop_assert_eq!(&stored.state, state),
                    None => prop_assert_eq!(&stored.state, &VoteState::Unvoted),
                }
                match &stored.state {
                    VoteState::Rejected { reason, .. } => prop_assert!(!reason.trim().is_empty()),
                    other => prop_assert!(other.rejection_reason().is_none()),
                }
            }

            let results = compute_results(&store, app).await.unwrap();
            let s = results.summary;
            prop_assert_eq!(s.total as usize, voters);
            prop_assert_eq!(s.accept + s.reject + s.unvoted, s.total);
            prop_assert_eq!(s.voted as usize, first_success.len());
            prop_assert_eq!(results.rejection_reasons.len(), s.reject as usize);
            Ok(())
        })?;
    }
}
