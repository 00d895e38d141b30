//! Token issuer
//!
//! Mints one voting token per active member when an application is created.
//! Tokens carry 256 bits from the system CSPRNG, hex-encoded.
//!
//! The application and its full token set are written in one store call;
//! invitations go out only once that write has succeeded. A failed delivery
//! is logged and reported in the `IssuanceReport`; it is never retried here
//! and never rolls back the token.

use super::error::{VotingError, VotingResult};
use super::reference;
use super::traits::{Notifier, VotingStore};
use super::types::*;
use futures::future::join_all;
use ring::rand::{SecureRandom, SystemRandom};
use serde::Serialize;

/// Random bytes per token (256 bits)
pub const TOKEN_BYTES: usize = 32;

/// Attempts to mint a token set that does not collide with the store
pub const MAX_TOKEN_ATTEMPTS: u32 = 4;

/// Per-recipient delivery failure, collected for operator visibility
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationFailure {
    pub member_id: MemberId,
    pub email: String,
    pub reason: String,
}

/// Token issued to one member
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub member: VotingMember,
    pub token: VoteToken,
}

/// Outcome of issuing tokens for one application
#[derive(Debug, Clone)]
pub struct IssuanceReport {
    pub application: GrantApplication,
    pub issued: Vec<IssuedToken>,
    pub notification_failures: Vec<NotificationFailure>,
}

impl IssuanceReport {
    pub fn notified(&self) -> usize {
        self.issued.len() - self.notification_failures.len()
    }
}

/// Mints voting tokens
pub struct TokenIssuer {
    rng: SystemRandom,
}

impl Default for TokenIssuer {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenIssuer {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    /// Generate a fresh token string
    pub fn mint(&self) -> VotingResult<VotingToken> {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng.fill(&mut bytes).map_err(|_| VotingError::Entropy)?;
        Ok(VotingToken::new(hex::encode(bytes)))
    }

    /// One fresh grant per voter, in voter order
    pub fn mint_grants(&self, voters: &[VotingMember]) -> VotingResult<Vec<TokenGrant>> {
        voters
            .iter()
            .map(|member| {
                Ok(TokenGrant {
                    token: self.mint()?,
                    member_id: member.id,
                })
            })
            .collect()
    }

    /// Persist `application` with one token per member in the `voters`
    /// snapshot, then notify each member.
    ///
    /// Nothing is notified unless the application and every token were
    /// stored.
    pub async fn create_and_issue<S, N, F>(
        &self,
        store: &S,
        notifier: &N,
        application: &NewApplication,
        voters: Vec<VotingMember>,
        created_at: Timestamp,
        next_code: F,
    ) -> VotingResult<IssuanceReport>
    where
        S: VotingStore + ?Sized,
        N: Notifier + ?Sized,
        F: FnMut() -> String,
    {
        let (record, tokens) = reference::allocate(store, application, created_at, next_code, || {
            self.mint_grants(&voters)
        })
        .await?;

        let issued: Vec<IssuedToken> = voters
            .into_iter()
            .zip(tokens)
            .map(|(member, token)| IssuedToken { member, token })
            .collect();

        tracing::info!(
            application_id = %record.id,
            reference_code = %record.reference_code,
            grant_type = %record.grant_type,
            tokens = issued.len(),
            "grant application created, voting tokens issued"
        );

        let notification_failures = self.notify_all(notifier, &record, &issued).await;
        Ok(IssuanceReport {
            application: record,
            issued,
            notification_failures,
        })
    }

    async fn notify_all<N: Notifier + ?Sized>(
        &self,
        notifier: &N,
        application: &GrantApplication,
        issued: &[IssuedToken],
    ) -> Vec<NotificationFailure> {
        let summary = application.summary();
        let deliveries = issued.iter().map(|entry| {
            let summary = &summary;
            async move {
                notifier
                    .notify(&entry.member, summary, &entry.token.token)
                    .await
                    .map_err(|e| NotificationFailure {
                        member_id: entry.member.id,
                        email: entry.member.email.clone(),
                        reason: e.to_string(),
                    })
            }
        });

        let failures: Vec<NotificationFailure> = join_all(deliveries)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();

        for failure in &failures {
            tracing::warn!(
                application_id = %application.id,
                member_id = %failure.member_id,
                email = %failure.email,
                reason = %failure.reason,
                "voting invitation not delivered"
            );
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voting::error::StoreError;
    use crate::voting::mock::{MemoryStore, MockNotifier};
    use std::collections::HashSet;

    async fn seed(store: &MemoryStore, emails: &[&str]) -> Vec<VotingMember> {
        let mut members = Vec::new();
        for email in emails {
            let member = store
                .insert_member(
                    &NewMember {
                        name: email.to_string(),
                        position: "WG Leader".to_string(),
                        email: email.to_string(),
                    },
                    Timestamp(1),
                )
                .await
                .unwrap();
            members.push(member);
        }
        members
    }

    fn new_application() -> NewApplication {
        NewApplication {
            submitter_name: "Admin".to_string(),
            candidate_full_name: "Candidate".to_string(),
            grant_type: GrantType::Stsm,
            date: "2026-12-01".to_string(),
            place: "Skopje".to_string(),
            amount_requested: 1200.0,
            currency: "EUR".to_string(),
            description: String::new(),
            voting_deadline: Timestamp(10_000),
        }
    }

    async fn issue(
        store: &MemoryStore,
        notifier: &MockNotifier,
        voters: Vec<VotingMember>,
    ) -> VotingResult<IssuanceReport> {
        TokenIssuer::new()
            .create_and_issue(
                store,
                notifier,
                &new_application(),
                voters,
                Timestamp(3),
                reference::generate_reference_code,
            )
            .await
    }

    #[test]
    fn test_minted_tokens_are_256_bit_and_distinct() {
        let issuer = TokenIssuer::new();
        let mut seen = HashSet::new();
        for _ in 0..256 {
            let token = issuer.mint().unwrap();
            assert_eq!(token.as_str().len(), TOKEN_BYTES * 2);
            assert!(token.as_str().chars().all(|c| c.is_ascii_hexdigit()));
            assert!(seen.insert(token));
        }
    }

    #[tokio::test]
    async fn test_one_unvoted_token_per_voter() {
        let store = MemoryStore::new();
        let notifier = MockNotifier::new();
        let voters = seed(&store, &["a@x.org", "b@x.org", "c@x.org"]).await;

        let report = issue(&store, &notifier, voters).await.unwrap();
        let app = report.application.clone();

        assert_eq!(report.issued.len(), 3);
        assert!(report.notification_failures.is_empty());
        assert_eq!(report.notified(), 3);

        let tokens = store.tokens_for_application(app.id).await.unwrap();
        assert_eq!(tokens.len(), 3);
        assert!(tokens.iter().all(|t| t.state == VoteState::Unvoted));
        let members: HashSet<_> = tokens.iter().map(|t| t.member_id).collect();
        assert_eq!(members.len(), 3);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|n| n.reference_code == app.reference_code));
    }

    #[tokio::test]
    async fn test_notification_failure_keeps_token() {
        let store = MemoryStore::new();
        let notifier = MockNotifier::new();
        notifier.fail_for("b@x.org");
        let voters = seed(&store, &["a@x.org", "b@x.org", "c@x.org"]).await;

        let report = issue(&store, &notifier, voters).await.unwrap();

        assert_eq!(report.issued.len(), 3);
        assert_eq!(report.notification_failures.len(), 1);
        assert_eq!(report.notification_failures[0].email, "b@x.org");
        assert_eq!(notifier.sent().len(), 2);

        let failed = report
            .issued
            .iter()
            .find(|i| i.member.email == "b@x.org")
            .unwrap();
        let stored = store.get_token(&failed.token.token).await.unwrap();
        assert_eq!(stored.unwrap().state, VoteState::Unvoted);
    }

    #[tokio::test]
    async fn test_issued_tokens_follow_voter_order() {
        let store = MemoryStore::new();
        let notifier = MockNotifier::new();
        let voters = seed(&store, &["a@x.org", "b@x.org"]).await;

        let report = issue(&store, &notifier, voters.clone()).await.unwrap();
        for (entry, voter) in report.issued.iter().zip(&voters) {
            assert_eq!(entry.member.id, voter.id);
            assert_eq!(entry.token.member_id, voter.id);
        }
    }

    #[tokio::test]
    async fn test_store_outage_fails_issuance() {
        let store = MemoryStore::new();
        let notifier = MockNotifier::new();
        let voters = seed(&store, &["a@x.org"]).await;
        store.set_unavailable(true);

        let err = issue(&store, &notifier, voters).await.unwrap_err();
        assert!(matches!(err, VotingError::Store(StoreError::Unavailable(_))));
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_vanished_voter_aborts_creation_without_notifying() {
        let store = MemoryStore::new();
        let notifier = MockNotifier::new();
        let mut voters = seed(&store, &["a@x.org", "b@x.org"]).await;
        let mut ghost = voters[1].clone();
        ghost.id = MemberId(999);
        ghost.email = "ghost@x.org".to_string();
        voters.push(ghost);

        let err = issue(&store, &notifier, voters).await.unwrap_err();
        assert!(matches!(err, VotingError::Store(StoreError::NotFound(_))));
        assert!(store.list_applications().await.unwrap().is_empty());
        assert!(notifier.sent().is_empty());
    }
}
