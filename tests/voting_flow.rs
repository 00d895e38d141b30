//! End-to-end voting flow against both store implementations.
//!
//! Covers:
//! 1. Issuance: one token per active member, notified after persistence
//! 2. Results for a mixed ledger (accept / reject with reason / untouched)
//! 3. Write-once ballots, including concurrent submissions
//! 4. Missing justification leaves the token untouched
//! 5. Deadline closes voting but not discussion
//! 6. Replies cannot cross applications
//! 7. Creation is all-or-nothing: a token row failing midway leaves no
//!    application, no tokens and no invitations behind

use grantvote::store::SqliteStore;
use async_trait::async_trait;
use grantvote::voting::{
    ApplicationId, Ballot, Comment, CommentId, FixedClock, GrantApplication, IssuanceReport,
    MemberId, MemberUpdate, MemoryStore, MockNotifier, NewApplication, NewComment, NewMember,
    Stance, StoreError, StoreResult, Timestamp, TokenGrant, VoteState, VoteToken, VoteValue,
    VotingError, VotingMember, VotingService, VotingStore, VotingToken,
};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const CREATED: u64 = 1_800_000_000;
const DEADLINE: u64 = CREATED + 3600;

struct Harness<S: VotingStore> {
    service: VotingService<S, MockNotifier>,
    notifier: Arc<MockNotifier>,
    clock: Arc<FixedClock>,
}

fn harness<S: VotingStore>(store: S) -> Harness<S> {
    let notifier = Arc::new(MockNotifier::new());
    let clock = Arc::new(FixedClock::new(Timestamp(CREATED)));
    let service = VotingService::with_clock(Arc::new(store), Arc::clone(&notifier), clock.clone());
    Harness {
        service,
        notifier,
        clock,
    }
}

fn application(candidate: &str) -> NewApplication {
    NewApplication {
        submitter_name: "Grant Administrator".to_string(),
        candidate_full_name: candidate.to_string(),
        grant_type: grantvote::voting::GrantType::Stsm,
        date: "2027-03-10".to_string(),
        place: "Leiden".to_string(),
        amount_requested: 2400.0,
        currency: "EUR".to_string(),
        description: "Short-term scientific mission".to_string(),
        voting_deadline: Timestamp(DEADLINE),
    }
}

async fn seed_members<S: VotingStore>(h: &Harness<S>, count: usize) {
    for i in 0..count {
        h.service
            .add_member(
                &format!("Member {}", i),
                &format!("WG{} Leader", i + 1),
                &format!("member{}@example.org", i),
            )
            .await
            .unwrap();
    }
}

async fn create<S: VotingStore>(h: &Harness<S>, candidate: &str) -> IssuanceReport {
    h.service
        .create_application(application(candidate))
        .await
        .unwrap()
}

async fn sqlite() -> (TempDir, SqliteStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = SqliteStore::open(&temp_dir.path().join("grantvote.db"))
        .await
        .unwrap();
    (temp_dir, store)
}

/// Store whose active roster includes a member removed from the database
/// after the snapshot was taken, so the third token row of every creation
/// is rejected.
struct DepartedMemberStore<S> {
    inner: S,
    attempted: Mutex<Vec<VotingToken>>,
}

impl<S> DepartedMemberStore<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            attempted: Mutex::new(Vec::new()),
        }
    }

    fn attempted(&self) -> Vec<VotingToken> {
        self.attempted.lock().unwrap().clone()
    }
}

#[async_trait]
impl<S: VotingStore> VotingStore for DepartedMemberStore<S> {
    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }

    async fn insert_member(
        &self,
        member: &NewMember,
        created_at: Timestamp,
    ) -> StoreResult<VotingMember> {
        self.inner.insert_member(member, created_at).await
    }

    async fn update_member(
        &self,
        id: MemberId,
        update: &MemberUpdate,
    ) -> StoreResult<Option<VotingMember>> {
        self.inner.update_member(id, update).await
    }

    async fn get_member(&self, id: MemberId) -> StoreResult<Option<VotingMember>> {
        self.inner.get_member(id).await
    }

    async fn list_members(&self) -> StoreResult<Vec<VotingMember>> {
        self.inner.list_members().await
    }

    async fn active_members(&self) -> StoreResult<Vec<VotingMember>> {
        let mut members = self.inner.active_members().await?;
        let departed = VotingMember {
            id: MemberId(9_999),
            name: "Departed".to_string(),
            position: "Observer".to_string(),
            email: "departed@example.org".to_string(),
            is_active: true,
            created_at: Timestamp(0),
        };
        members.insert(2.min(members.len()), departed);
        Ok(members)
    }

    async fn insert_application(
        &self,
        application: &NewApplication,
        reference_code: &str,
        grants: &[TokenGrant],
        created_at: Timestamp,
    ) -> StoreResult<(GrantApplication, Vec<VoteToken>)> {
        self.attempted
            .lock()
            .unwrap()
            .extend(grants.iter().map(|g| g.token.clone()));
        self.inner
            .insert_application(application, reference_code, grants, created_at)
            .await
    }

    async fn get_application(&self, id: ApplicationId) -> StoreResult<Option<GrantApplication>> {
        self.inner.get_application(id).await
    }

    async fn get_application_by_reference(
        &self,
        reference_code: &str,
    ) -> StoreResult<Option<GrantApplication>> {
        self.inner.get_application_by_reference(reference_code).await
    }

    async fn list_applications(&self) -> StoreResult<Vec<GrantApplication>> {
        self.inner.list_applications().await
    }

    async fn set_application_active(&self, id: ApplicationId, active: bool) -> StoreResult<bool> {
        self.inner.set_application_active(id, active).await
    }

    async fn get_token(&self, token: &VotingToken) -> StoreResult<Option<VoteToken>> {
        self.inner.get_token(token).await
    }

    async fn tokens_for_application(&self, id: ApplicationId) -> StoreResult<Vec<VoteToken>> {
        self.inner.tokens_for_application(id).await
    }

    async fn record_vote(&self, token: &VotingToken, state: &VoteState) -> StoreResult<bool> {
        self.inner.record_vote(token, state).await
    }

    async fn append_comment(
        &self,
        comment: &NewComment,
        created_at: Timestamp,
    ) -> StoreResult<Comment> {
        self.inner.append_comment(comment, created_at).await
    }

    async fn get_comment(&self, id: CommentId) -> StoreResult<Option<Comment>> {
        self.inner.get_comment(id).await
    }

    async fn comments_for_application(&self, id: ApplicationId) -> StoreResult<Vec<Comment>> {
        self.inner.comments_for_application(id).await
    }
}

// ---- scenarios, generic over the store -----------------------------------

async fn scenario_issuance<S: VotingStore>(h: Harness<S>) {
    seed_members(&h, 3).await;
    let inactive = h
        .service
        .add_member("Former", "Observer", "former@example.org")
        .await
        .unwrap();
    h.service.deactivate_member(inactive.id).await.unwrap();

    let report = create(&h, "Jana Novak").await;
    assert!(report.application.reference_code.starts_with("CA"));
    assert_eq!(report.application.reference_code.len(), 8);
    assert_eq!(report.issued.len(), 3);
    assert!(report.notification_failures.is_empty());
    assert!(report.issued.iter().all(|t| t.member.id != inactive.id));

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 3);
    for issued in &report.issued {
        let stored = h
            .service
            .store()
            .get_token(&issued.token.token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.state, VoteState::Unvoted);
        assert!(sent.iter().any(|s| s.token == issued.token.token));
    }
}

async fn scenario_mixed_results<S: VotingStore>(h: Harness<S>) {
    seed_members(&h, 3).await;
    let report = create(&h, "Jana Novak").await;
    let tokens: Vec<_> = report.issued.iter().map(|t| t.token.token.clone()).collect();

    h.service.cast_vote(&tokens[0], Ballot::Accept).await.unwrap();
    h.service
        .cast_vote(
            &tokens[1],
            Ballot::Reject {
                reason: Some("budget too high".to_string()),
            },
        )
        .await
        .unwrap();

    let results = h.service.results(report.application.id).await.unwrap();
    let s = results.summary;
    assert_eq!((s.accept, s.reject, s.unvoted, s.voted, s.total), (1, 1, 1, 2, 3));
    assert_eq!(results.rejection_reasons, vec!["budget too high".to_string()]);
    assert_eq!(results.ballots.len(), 3);
    assert!(results
        .ballots
        .iter()
        .any(|b| b.vote == VoteValue::Unvoted && b.voted_at.is_none()));
}

async fn scenario_write_once<S: VotingStore>(h: Harness<S>) {
    seed_members(&h, 1).await;
    let report = create(&h, "Jana Novak").await;
    let token = report.issued[0].token.token.clone();

    h.service.cast_vote(&token, Ballot::Accept).await.unwrap();
    let err = h
        .service
        .cast_vote(
            &token,
            Ballot::Reject {
                reason: Some("changed my mind".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, VotingError::AlreadyVoted));

    let stored = h.service.store().get_token(&token).await.unwrap().unwrap();
    assert_eq!(stored.state.value(), VoteValue::Accept);
    assert!(stored.state.rejection_reason().is_none());
}

async fn scenario_missing_justification<S: VotingStore>(h: Harness<S>) {
    seed_members(&h, 2).await;
    let report = create(&h, "Jana Novak").await;
    let token = report.issued[1].token.token.clone();

    for reason in [None, Some(String::new()), Some(" \t ".to_string())] {
        let err = h
            .service
            .cast_vote(&token, Ballot::Reject { reason })
            .await
            .unwrap_err();
        assert!(matches!(err, VotingError::MissingJustification));
    }

    let stored = h.service.store().get_token(&token).await.unwrap().unwrap();
    assert_eq!(stored.state, VoteState::Unvoted);
}

async fn scenario_deadline<S: VotingStore>(h: Harness<S>) {
    seed_members(&h, 3).await;
    let report = create(&h, "Jana Novak").await;
    let token = report.issued[2].token.token.clone();

    // Exactly at the deadline voting is still open
    h.clock.set(Timestamp(DEADLINE));
    h.service
        .cast_vote(&report.issued[0].token.token, Ballot::Accept)
        .await
        .unwrap();

    h.clock.advance(1);
    let err = h.service.cast_vote(&token, Ballot::Accept).await.unwrap_err();
    assert!(matches!(err, VotingError::DeadlineExpired { .. }));
    let stored = h.service.store().get_token(&token).await.unwrap().unwrap();
    assert_eq!(stored.state, VoteState::Unvoted);

    let comment = h
        .service
        .add_comment(&token, "Missed the window, but for the record: support", Stance::Support, None)
        .await
        .unwrap();
    assert_eq!(comment.application_id, report.application.id);

    let ballot = h.service.ballot(&token).await.unwrap();
    assert!(!ballot.voting_open);
    assert_eq!(ballot.seconds_remaining, 0);
}

async fn scenario_cross_application_reply<S: VotingStore>(h: Harness<S>) {
    seed_members(&h, 1).await;
    let first = create(&h, "Jana Novak").await;
    let second = create(&h, "Ivo Horvat").await;
    let token_a = first.issued[0].token.token.clone();
    let token_b = second.issued[0].token.token.clone();

    let root = h
        .service
        .add_comment(&token_a, "Strong proposal", Stance::Support, None)
        .await
        .unwrap();
    let reply = h
        .service
        .add_comment(&token_a, "Agreed", Stance::Neutral, Some(root.id))
        .await
        .unwrap();
    assert_eq!(reply.parent_id, Some(root.id));

    let err = h
        .service
        .add_comment(&token_b, "Wrong thread", Stance::Oppose, Some(root.id))
        .await
        .unwrap_err();
    assert!(matches!(err, VotingError::CrossApplicationParent { .. }));

    let views = h.service.comments(first.application.id).await.unwrap();
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].id, reply.id);
    assert_eq!(views[0].voter_name, "Member 0");
    assert!(h
        .service
        .comments(second.application.id)
        .await
        .unwrap()
        .is_empty());
}

async fn scenario_concurrent_casts<S: VotingStore + 'static>(h: Harness<S>) {
    seed_members(&h, 1).await;
    let report = create(&h, "Jana Novak").await;
    let token = report.issued[0].token.token.clone();

    let mut handles = Vec::new();
    for i in 0..16 {
        let service = h.service.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            let ballot = if i % 2 == 0 {
                Ballot::Accept
            } else {
                Ballot::Reject {
                    reason: Some(format!("reason {}", i)),
                }
            };
            service.cast_vote(&token, ballot).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(VotingError::AlreadyVoted) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert_eq!(successes, 1);

    let results = h.service.results(report.application.id).await.unwrap();
    assert_eq!(results.summary.voted, 1);
    assert_eq!(results.summary.total, 1);
}

async fn scenario_notification_failure<S: VotingStore>(h: Harness<S>) {
    seed_members(&h, 3).await;
    h.notifier.fail_for("member1@example.org");

    let report = create(&h, "Jana Novak").await;
    assert_eq!(report.issued.len(), 3);
    assert_eq!(report.notified(), 2);
    assert_eq!(report.notification_failures.len(), 1);
    assert_eq!(report.notification_failures[0].email, "member1@example.org");

    // The undelivered token is still valid
    let failed = report
        .issued
        .iter()
        .find(|t| t.member.email == "member1@example.org")
        .unwrap();
    h.service
        .cast_vote(&failed.token.token, Ballot::Accept)
        .await
        .unwrap();
}

async fn scenario_creation_is_atomic<S: VotingStore>(store: S) {
    let h = harness(DepartedMemberStore::new(store));
    seed_members(&h, 4).await;

    let err = h
        .service
        .create_application(application("Jana Novak"))
        .await
        .unwrap_err();
    assert!(matches!(err, VotingError::Store(StoreError::NotFound(_))));

    assert!(h.service.list_applications().await.unwrap().is_empty());
    let attempted = h.service.store().attempted();
    assert_eq!(attempted.len(), 5);
    for token in &attempted {
        assert!(h.service.store().get_token(token).await.unwrap().is_none());
    }
    assert!(h.notifier.sent().is_empty());
}

// ---- MemoryStore ---------------------------------------------------------

#[tokio::test]
async fn memory_issuance() {
    scenario_issuance(harness(MemoryStore::new())).await;
}

#[tokio::test]
async fn memory_mixed_results() {
    scenario_mixed_results(harness(MemoryStore::new())).await;
}

#[tokio::test]
async fn memory_write_once() {
    scenario_write_once(harness(MemoryStore::new())).await;
}

#[tokio::test]
async fn memory_missing_justification() {
    scenario_missing_justification(harness(MemoryStore::new())).await;
}

#[tokio::test]
async fn memory_deadline() {
    scenario_deadline(harness(MemoryStore::new())).await;
}

#[tokio::test]
async fn memory_cross_application_reply() {
    scenario_cross_application_reply(harness(MemoryStore::new())).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn memory_concurrent_casts() {
    scenario_concurrent_casts(harness(MemoryStore::new())).await;
}

#[tokio::test]
async fn memory_notification_failure() {
    scenario_notification_failure(harness(MemoryStore::new())).await;
}

#[tokio::test]
async fn memory_store_outage_is_generic_failure() {
    let store = MemoryStore::new();
    let h = harness(store.clone());
    seed_members(&h, 1).await;
    let report = create(&h, "Jana Novak").await;

    store.set_unavailable(true);
    let err = h
        .service
        .cast_vote(&report.issued[0].token.token, Ballot::Accept)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "storage");
    assert!(h.service.health().await.is_err());
}

#[tokio::test]
async fn memory_creation_is_atomic() {
    scenario_creation_is_atomic(MemoryStore::new()).await;
}

// ---- SqliteStore ---------------------------------------------------------

#[tokio::test]
async fn sqlite_issuance() {
    let (_dir, store) = sqlite().await;
    scenario_issuance(harness(store)).await;
}

#[tokio::test]
async fn sqlite_mixed_results() {
    let (_dir, store) = sqlite().await;
    scenario_mixed_results(harness(store)).await;
}

#[tokio::test]
async fn sqlite_write_once() {
    let (_dir, store) = sqlite().await;
    scenario_write_once(harness(store)).await;
}

#[tokio::test]
async fn sqlite_missing_justification() {
    let (_dir, store) = sqlite().await;
    scenario_missing_justification(harness(store)).await;
}

#[tokio::test]
async fn sqlite_deadline() {
    let (_dir, store) = sqlite().await;
    scenario_deadline(harness(store)).await;
}

#[tokio::test]
async fn sqlite_cross_application_reply() {
    let (_dir, store) = sqlite().await;
    scenario_cross_application_reply(harness(store)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_concurrent_casts() {
    let (_dir, store) = sqlite().await;
    scenario_concurrent_casts(harness(store)).await;
}

#[tokio::test]
async fn sqlite_notification_failure() {
    let (_dir, store) = sqlite().await;
    scenario_notification_failure(harness(store)).await;
}

#[tokio::test]
async fn sqlite_ledger_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("grantvote.db");

    let (application_id, token) = {
        let h = harness(SqliteStore::open(&path).await.unwrap());
        seed_members(&h, 2).await;
        let report = create(&h, "Jana Novak").await;
        let token = report.issued[0].token.token.clone();
        h.service
            .cast_vote(
                &token,
                Ballot::Reject {
                    reason: Some("  incomplete budget  ".to_string()),
                },
            )
            .await
            .unwrap();
        h.service.store().close().await;
        (report.application.id, token)
    };

    let h = harness(SqliteStore::open(&path).await.unwrap());
    let results = h.service.results(application_id).await.unwrap();
    assert_eq!(results.summary.reject, 1);
    assert_eq!(results.summary.total, 2);
    assert_eq!(results.rejection_reasons, vec!["incomplete budget".to_string()]);

    let err = h.service.cast_vote(&token, Ballot::Accept).await.unwrap_err();
    assert!(matches!(err, VotingError::AlreadyVoted));
}

#[tokio::test]
async fn sqlite_creation_is_atomic() {
    let (_dir, store) = sqlite().await;
    scenario_creation_is_atomic(store).await;
}
