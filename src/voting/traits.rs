//! Collaborator trait abstractions
//!
//! The core talks to storage, notification delivery and the wall clock only
//! through these traits, so every rule can be exercised against
//! `MemoryStore`, `MockNotifier` and `FixedClock`.

use super::error::{NotifyError, StoreResult};
use super::types::*;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// Durable store consumed by the voting core.
///
/// Uniqueness violations (member email, reference code, token string,
/// application/member pair) surface as `StoreError::Conflict`.
#[async_trait]
pub trait VotingStore: Send + Sync {
    /// Cheap liveness check
    async fn ping(&self) -> StoreResult<()>;

    async fn insert_member(&self, member: &NewMember, created_at: Timestamp)
        -> StoreResult<VotingMember>;

    /// Apply a partial update and return the resulting record
    async fn update_member(&self, id: MemberId, update: &MemberUpdate)
        -> StoreResult<Option<VotingMember>>;

    async fn get_member(&self, id: MemberId) -> StoreResult<Option<VotingMember>>;

    /// All members ordered by id
    async fn list_members(&self) -> StoreResult<Vec<VotingMember>>;

    /// Active members ordered by id (issuance snapshot)
    async fn active_members(&self) -> StoreResult<Vec<VotingMember>>;

    /// Persist an application together with one unvoted token per grant.
    ///
    /// All or nothing: if any row is rejected, neither the application nor
    /// any of its tokens is stored. Tokens come back in `grants` order.
    async fn insert_application(
        &self,
        application: &NewApplication,
        reference_code: &str,
        grants: &[TokenGrant],
        created_at: Timestamp,
    ) -> StoreResult<(GrantApplication, Vec<VoteToken>)>;

    async fn get_application(&self, id: ApplicationId) -> StoreResult<Option<GrantApplication>>;

    async fn get_application_by_reference(
        &self,
        reference_code: &str,
    ) -> StoreResult<Option<GrantApplication>>;

    /// All applications, newest first
    async fn list_applications(&self) -> StoreResult<Vec<GrantApplication>>;

    /// Returns false if the application does not exist
    async fn set_application_active(&self, id: ApplicationId, active: bool) -> StoreResult<bool>;

    async fn get_token(&self, token: &VotingToken) -> StoreResult<Option<VoteToken>>;

    /// All tokens issued for an application, in issuance order
    async fn tokens_for_application(&self, id: ApplicationId) -> StoreResult<Vec<VoteToken>>;

    /// Compare-and-set from `Unvoted` to `state`.
    ///
    /// Returns true iff this call performed the transition. Must be atomic
    /// with respect to concurrent calls for the same token.
    async fn record_vote(&self, token: &VotingToken, state: &VoteState) -> StoreResult<bool>;

    async fn append_comment(&self, comment: &NewComment, created_at: Timestamp)
        -> StoreResult<Comment>;

    async fn get_comment(&self, id: CommentId) -> StoreResult<Option<Comment>>;

    /// Comments for an application, newest first, ties broken by
    /// descending insertion order
    async fn comments_for_application(&self, id: ApplicationId) -> StoreResult<Vec<Comment>>;
}

/// Outbound notification capability
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a voting invitation to one member
    async fn notify(
        &self,
        recipient: &VotingMember,
        application: &ApplicationSummary,
        token: &VotingToken,
    ) -> Result<(), NotifyError>;
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Manually driven clock for tests and replays
#[derive(Debug, Default)]
pub struct FixedClock(AtomicU64);

impl FixedClock {
    pub fn new(at: Timestamp) -> Self {
        Self(AtomicU64::new(at.as_secs()))
    }

    pub fn set(&self, at: Timestamp) {
        self.0.store(at.as_secs(), Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.0.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_advances() {
        let clock = FixedClock::new(Timestamp(100));
        assert_eq!(clock.now(), Timestamp(100));
        clock.advance(5);
        assert_eq!(clock.now(), Timestamp(105));
        clock.set(Timestamp(1));
        assert_eq!(clock.now(), Timestamp(1));
    }
}
