//! Voting service
//!
//! Inbound request surface: create application, cast vote by token, add
//! comment by token, fetch results, plus roster and application admin.
//! Collaborators are passed in at construction; the service holds no
//! mutable state of its own and is cheap to clone across tasks.

use super::comments::{self, CommentView};
use super::deadline;
use super::error::{VotingError, VotingResult};
use super::issuer::{IssuanceReport, TokenIssuer};
use super::ledger;
use super::reference;
use super::results::{self, VoteResults, VoteSummary};
use super::roster;
use super::traits::{Clock, Notifier, SystemClock, VotingStore};
use super::types::*;
use serde::Serialize;
use std::sync::Arc;

/// Application with its live vote summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationDetail {
    pub application: GrantApplication,
    pub summary: VoteSummary,
    pub voting_open: bool,
}

/// What a token holder sees before voting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BallotContext {
    pub application: GrantApplication,
    pub voter_name: String,
    pub voter_position: String,
    pub vote: VoteValue,
    pub voting_open: bool,
    pub seconds_remaining: u64,
}

pub struct VotingService<S: ?Sized, N: ?Sized> {
    store: Arc<S>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
    issuer: Arc<TokenIssuer>,
}

impl<S: ?Sized, N: ?Sized> Clone for VotingService<S, N> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            clock: Arc::clone(&self.clock),
            issuer: Arc::clone(&self.issuer),
        }
    }
}

impl<S, N> VotingService<S, N>
where
    S: VotingStore + ?Sized,
    N: Notifier + ?Sized,
{
    /// Create a service using the wall clock
    pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self {
        Self::with_clock(store, notifier, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, notifier: Arc<N>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            notifier,
            clock,
            issuer: Arc::new(TokenIssuer::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Store health check
    pub async fn health(&self) -> VotingResult<()> {
        self.store.ping().await.map_err(Into::into)
    }

    // ---- roster -------------------------------------------------------

    pub async fn add_member(
        &self,
        name: &str,
        position: &str,
        email: &str,
    ) -> VotingResult<VotingMember> {
        roster::add_member(&*self.store, name, position, email, self.now()).await
    }

    pub async fn update_member(
        &self,
        id: MemberId,
        update: MemberUpdate,
    ) -> VotingResult<VotingMember> {
        roster::update_member(&*self.store, id, update).await
    }

    pub async fn deactivate_member(&self, id: MemberId) -> VotingResult<VotingMember> {
        roster::deactivate_member(&*self.store, id).await
    }

    pub async fn list_members(&self) -> VotingResult<Vec<VotingMember>> {
        Ok(self.store.list_members().await?)
    }

    // ---- applications -------------------------------------------------

    /// Create an application and issue a token to every currently active
    /// member.
    pub async fn create_application(
        &self,
        application: NewApplication,
    ) -> VotingResult<IssuanceReport> {
        self.create_application_with_codes(application, reference::generate_reference_code)
            .await
    }

    /// As `create_application`, drawing reference codes from `next_code`
    pub async fn create_application_with_codes<F>(
        &self,
        application: NewApplication,
        next_code: F,
    ) -> VotingResult<IssuanceReport>
    where
        F: FnMut() -> String + Send,
    {
        let now = self.now();
        let voters = self.store.active_members().await?;
        self.issuer
            .create_and_issue(
                &*self.store,
                &*self.notifier,
                &application,
                voters,
                now,
                next_code,
            )
            .await
    }

    pub async fn application(&self, id: ApplicationId) -> VotingResult<GrantApplication> {
        self.store
            .get_application(id)
            .await?
            .ok_or(VotingError::UnknownApplication(id))
    }

    pub async fn application_by_reference(
        &self,
        reference_code: &str,
    ) -> VotingResult<Option<GrantApplication>> {
        Ok(self.store.get_application_by_reference(reference_code).await?)
    }

    pub async fn application_detail(&self, id: ApplicationId) -> VotingResult<ApplicationDetail> {
        let application = self.application(id).await?;
        let tokens = self.store.tokens_for_application(id).await?;
        Ok(ApplicationDetail {
            voting_open: deadline::is_open(&application, self.now()),
            summary: VoteSummary::tally(&tokens),
            application,
        })
    }

    pub async fn list_applications(&self) -> VotingResult<Vec<GrantApplication>> {
        Ok(self.store.list_applications().await?)
    }

    /// Soft-close an application (listing only; voting follows the deadline)
    pub async fn close_application(&self, id: ApplicationId) -> VotingResult<()> {
        if !self.store.set_application_active(id, false).await? {
            return Err(VotingError::UnknownApplication(id));
        }
        tracing::info!(application_id = %id, "grant application closed");
        Ok(())
    }

    // ---- token holder actions -----------------------------------------

    async fn resolve(&self, token: &VotingToken) -> VotingResult<VoteToken> {
        self.store
            .get_token(token)
            .await?
            .ok_or(VotingError::UnknownToken)
    }

    /// Everything a voter needs to see before casting
    pub async fn ballot(&self, token: &VotingToken) -> VotingResult<BallotContext> {
        let record = self.resolve(token).await?;
        let application = self.application(record.application_id).await?;
        let member = self
            .store
            .get_member(record.member_id)
            .await?
            .ok_or(VotingError::UnknownMember(record.member_id))?;
        let now = self.now();

        Ok(BallotContext {
            voting_open: deadline::is_open(&application, now),
            seconds_remaining: deadline::remaining_secs(&application, now),
            vote: record.state.value(),
            voter_name: member.name,
            voter_position: member.position,
            application,
        })
    }

    pub async fn cast_vote(&self, token: &VotingToken, ballot: Ballot) -> VotingResult<VoteToken> {
        ledger::cast_vote(&*self.store, token, ballot, self.now()).await
    }

    /// Comment as the holder of `token`; not gated by the deadline
    pub async fn add_comment(
        &self,
        token: &VotingToken,
        content: &str,
        stance: Stance,
        parent_id: Option<CommentId>,
    ) -> VotingResult<Comment> {
        let record = self.resolve(token).await?;
        comments::add_comment(
            &*self.store,
            record.application_id,
            record.member_id,
            content,
            stance,
            parent_id,
            self.now(),
        )
        .await
    }

    pub async fn comments(&self, application_id: ApplicationId) -> VotingResult<Vec<CommentView>> {
        self.application(application_id).await?;
        comments::list_comments(&*self.store, application_id).await
    }

    pub async fn results(&self, application_id: ApplicationId) -> VotingResult<VoteResults> {
        results::compute_results(&*self.store, application_id).await
    }
}
