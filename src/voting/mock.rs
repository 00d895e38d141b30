//! In-memory collaborators for testing
//!
//! `MemoryStore` enforces the same uniqueness and compare-and-set rules as
//! the SQLite store, so core logic can be tested without a database.

use super::error::{NotifyError, StoreError, StoreResult};
use super::traits::*;
use super::types::*;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory store
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    members: BTreeMap<MemberId, VotingMember>,
    applications: BTreeMap<ApplicationId, GrantApplication>,
    /// Tokens in issuance order
    tokens: Vec<VoteToken>,
    comments: BTreeMap<CommentId, Comment>,
    next_id: i64,
    unavailable: bool,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.unavailable = unavailable;
        }
    }

    fn state(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        let state = self
            .state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        if state.unavailable {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(state)
    }
}

#[async_trait]
impl VotingStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.state().map(|_| ())
    }

    async fn insert_member(
        &self,
        member: &NewMember,
        created_at: Timestamp,
    ) -> StoreResult<VotingMember> {
        let mut state = self.state()?;
        if state.members.values().any(|m| m.email == member.email) {
            return Err(StoreError::Conflict(format!("member email {}", member.email)));
        }

        let id = MemberId(state.next_id());
        let record = VotingMember {
            id,
            name: member.name.clone(),
            position: member.position.clone(),
            email: member.email.clone(),
            is_active: true,
            created_at,
        };
        state.members.insert(id, record.clone());
        Ok(record)
    }

    async fn update_member(
        &self,
        id: MemberId,
        update: &MemberUpdate,
    ) -> StoreResult<Option<VotingMember>> {
        let mut state = self.state()?;
        if let Some(email) = &update.email {
            if state.members.values().any(|m| m.id != id && &m.email == email) {
                return Err(StoreError::Conflict(format!("member email {}", email)));
            }
        }

        let Some(member) = state.members.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &update.name {
            member.name = name.clone();
        }
        if let Some(position) = &update.position {
            member.position = position.clone();
        }
        if let Some(email) = &update.email {
            member.email = email.clone();
        }
        if let Some(active) = update.is_active {
            member.is_active = active;
        }
        Ok(Some(member.clone()))
    }

    async fn get_member(&self, id: MemberId) -> StoreResult<Option<VotingMember>> {
        Ok(self.state()?.members.get(&id).cloned())
    }

    async fn list_members(&self) -> StoreResult<Vec<VotingMember>> {
        Ok(self.state()?.members.values().cloned().collect())
    }

    async fn active_members(&self) -> StoreResult<Vec<VotingMember>> {
        Ok(self
            .state()?
            .members
            .values()
            .filter(|m| m.is_active)
            .cloned()
            .collect())
    }

    async fn insert_application(
        &self,
        application: &NewApplication,
        reference_code: &str,
        grants: &[TokenGrant],
        created_at: Timestamp,
    ) -> StoreResult<(GrantApplication, Vec<VoteToken>)> {
        let mut state = self.state()?;
        if state
            .applications
            .values()
            .any(|a| a.reference_code == reference_code)
        {
            return Err(StoreError::Conflict(format!("reference code {}", reference_code)));
        }

        // Check every grant before touching state
        let mut seen_tokens = HashSet::new();
        let mut seen_members = HashSet::new();
        for grant in grants {
            if !state.members.contains_key(&grant.member_id) {
                return Err(StoreError::NotFound(format!("member {}", grant.member_id)));
            }
            if !seen_members.insert(grant.member_id) {
                return Err(StoreError::Conflict(format!(
                    "token for member {}",
                    grant.member_id
                )));
            }
            if !seen_tokens.insert(&grant.token)
                || state.tokens.iter().any(|t| t.token == grant.token)
            {
                return Err(StoreError::Conflict("token string".to_string()));
            }
        }

        let id = ApplicationId(state.next_id());
        let record = GrantApplication {
            id,
            reference_code: reference_code.to_string(),
            submitter_name: application.submitter_name.clone(),
            candidate_full_name: application.candidate_full_name.clone(),
            grant_type: application.grant_type,
            date: application.date.clone(),
            place: application.place.clone(),
            amount_requested: application.amount_requested,
            currency: application.currency.clone(),
            description: application.description.clone(),
            voting_deadline: application.voting_deadline,
            is_active: true,
            created_at,
        };
        let tokens: Vec<VoteToken> = grants
            .iter()
            .map(|grant| VoteToken {
                token: grant.token.clone(),
                application_id: id,
                member_id: grant.member_id,
                state: VoteState::Unvoted,
                issued_at: created_at,
            })
            .collect();

        state.applications.insert(id, record.clone());
        state.tokens.extend(tokens.iter().cloned());
        Ok((record, tokens))
    }

    async fn get_application(&self, id: ApplicationId) -> StoreResult<Option<GrantApplication>> {
        Ok(self.state()?.applications.get(&id).cloned())
    }

    async fn get_application_by_reference(
        &self,
        reference_code: &str,
    ) -> StoreResult<Option<GrantApplication>> {
        Ok(self
            .state()?
            .applications
            .values()
            .find(|a| a.reference_code == reference_code)
            .cloned())
    }

    async fn list_applications(&self) -> StoreResult<Vec<GrantApplication>> {
        Ok(self.state()?.applications.values().rev().cloned().collect())
    }

    async fn set_application_active(&self, id: ApplicationId, active: bool) -> StoreResult<bool> {
        let mut state = self.state()?;
        match state.applications.get_mut(&id) {
            Some(application) => {
                application.is_active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_token(&self, token: &VotingToken) -> StoreResult<Option<VoteToken>> {
        Ok(self
            .state()?
            .tokens
            .iter()
            .find(|t| &t.token == token)
            .cloned())
    }

    async fn tokens_for_application(&self, id: ApplicationId) -> StoreResult<Vec<VoteToken>> {
        Ok(self
            .state()?
            .tokens
            .iter()
            .filter(|t| t.application_id == id)
            .cloned()
            .collect())
    }

    async fn record_vote(&self, token: &VotingToken, vote: &VoteState) -> StoreResult<bool> {
        let mut state = self.state()?;
        match state
            .tokens
            .iter_mut()
            .find(|t| &t.token == token && t.state == VoteState::Unvoted)
        {
            Some(record) => {
                record.state = vote.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn append_comment(
        &self,
        comment: &NewComment,
        created_at: Timestamp,
    ) -> StoreResult<Comment> {
        let mut state = self.state()?;
        if let Some(parent) = comment.parent_id {
            if !state.comments.contains_key(&parent) {
                return Err(StoreError::NotFound(format!("comment {}", parent)));
            }
        }

        let id = CommentId(state.next_id());
        let record = Comment {
            id,
            application_id: comment.application_id,
            member_id: comment.member_id,
            parent_id: comment.parent_id,
            content: comment.content.clone(),
            stance: comment.stance,
            created_at,
        };
        state.comments.insert(id, record.clone());
        Ok(record)
    }

    async fn get_comment(&self, id: CommentId) -> StoreResult<Option<Comment>> {
        Ok(self.state()?.comments.get(&id).cloned())
    }

    async fn comments_for_application(&self, id: ApplicationId) -> StoreResult<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .state()?
            .comments
            .values()
            .filter(|c| c.application_id == id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(comments)
    }
}

/// Notification recorded by `MockNotifier`
#[derive(Debug, Clone)]
pub struct SentNotification {
    pub member_id: MemberId,
    pub email: String,
    pub reference_code: String,
    pub token: VotingToken,
}

/// Mock notifier that records deliveries and fails for chosen addresses
#[derive(Clone, Default)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<SentNotification>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make deliveries to `email` fail
    pub fn fail_for(&self, email: &str) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(email.to_string());
    }

    /// Get delivered notifications for assertions
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(
        &self,
        recipient: &VotingMember,
        application: &ApplicationSummary,
        token: &VotingToken,
    ) -> Result<(), NotifyError> {
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&recipient.email);
        if failing {
            return Err(NotifyError::Rejected(format!(
                "mailbox unavailable: {}",
                recipient.email
            )));
        }

        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(SentNotification {
                member_id: recipient.id,
                email: recipient.email.clone(),
                reference_code: application.reference_code.clone(),
                token: token.clone(),
            });
        Ok(())
    }
}
