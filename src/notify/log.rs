//! Notifier that only logs
//!
//! The voting link is emitted at debug level; at info only the recipient
//! and reference code are visible.

use super::message::voting_url;
use crate::voting::error::NotifyError;
use crate::voting::traits::Notifier;
use crate::voting::types::{ApplicationSummary, VotingMember, VotingToken};
use async_trait::async_trait;

pub struct LogNotifier {
    base_url: String,
}

impl LogNotifier {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        recipient: &VotingMember,
        application: &ApplicationSummary,
        token: &VotingToken,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            member_id = %recipient.id,
            email = %recipient.email,
            reference_code = %application.reference_code,
            "voting invitation due (no outbox configured)"
        );
        tracing::debug!(
            member_id = %recipient.id,
            url = %voting_url(&self.base_url, token),
            "voting link"
        );
        Ok(())
    }
}
