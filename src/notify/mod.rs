//! Invitation delivery
//!
//! Notifier implementations for the voting core:
//! - `SmtpNotifier` sends through a mail relay
//! - `OutboxNotifier` spools `.eml` files for a relay to pick up
//! - `LogNotifier` only records that an invitation was due

pub mod log;
pub mod message;
pub mod outbox;
pub mod smtp;

pub use self::log::LogNotifier;
pub use message::{parse_sender, VotingInvitation};
pub use outbox::OutboxNotifier;
pub use smtp::{SmtpNotifier, SmtpSecurity, SmtpSettings};

use crate::voting::error::NotifyError;
use crate::voting::traits::Notifier;
use crate::voting::types::{ApplicationSummary, VotingMember, VotingToken};
use async_trait::async_trait;

/// Notifier chosen from configuration
pub enum ConfiguredNotifier {
    Smtp(SmtpNotifier),
    Outbox(OutboxNotifier),
    Log(LogNotifier),
}

#[async_trait]
impl Notifier for ConfiguredNotifier {
    async fn notify(
        &self,
        recipient: &VotingMember,
        application: &ApplicationSummary,
        token: &VotingToken,
    ) -> Result<(), NotifyError> {
        match self {
            ConfiguredNotifier::Smtp(n) => n.notify(recipient, application, token).await,
            ConfiguredNotifier::Outbox(n) => n.notify(recipient, application, token).await,
            ConfiguredNotifier::Log(n) => n.notify(recipient, application, token).await,
        }
    }
}
