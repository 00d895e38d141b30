//! SMTP delivery
//!
//! Sends invitations straight to a mail relay over lettre's pooled async
//! transport. Permanent SMTP failures (5xx, e.g. an unknown mailbox) map to
//! `NotifyError::Rejected`; everything else is a transport error.

use super::message::{parse_sender, VotingInvitation};
use crate::voting::error::NotifyError;
use crate::voting::traits::Notifier;
use crate::voting::types::{ApplicationSummary, VotingMember, VotingToken};
use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-command timeout against the relay
pub const DEFAULT_SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection security towards the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    /// Plain connection upgraded with STARTTLS (submission, port 587)
    #[default]
    Starttls,
    /// Implicit TLS (port 465)
    Tls,
    /// No encryption; only for relays on localhost
    None,
}

impl SmtpSecurity {
    pub fn default_port(self) -> u16 {
        match self {
            SmtpSecurity::Starttls => 587,
            SmtpSecurity::Tls => 465,
            SmtpSecurity::None => 25,
        }
    }
}

/// Relay connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: Option<u16>,
    pub security: SmtpSecurity,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl SmtpSettings {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: SmtpSecurity::default(),
            username: None,
            password: None,
            timeout: DEFAULT_SMTP_TIMEOUT,
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.security.default_port())
    }
}

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
    base_url: String,
}

impl SmtpNotifier {
    pub fn new(
        settings: &SmtpSettings,
        sender: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let sender = sender.into();
        parse_sender(&sender)?;

        let builder = match settings.security {
            SmtpSecurity::Starttls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                    .map_err(|e| NotifyError::Transport(e.to_string()))?
            }
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .map_err(|e| NotifyError::Transport(e.to_string()))?,
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(settings.host.as_str())
            }
        };
        let mut builder = builder
            .port(settings.port())
            .timeout(Some(settings.timeout));

        match (&settings.username, &settings.password) {
            (Some(username), Some(password)) => {
                builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
            }
            (Some(_), None) => {
                return Err(NotifyError::Transport(
                    "SMTP username configured without a password".to_string(),
                ));
            }
            _ => {}
        }

        tracing::debug!(
            host = %settings.host,
            port = settings.port(),
            security = ?settings.security,
            "SMTP transport configured"
        );

        Ok(Self {
            transport: builder.build(),
            sender,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(
        &self,
        recipient: &VotingMember,
        application: &ApplicationSummary,
        token: &VotingToken,
    ) -> Result<(), NotifyError> {
        if recipient.email.trim().is_empty() {
            return Err(NotifyError::Rejected(format!(
                "member {} has no email address",
                recipient.id
            )));
        }

        let message =
            VotingInvitation::render(&self.sender, &self.base_url, recipient, application, token)
                .to_message()?;

        self.transport.send(message).await.map_err(|e| {
            if e.is_permanent() {
                NotifyError::Rejected(e.to_string())
            } else {
                NotifyError::Transport(e.to_string())
            }
        })?;

        tracing::debug!(
            member_id = %recipient.id,
            reference_code = %application.reference_code,
            "invitation sent"
        );
        Ok(())
    }
}
