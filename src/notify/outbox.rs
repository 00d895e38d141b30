//! Maildir-style outbox
//!
//! Each invitation becomes `<reference>-<member_id>.eml` in the outbox
//! directory. Files are written to a `.tmp` name and renamed so a relay
//! polling the directory never sees a partial message.

use super::message::VotingInvitation;
use crate::voting::error::NotifyError;
use crate::voting::traits::Notifier;
use crate::voting::types::{ApplicationSummary, VotingMember, VotingToken};
use async_trait::async_trait;
use std::path::PathBuf;

pub struct OutboxNotifier {
    dir: PathBuf,
    sender: String,
    base_url: String,
}

impl OutboxNotifier {
    pub fn new(dir: impl Into<PathBuf>, sender: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            sender: sender.into(),
            base_url: base_url.into(),
        }
    }

    fn message_path(&self, application: &ApplicationSummary, recipient: &VotingMember) -> PathBuf {
        self.dir
            .join(format!("{}-{}.eml", application.reference_code, recipient.id))
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
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

        let eml =
            VotingInvitation::render(&self.sender, &self.base_url, recipient, application, token)
                .to_eml()?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.message_path(application, recipient);
        let tmp = path.with_extension("eml.tmp");
        tokio::fs::write(&tmp, eml).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!(
            member_id = %recipient.id,
            reference_code = %application.reference_code,
            path = %path.display(),
            "invitation spooled"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::message::tests::fixture;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_writes_eml_file() {
        let temp_dir = TempDir::new().unwrap();
        let outbox = temp_dir.path().join("outbox");
        let notifier = OutboxNotifier::new(&outbox, "grants@example.org", "http://localhost/vote");
        let (member, application, token) = fixture();

        notifier.notify(&member, &application, &token).await.unwrap();

        let path = outbox.join("CA004521-3.eml");
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("<ana@example.org>"));
        assert!(contents.lines().any(|line| line.starts_with("Date: ")));
        assert!(contents.contains("http://localhost/vote/c0ffee"));
        assert!(!outbox.join("CA004521-3.eml.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_email_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let notifier = OutboxNotifier::new(temp_dir.path(), "grants@example.org", "http://x");
        let (mut member, application, token) = fixture();
        member.email = String::new();

        let err = notifier.notify(&member, &application, &token).await.unwrap_err();
        assert!(matches!(err, NotifyError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_injected_headers_never_reach_outbox() {
        let temp_dir = TempDir::new().unwrap();
        let outbox = temp_dir.path().join("outbox");
        let notifier = OutboxNotifier::new(&outbox, "grants@example.org", "http://x");
        let (mut member, application, token) = fixture();
        member.email = "ana@example.org\r\nBcc: leak@evil.org".to_string();

        let err = notifier.notify(&member, &application, &token).await.unwrap_err();
        assert!(matches!(err, NotifyError::Message(_)));
        assert!(!outbox.join("CA004521-3.eml").exists());
    }

    #[tokio::test]
    async fn test_unwritable_outbox_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the directory should be
        let blocker = temp_dir.path().join("outbox");
        std::fs::write(&blocker, b"").unwrap();
        let notifier = OutboxNotifier::new(&blocker, "grants@example.org", "http://x");
        let (member, application, token) = fixture();

        let err = notifier.notify(&member, &application, &token).await.unwrap_err();
        assert!(matches!(err, NotifyError::Io(_)));
    }
}
