//! Voting invitation rendering
//!
//! Invitations are multipart/alternative messages (plain text and HTML)
//! built with lettre. The builder encodes headers and stamps `Date`.

use crate::voting::error::NotifyError;
use crate::voting::types::{ApplicationSummary, VotingMember, VotingToken};
use lettre::message::header::{ContentTransferEncoding, ContentType};
use lettre::message::{Body, Mailbox, MultiPart, SinglePart};
use lettre::{Address, Message};

/// A rendered invitation for one voter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotingInvitation {
    pub from: String,
    pub to: String,
    pub recipient_name: String,
    pub subject: String,
    pub body: String,
    pub html_body: String,
    pub voting_url: String,
}

/// Voting link for a token under `base_url`
pub fn voting_url(base_url: &str, token: &VotingToken) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), token.as_str())
}

/// Parse a configured sender (`addr@domain` or `Name <addr@domain>`)
pub fn parse_sender(sender: &str) -> Result<Mailbox, NotifyError> {
    let invalid = |reason: String| {
        NotifyError::Message(format!("sender '{}': {}", sender.escape_debug(), reason))
    };
    if sender.chars().any(char::is_control) {
        return Err(invalid("control characters are not allowed".to_string()));
    }
    sender.trim().parse::<Mailbox>().map_err(|e| invalid(e.to_string()))
}

/// 7bit when the text allows it, so voting links stay on one line; the
/// builder picks an encoding otherwise.
fn text_part(content_type: ContentType, text: &str) -> SinglePart {
    let body = Body::new_with_encoding(text.to_string(), ContentTransferEncoding::SevenBit)
        .unwrap_or_else(Body::new);
    SinglePart::builder().header(content_type).body(body)
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

impl VotingInvitation {
    pub fn render(
        sender: &str,
        base_url: &str,
        recipient: &VotingMember,
        application: &ApplicationSummary,
        token: &VotingToken,
    ) -> Self {
        let voting_url = voting_url(base_url, token);
        let body = format!(
            "Dear {name},\n\
             \n\
             A new grant application requires your vote:\n\
             \n\
             Reference:  {reference}\n\
             Candidate:  {candidate}\n\
             Grant Type: {grant_type}\n\
             Date:       {date}\n\
             Place:      {place}\n\
             Amount:     {amount:.2} {currency}\n\
             \n\
             Vote here: {url}\n\
             \n\
             Voting deadline: {deadline}\n\
             \n\
             Best regards,\n\
             Grant Management System\n",
            name = recipient.name,
            reference = application.reference_code,
            candidate = application.candidate_full_name,
            grant_type = application.grant_type.label(),
            date = application.date,
            place = application.place,
            amount = application.amount_requested,
            currency = application.currency,
            url = voting_url,
            deadline = application.voting_deadline,
        );

        let html_body = format!(
            "<h2>Grant Application Voting Required</h2>\n\
             <p>Dear {name},</p>\n\
             <p>A new grant application requires your vote:</p>\n\
             <div style=\"background: #f5f5f5; padding: 15px; margin: 15px 0;\">\n\
             <strong>Reference:</strong> {reference}<br>\n\
             <strong>Candidate:</strong> {candidate}<br>\n\
             <strong>Grant Type:</strong> {grant_type}<br>\n\
             <strong>Date:</strong> {date}<br>\n\
             <strong>Place:</strong> {place}<br>\n\
             <strong>Amount:</strong> {amount:.2} {currency}\n\
             </div>\n\
             <p><a href=\"{url}\" style=\"background: #007bff; color: white; padding: 10px 20px; \
             text-decoration: none; border-radius: 5px;\">VOTE NOW</a></p>\n\
             <p>Voting deadline: {deadline}</p>\n\
             <p>Best regards,<br>Grant Management System</p>\n",
            name = escape_html(&recipient.name),
            reference = escape_html(&application.reference_code),
            candidate = escape_html(&application.candidate_full_name),
            grant_type = escape_html(application.grant_type.label()),
            date = escape_html(&application.date),
            place = escape_html(&application.place),
            amount = application.amount_requested,
            currency = escape_html(&application.currency),
            url = escape_html(&voting_url),
            deadline = application.voting_deadline,
        );

        Self {
            from: sender.to_string(),
            to: recipient.email.clone(),
            recipient_name: recipient.name.clone(),
            subject: format!("Grant Voting Required - {}", application.reference_code),
            body,
            html_body,
            voting_url,
        }
    }

    /// Build the MIME message
    pub fn to_message(&self) -> Result<Message, NotifyError> {
        let from = parse_sender(&self.from)?;
        let address: Address = self.to.parse().map_err(|e| {
            NotifyError::Message(format!("recipient '{}': {}", self.to.escape_debug(), e))
        })?;
        let to = Mailbox::new(Some(self.recipient_name.clone()), address);

        Message::builder()
            .from(from)
            .to(to)
            .subject(self.subject.clone())
            .date_now()
            .multipart(
                MultiPart::alternative()
                    .singlepart(text_part(ContentType::TEXT_PLAIN, &self.body))
                    .singlepart(text_part(ContentType::TEXT_HTML, &self.html_body)),
            )
            .map_err(|e| NotifyError::Message(e.to_string()))
    }

    /// Serialize as an RFC 5322 message
    pub fn to_eml(&self) -> Result<Vec<u8>, NotifyError> {
        Ok(self.to_message()?.formatted())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::voting::types::*;

    pub(crate) fn fixture() -> (VotingMember, ApplicationSummary, VotingToken) {
        let member = VotingMember {
            id: MemberId(3),
            name: "Ana".to_string(),
            position: "Science Communication Manager".to_string(),
            email: "ana@example.org".to_string(),
            is_active: true,
            created_at: Timestamp(0),
        };
        let application = ApplicationSummary {
            id: ApplicationId(1),
            reference_code: "CA004521".to_string(),
            candidate_full_name: "Jana Novak".to_string(),
            grant_type: GrantType::YriConference,
            date: "2026-11-20".to_string(),
            place: "Ljubljana".to_string(),
            amount_requested: 1200.0,
            currency: "EUR".to_string(),
            voting_deadline: Timestamp::parse("2026-11-01 12:00").unwrap(),
        };
        (member, application, VotingToken::new("c0ffee"))
    }

    fn eml(invitation: &VotingInvitation) -> String {
        String::from_utf8(invitation.to_eml().unwrap()).unwrap()
    }

    #[test]
    fn test_render_invitation() {
        let (member, application, token) = fixture();
        let invitation = VotingInvitation::render(
            "grants@example.org",
            "https://grants.example.org/vote/",
            &member,
            &application,
            &token,
        );

        assert_eq!(invitation.subject, "Grant Voting Required - CA004521");
        assert_eq!(invitation.to, "ana@example.org");
        assert_eq!(invitation.voting_url, "https://grants.example.org/vote/c0ffee");
        assert!(invitation.body.starts_with("Dear Ana,"));
        assert!(invitation.body.contains("Candidate:  Jana Novak"));
        assert!(invitation
            .body
            .contains("Young Researchers and Innovators (YRI) Conference Grants"));
        assert!(invitation.body.contains("1200.00 EUR"));
        assert!(invitation.body.contains("2026-11-01T12:00:00Z"));
        assert!(invitation
            .html_body
            .contains("<a href=\"https://grants.example.org/vote/c0ffee\""));
    }

    #[test]
    fn test_html_body_escapes_application_fields() {
        let (member, mut application, token) = fixture();
        application.candidate_full_name = "<script>alert(1)</script>".to_string();
        let invitation =
            VotingInvitation::render("grants@example.org", "http://x/vote", &member, &application, &token);

        assert!(!invitation.html_body.contains("<script>"));
        assert!(invitation.html_body.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_eml_headers() {
        let (member, application, token) = fixture();
        let invitation = VotingInvitation::render(
            "Grant Office <grants@example.org>",
            "http://x/vote",
            &member,
            &application,
            &token,
        );
        let eml = eml(&invitation);

        let header = |name: &str| {
            eml.lines()
                .find(|line| line.starts_with(name))
                .unwrap_or_default()
                .to_string()
        };
        assert!(header("From: ").contains("<grants@example.org>"));
        assert!(header("To: ").contains("<ana@example.org>"));
        assert_eq!(header("Subject: "), "Subject: Grant Voting Required - CA004521");
        assert!(!header("Date: ").is_empty());
        assert!(eml.contains("multipart/alternative"));
        assert!(eml.contains("text/html"));
        assert!(eml.lines().any(|line| line == "Vote here: http://x/vote/c0ffee"));
    }

    #[test]
    fn test_recipient_with_line_break_is_refused() {
        let (mut member, application, token) = fixture();
        member.email = "ana@example.org\r\nBcc: leak@evil.org".to_string();
        let invitation =
            VotingInvitation::render("grants@example.org", "http://x/vote", &member, &application, &token);

        let err = invitation.to_eml().unwrap_err();
        assert!(matches!(err, NotifyError::Message(_)));
    }

    #[test]
    fn test_sender_with_line_break_is_refused() {
        assert!(parse_sender("grants@example.org").is_ok());
        assert!(parse_sender("Grant Office <grants@example.org>").is_ok());
        for bad in [
            "grants@example.org\r\nBcc: leak@evil.org",
            "grants@example.org\n",
            "not an address",
            "",
        ] {
            assert!(
                matches!(parse_sender(bad), Err(NotifyError::Message(_))),
                "accepted {:?}",
                bad
            );
        }
    }
}
