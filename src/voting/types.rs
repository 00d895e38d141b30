//! Grant voting domain types
//!
//! Records are arena-style: every entity is keyed by a numeric id and
//! relationships are back-references (`application_id`, `member_id`,
//! `parent_id`), never owned children.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default currency for requested amounts
pub const DEFAULT_CURRENCY: &str = "EUR";

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Primary key of a voting member
    MemberId
);
record_id!(
    /// Primary key of a grant application
    ApplicationId
);
record_id!(
    /// Primary key of a comment
    CommentId
);

/// Errors raised while validating values at the boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown grant type: {0}")]
    UnknownGrantType(String),

    #[error("unknown vote value: {0}")]
    UnknownVoteValue(String),

    #[error("unknown stance: {0}")]
    UnknownStance(String),

    #[error("invalid timestamp '{0}' (expected UTC: YYYY-MM-DD HH:MM or RFC 3339 ending in Z)")]
    InvalidTimestamp(String),

    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("missing field: {0}")]
    MissingField(&'static str),
}

/// Seconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Parse `YYYY-MM-DD`, `YYYY-MM-DD HH:MM`, `YYYY-MM-DD HH:MM:SS` or
    /// RFC 3339 with a `Z` suffix. All inputs are read as UTC; numeric
    /// offsets such as `+02:00` are rejected.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let trimmed = input.trim();
        let normalized = match trimmed.len() {
            10 => format!("{} 00:00:00", trimmed),
            16 => format!("{}:00", trimmed),
            _ => trimmed.to_string(),
        };

        let time = humantime::parse_rfc3339_weak(&normalized)
            .map_err(|_| ParseError::InvalidTimestamp(input.to_string()))?;
        let secs = time
            .duration_since(UNIX_EPOCH)
            .map_err(|_| ParseError::InvalidTimestamp(input.to_string()))?
            .as_secs();

        Ok(Self(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = UNIX_EPOCH + Duration::from_secs(self.0);
        write!(f, "{}", humantime::format_rfc3339_seconds(time))
    }
}

/// Grant categories accepted by the committee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrantType {
    Stsm,
    DisseminationConference,
    ItcConference,
    YriConference,
}

impl GrantType {
    pub const ALL: [GrantType; 4] = [
        GrantType::Stsm,
        GrantType::DisseminationConference,
        GrantType::ItcConference,
        GrantType::YriConference,
    ];

    /// Stable identifier used in storage and on the command line
    pub fn code(&self) -> &'static str {
        match self {
            GrantType::Stsm => "stsm",
            GrantType::DisseminationConference => "dissemination-conference",
            GrantType::ItcConference => "itc-conference",
            GrantType::YriConference => "yri-conference",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            GrantType::Stsm => "STSM",
            GrantType::DisseminationConference => "Dissemination Conference Grant",
            GrantType::ItcConference => "ITC Conference Grant",
            GrantType::YriConference => {
                "Young Researchers and Innovators (YRI) Conference Grants"
            }
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GrantType {
    type Err = ParseError;

    /// Accepts either the code or the label, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        GrantType::ALL
            .into_iter()
            .find(|g| g.code().eq_ignore_ascii_case(needle) || g.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ParseError::UnknownGrantType(s.to_string()))
    }
}

/// Tri-state vote value of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteValue {
    Unvoted,
    Accept,
    Reject,
}

impl VoteValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteValue::Unvoted => "unvoted",
            VoteValue::Accept => "accept",
            VoteValue::Reject => "reject",
        }
    }
}

impl fmt::Display for VoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteValue {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unvoted" => Ok(VoteValue::Unvoted),
            "accept" => Ok(VoteValue::Accept),
            "reject" => Ok(VoteValue::Reject),
            _ => Err(ParseError::UnknownVoteValue(s.to_string())),
        }
    }
}

/// A ballot as submitted by a voter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ballot {
    Accept,
    Reject { reason: Option<String> },
}

impl Ballot {
    /// Build a ballot from a parsed vote value and optional reason.
    ///
    /// `Unvoted` is not a submittable value.
    pub fn from_parts(value: VoteValue, reason: Option<String>) -> Result<Self, ParseError> {
        match value {
            VoteValue::Accept => Ok(Ballot::Accept),
            VoteValue::Reject => Ok(Ballot::Reject { reason }),
            VoteValue::Unvoted => Err(ParseError::UnknownVoteValue(value.to_string())),
        }
    }

    pub fn value(&self) -> VoteValue {
        match self {
            Ballot::Accept => VoteValue::Accept,
            Ballot::Reject { .. } => VoteValue::Reject,
        }
    }
}

/// Stored vote state of a token.
///
/// A rejection reason exists exactly when the state is `Rejected`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "vote", rename_all = "lowercase")]
pub enum VoteState {
    Unvoted,
    Accepted { cast_at: Timestamp },
    Rejected { reason: String, cast_at: Timestamp },
}

impl VoteState {
    pub fn value(&self) -> VoteValue {
        match self {
            VoteState::Unvoted => VoteValue::Unvoted,
            VoteState::Accepted { .. } => VoteValue::Accept,
            VoteState::Rejected { .. } => VoteValue::Reject,
        }
    }

    pub fn is_cast(&self) -> bool {
        !matches!(self, VoteState::Unvoted)
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            VoteState::Rejected { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn cast_at(&self) -> Option<Timestamp> {
        match self {
            VoteState::Unvoted => None,
            VoteState::Accepted { cast_at } | VoteState::Rejected { cast_at, .. } => Some(*cast_at),
        }
    }

    /// Rebuild from storage columns, rejecting rows that break the
    /// reason-iff-reject invariant.
    pub fn from_columns(
        value: &str,
        reason: Option<String>,
        cast_at: Option<Timestamp>,
    ) -> Result<Self, String> {
        let value: VoteValue = value.parse().map_err(|e: ParseError| e.to_string())?;
        match (value, reason, cast_at) {
            (VoteValue::Unvoted, None, None) => Ok(VoteState::Unvoted),
            (VoteValue::Accept, None, Some(cast_at)) => Ok(VoteState::Accepted { cast_at }),
            (VoteValue::Reject, Some(reason), Some(cast_at)) if !reason.trim().is_empty() => {
                Ok(VoteState::Rejected { reason, cast_at })
            }
            (value, reason, cast_at) => Err(format!(
                "inconsistent vote row: value={} reason_present={} cast_at_present={}",
                value,
                reason.is_some(),
                cast_at.is_some()
            )),
        }
    }
}

/// Declared orientation of a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Support,
    Oppose,
    #[default]
    Neutral,
}

impl Stance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stance::Support => "support",
            Stance::Oppose => "oppose",
            Stance::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stance {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "support" => Ok(Stance::Support),
            "oppose" => Ok(Stance::Oppose),
            "neutral" | "" => Ok(Stance::Neutral),
            _ => Err(ParseError::UnknownStance(s.to_string())),
        }
    }
}

/// Opaque voting token.
///
/// Debug output is truncated so tokens don't leak into logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VotingToken(String);

impl VotingToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for VotingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "VotingToken({}…)", prefix)
    }
}

impl fmt::Display for VotingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Eligible voter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingMember {
    pub id: MemberId,
    pub name: String,
    pub position: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: Timestamp,
}

/// Input for a new roster entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMember {
    pub name: String,
    pub position: String,
    pub email: String,
}

/// Partial roster update; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberUpdate {
    pub name: Option<String>,
    pub position: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

/// A grant proposal under vote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantApplication {
    pub id: ApplicationId,
    pub reference_code: String,
    pub submitter_name: String,
    pub candidate_full_name: String,
    pub grant_type: GrantType,
    /// Event date (`YYYY-MM-DD`)
    pub date: String,
    pub place: String,
    pub amount_requested: f64,
    pub currency: String,
    pub description: String,
    pub voting_deadline: Timestamp,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl GrantApplication {
    pub fn summary(&self) -> ApplicationSummary {
        ApplicationSummary {
            id: self.id,
            reference_code: self.reference_code.clone(),
            candidate_full_name: self.candidate_full_name.clone(),
            grant_type: self.grant_type,
            date: self.date.clone(),
            place: self.place.clone(),
            amount_requested: self.amount_requested,
            currency: self.currency.clone(),
            voting_deadline: self.voting_deadline,
        }
    }
}

/// Validated input for a new application
#[derive(Debug, Clone, PartialEq)]
pub struct NewApplication {
    pub submitter_name: String,
    pub candidate_full_name: String,
    pub grant_type: GrantType,
    pub date: String,
    pub place: String,
    pub amount_requested: f64,
    pub currency: String,
    pub description: String,
    pub voting_deadline: Timestamp,
}

impl NewApplication {
    /// Validate raw boundary input
    #[allow(clippy::too_many_arguments)]
    pub fn parse(
        submitter_name: &str,
        candidate_full_name: &str,
        grant_type: &str,
        date: &str,
        place: &str,
        amount_requested: &str,
        currency: Option<&str>,
        description: Option<&str>,
        voting_deadline: &str,
    ) -> Result<Self, ParseError> {
        let submitter_name = required("submitter_name", submitter_name)?;
        let candidate_full_name = required("candidate_full_name", candidate_full_name)?;
        let place = required("place", place)?;

        let date = date.trim().to_string();
        if date.len() != 10 || Timestamp::parse(&date).is_err() {
            return Err(ParseError::InvalidDate(date));
        }

        let amount_requested: f64 = amount_requested
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidAmount(amount_requested.to_string()))?;
        if !amount_requested.is_finite() || amount_requested < 0.0 {
            return Err(ParseError::InvalidAmount(amount_requested.to_string()));
        }

        let currency = currency
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CURRENCY)
            .to_ascii_uppercase();

        Ok(Self {
            submitter_name,
            candidate_full_name,
            grant_type: grant_type.parse()?,
            date,
            place,
            amount_requested,
            currency,
            description: description.unwrap_or_default().trim().to_string(),
            voting_deadline: Timestamp::parse(voting_deadline)?,
        })
    }
}

/// Validate a single bare addr-spec (`local@domain.tld`).
///
/// Display names, lists, whitespace and control characters are rejected so
/// the value can never smuggle extra header content into an invitation.
pub fn validate_email(email: &str) -> Result<String, ParseError> {
    let email = email.trim();
    let invalid = || ParseError::InvalidEmail(email.escape_debug().to_string());

    if email.is_empty() || email.len() > 254 {
        return Err(invalid());
    }
    if email
        .chars()
        .any(|c| c.is_control() || c.is_whitespace() || "<>()[]\\,;:\"".contains(c))
    {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    let labels_ok = domain.split('.').count() >= 2
        && domain
            .split('.')
            .all(|l| !l.is_empty() && !l.starts_with('-') && !l.ends_with('-'));
    if local.is_empty() || local.len() > 64 || domain.contains('@') || !labels_ok {
        return Err(invalid());
    }
    Ok(email.to_string())
}

fn required(field: &'static str, value: &str) -> Result<String, ParseError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ParseError::MissingField(field));
    }
    Ok(value.to_string())
}

/// Application facts carried in notifications and result views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSummary {
    pub id: ApplicationId,
    pub reference_code: String,
    pub candidate_full_name: String,
    pub grant_type: GrantType,
    pub date: String,
    pub place: String,
    pub amount_requested: f64,
    pub currency: String,
    pub voting_deadline: Timestamp,
}

/// Token to be issued to one member when an application is stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub token: VotingToken,
    pub member_id: MemberId,
}

/// Issuance record and ballot for one (application, member) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteToken {
    pub token: VotingToken,
    pub application_id: ApplicationId,
    pub member_id: MemberId,
    pub state: VoteState,
    pub issued_at: Timestamp,
}

/// Discussion entry on an application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub application_id: ApplicationId,
    pub member_id: MemberId,
    pub parent_id: Option<CommentId>,
    pub content: String,
    pub stance: Stance,
    pub created_at: Timestamp,
}

/// Input for a comment append
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub application_id: ApplicationId,
    pub member_id: MemberId,
    pub parent_id: Option<CommentId>,
    pub content: String,
    pub stance: Stance,
}
