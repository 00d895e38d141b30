//! Voting error taxonomy
//!
//! Every taxonomy kind is recoverable and user-facing. `Store` is the one
//! generic infrastructure failure and is kept distinct from the rest.

use super::types::{ApplicationId, CommentId, MemberId, ParseError, Timestamp};

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for voting operations
pub type VotingResult<T> = Result<T, VotingError>;

/// Storage backend errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A stored row violates a domain invariant
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Notification delivery errors (per recipient)
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Delivery rejected: {0}")]
    Rejected(String),

    #[error("Invalid message: {0}")]
    Message(String),

    #[error("Mail transport error: {0}")]
    Transport(String),
}

/// Voting errors
#[derive(Debug, thiserror::Error)]
pub enum VotingError {
    #[error("Unknown voting token")]
    UnknownToken,

    #[error("Voting closed at {deadline}")]
    DeadlineExpired { deadline: Timestamp },

    #[error("This token has already been used to vote")]
    AlreadyVoted,

    #[error("A rejection reason is required")]
    MissingJustification,

    #[error("Parent comment {parent} belongs to application {parent_application}, not {application}")]
    CrossApplicationParent {
        parent: CommentId,
        parent_application: ApplicationId,
        application: ApplicationId,
    },

    #[error("Could not allocate a unique reference code after {attempts} attempts")]
    ReferenceCodeCollision { attempts: u32 },

    #[error("Could not mint a unique voting token after {attempts} attempts")]
    TokenCollision { attempts: u32 },

    #[error("Secure random source unavailable")]
    Entropy,

    #[error("Comment content must not be empty")]
    EmptyComment,

    #[error("Parent comment not found: {0}")]
    UnknownParent(CommentId),

    #[error("Application not found: {0}")]
    UnknownApplication(ApplicationId),

    #[error("Member not found: {0}")]
    UnknownMember(MemberId),

    #[error("A member with email {0} already exists")]
    DuplicateMember(String),

    #[error("Invalid input: {0}")]
    Invalid(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl VotingError {
    /// Stable machine-readable kind, used by the CLI's JSON output
    pub fn kind(&self) -> &'static str {
        match self {
            VotingError::UnknownToken => "unknown_token",
            VotingError::DeadlineExpired { .. } => "deadline_expired",
            VotingError::AlreadyVoted => "already_voted",
            VotingError::MissingJustification => "missing_justification",
            VotingError::CrossApplicationParent { .. } => "cross_application_parent",
            VotingError::ReferenceCodeCollision { .. } => "reference_code_collision",
            VotingError::TokenCollision { .. } => "token_collision",
            VotingError::Entropy => "entropy",
            VotingError::EmptyComment => "empty_comment",
            VotingError::UnknownParent(_) => "unknown_parent",
            VotingError::UnknownApplication(_) => "unknown_application",
            VotingError::UnknownMember(_) => "unknown_member",
            VotingError::DuplicateMember(_) => "duplicate_member",
            VotingError::Invalid(_) => "invalid_input",
            VotingError::Store(_) => "storage",
        }
    }
}
