//! Grant Application Voting Core
//!
//! Token issuance and vote collection for grant applications:
//! - One unguessable token per (application, active member), minted at creation
//! - Write-once ballots via compare-and-set on the unvoted state
//! - Votes gated by the application deadline, comments never gated
//! - Results derived from the ledger on demand
//!
//! Storage and notification delivery are collaborators behind the traits in
//! `traits`; see `crate::store` and `crate::notify` for implementations.

pub mod comments;
pub mod deadline;
pub mod error;
pub mod issuer;
pub mod ledger;
pub mod mock;
pub mod reference;
pub mod results;
pub mod roster;
pub mod service;
pub mod traits;
pub mod types;

#[cfg(test)]
mod proptests;

pub use comments::CommentView;
pub use error::{NotifyError, StoreError, StoreResult, VotingError, VotingResult};
pub use issuer::{IssuanceReport, IssuedToken, NotificationFailure, TokenIssuer};
pub use mock::{MemoryStore, MockNotifier};
pub use results::{BallotView, VoteResults, VoteSummary};
pub use service::{ApplicationDetail, BallotContext, VotingService};
pub use traits::{Clock, FixedClock, Notifier, SystemClock, VotingStore};
pub use types::*;
