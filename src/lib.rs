//! Grantvote - Committee Voting on Grant Applications
//!
//! Issues one-time voting tokens to committee members when a grant
//! application is created, collects write-once accept/reject ballots until
//! the application deadline, and keeps a threaded discussion per application.
//!
//! Key principles:
//! - A token is the sole credential; it is never logged at info or above
//! - A ballot is cast at most once, enforced by the store
//! - Results are always derived from the ledger, never cached

pub mod notify;
pub mod store;
pub mod voting;
