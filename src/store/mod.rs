//! Durable storage
//!
//! `SqliteStore` is the production `VotingStore`; the in-process
//! `MemoryStore` in `voting::mock` backs unit tests.

mod schema;
pub mod sqlite;

pub use sqlite::SqliteStore;
