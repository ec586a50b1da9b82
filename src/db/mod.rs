//! Persistence layer.
//!
//! Two collections, users and score entries, behind the [`UserStore`] and
//! [`ScoreStore`] traits. [`PgStore`] is the database of record;
//! [`MemoryStore`] serves local runs and tests.

pub mod memory;
pub mod models;
pub mod operations;
pub mod store;

pub use memory::MemoryStore;
pub use models::{NewUser, ScoreEntry, User, UserPatch};
pub use operations::PgStore;
pub use store::{ScoreStore, UserStore};
