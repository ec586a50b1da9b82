use async_trait::async_trait;
use uuid::Uuid;

use crate::db::models::{NewUser, ScoreEntry, User, UserPatch};
use crate::Result;

/// Credential store: the `users` collection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// First user whose email or username matches either argument.
    async fn find_by_email_or_username(&self, email: &str, username: &str) -> Result<Option<User>>;

    /// Inserts a new user. A duplicate email or username is a `Conflict`.
    async fn create(&self, user: NewUser) -> Result<User>;

    /// Applies `patch` and returns the new snapshot, or `NotFound`.
    ///
    /// When the patch changes the username, the score entry held under the
    /// old username is renamed in the same unit of work: either both records
    /// change or neither does.
    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<User>;
}

/// Score store: the `score_entries` collection, keyed by username.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScoreStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<ScoreEntry>>;

    /// Inserts the first entry for `username`. A second entry is a `Conflict`.
    async fn create(&self, username: &str, level_reached: i32) -> Result<ScoreEntry>;

    /// Sets the level only if it is strictly higher than the stored one.
    /// Returns `None` when nothing changed or there is no entry.
    async fn raise_level(&self, username: &str, level_reached: i32) -> Result<Option<ScoreEntry>>;

    async fn list_all(&self) -> Result<Vec<ScoreEntry>>;
}
