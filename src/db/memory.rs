use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::{NewUser, ScoreEntry, User, UserPatch};
use crate::db::store::{ScoreStore, UserStore};
use crate::error::AppError;
use crate::Result;

#[derive(Debug, Default)]
struct Collections {
    users: HashMap<Uuid, User>,
    // keyed by username, mirroring the unique index on score_entries
    scores: HashMap<String, ScoreEntry>,
}

impl Collections {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn username_taken(&self, username: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }
}

/// Process-local store holding both collections behind one lock.
///
/// Enforces the same uniqueness rules as the database schema, and a rename
/// cascade runs under a single write guard, so it is as atomic as the
/// Postgres transaction.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn duplicate_user() -> AppError {
    AppError::Conflict("Email or username already exists!".to_string())
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email_or_username(&self, email: &str, username: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.email == email || u.username == username)
            .cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let mut inner = self.inner.write().await;
        if inner.email_taken(&user.email, None) || inner.username_taken(&user.username, None) {
            return Err(duplicate_user());
        }
        let user = user.into_user();
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<User> {
        let mut inner = self.inner.write().await;
        let current = inner
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("User not found!".to_string()))?;

        if let Some(email) = patch.email.as_deref() {
            if inner.email_taken(email, Some(id)) {
                return Err(duplicate_user());
            }
        }

        if let Some(new_username) = patch.username.as_deref() {
            if new_username != current.username {
                if inner.username_taken(new_username, Some(id)) {
                    return Err(duplicate_user());
                }
                if inner.scores.contains_key(new_username) {
                    return Err(AppError::Conflict(
                        "A leaderboard entry already exists for that username!".to_string(),
                    ));
                }
                if let Some(mut entry) = inner.scores.remove(&current.username) {
                    entry.username = new_username.to_string();
                    entry.updated_at = Utc::now();
                    inner.scores.insert(entry.username.clone(), entry);
                }
            }
        }

        let updated = patch.apply(&current);
        inner.users.insert(id, updated.clone());
        Ok(updated)
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<ScoreEntry>> {
        Ok(self.inner.read().await.scores.get(username).cloned())
    }

    async fn create(&self, username: &str, level_reached: i32) -> Result<ScoreEntry> {
        let mut inner = self.inner.write().await;
        if inner.scores.contains_key(username) {
            return Err(AppError::Conflict(
                "A leaderboard entry already exists for that username!".to_string(),
            ));
        }
        let entry = ScoreEntry::new(username.to_string(), level_reached);
        inner.scores.insert(entry.username.clone(), entry.clone());
        Ok(entry)
    }

    async fn raise_level(&self, username: &str, level_reached: i32) -> Result<Option<ScoreEntry>> {
        let mut inner = self.inner.write().await;
        match inner.scores.get_mut(username) {
            Some(entry) if level_reached > entry.level_reached => {
                entry.level_reached = level_reached;
                entry.updated_at = Utc::now();
                Ok(Some(entry.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list_all(&self) -> Result<Vec<ScoreEntry>> {
        let inner = self.inner.read().await;
        let mut entries: Vec<ScoreEntry> = inner.scores.values().cloned().collect();
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }
}
