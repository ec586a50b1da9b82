use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a user that do not exist yet: id and timestamps are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub avatar: Option<String>,
}

impl NewUser {
    pub fn into_user(self) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: self.email,
            username: self.username,
            password_hash: self.password_hash,
            avatar: self.avatar,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a user. `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub email: Option<String>,
    pub username: Option<String>,
    pub avatar: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.username.is_none() && self.avatar.is_none()
    }

    pub fn apply(&self, user: &User) -> User {
        User {
            email: self.email.clone().unwrap_or_else(|| user.email.clone()),
            username: self.username.clone().unwrap_or_else(|| user.username.clone()),
            avatar: self.avatar.clone().or_else(|| user.avatar.clone()),
            updated_at: Utc::now(),
            ..user.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub id: Uuid,
    pub username: String,
    pub level_reached: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScoreEntry {
    pub fn new(username: String, level_reached: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username,
            level_reached,
            created_at: now,
            updated_at: now,
        }
    }
}
