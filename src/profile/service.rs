use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::TokenService;
use crate::db::models::{User, UserPatch};
use crate::db::store::UserStore;
use crate::error::AppError;
use crate::validation::{is_valid_email, present};
use crate::Result;

/// Attempts for a user update before a transient store error is surfaced.
const UPDATE_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Result of a profile update: the new snapshot and a token matching it.
#[derive(Debug, Clone)]
pub struct InfoUpdate {
    pub user: User,
    pub token: String,
}

pub struct ProfileService {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found!".to_string())
}

impl ProfileService {
    pub fn new(users: Arc<dyn UserStore>, tokens: Arc<TokenService>) -> Self {
        Self { users, tokens }
    }

    pub async fn get_info(&self, user_id: Uuid) -> Result<User> {
        self.users.find_by_id(user_id).await?.ok_or_else(user_not_found)
    }

    /// Changes email and/or username, then issues a token for the new identity.
    ///
    /// A username change carries the user's leaderboard entry along with it.
    /// Tokens issued before the change stay valid until they expire.
    pub async fn update_info(
        &self,
        user_id: Uuid,
        email: Option<&str>,
        username: Option<&str>,
    ) -> Result<InfoUpdate> {
        let user = self.get_info(user_id).await?;
        let mut patch = UserPatch::default();

        if let Some(email) = present(email) {
            if let Some(owner) = self.users.find_by_email(email).await? {
                if owner.id != user.id {
                    return Err(AppError::Conflict(
                        "Email already exists for another user!".to_string(),
                    ));
                }
            }
            if !is_valid_email(email) {
                return Err(AppError::InvalidInput(
                    "Please provide a valid email address!".to_string(),
                ));
            }
            patch.email = Some(email.to_string());
        }

        if let Some(username) = present(username) {
            if let Some(owner) = self.users.find_by_username(username).await? {
                if owner.id != user.id {
                    return Err(AppError::Conflict(
                        "Username already exists for another user!".to_string(),
                    ));
                }
            }
            patch.username = Some(username.to_string());
        }

        let user = if patch.is_empty() {
            user
        } else {
            let previous = user.username.clone();
            let updated = self.update_with_retry(user_id, patch).await?;
            if updated.username != previous {
                info!(user_id = %user_id, old = %previous, new = %updated.username, "user renamed");
            }
            updated
        };

        let token = self.tokens.issue(user.id, &user.username, &user.email)?;
        Ok(InfoUpdate { user, token })
    }

    pub async fn get_avatar(&self, user_id: Uuid) -> Result<String> {
        self.users
            .find_by_id(user_id)
            .await?
            .and_then(|user| user.avatar)
            .ok_or_else(|| AppError::NotFound("Avatar not found!".to_string()))
    }

    /// Points the user at a newly stored avatar. The previous file is left in place.
    pub async fn update_avatar(&self, user_id: Uuid, avatar: Option<String>) -> Result<User> {
        self.get_info(user_id).await?;

        let Some(avatar) = avatar else {
            return Err(AppError::InvalidInput("Avatar file is missing!".to_string()));
        };

        let user = self
            .users
            .update(
                user_id,
                UserPatch {
                    avatar: Some(avatar),
                    ..UserPatch::default()
                },
            )
            .await?;

        info!(user_id = %user_id, "avatar updated");
        Ok(user)
    }

    async fn update_with_retry(&self, user_id: Uuid, patch: UserPatch) -> Result<User> {
        let mut attempt = 1;
        loop {
            match self.users.update(user_id, patch.clone()).await {
                Err(e) if e.is_transient() && attempt < UPDATE_ATTEMPTS => {
                    warn!(user_id = %user_id, attempt, error = %e, "transient store error, retrying update");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
