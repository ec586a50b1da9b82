use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::password::{hash_password, verify_password, MAX_PASSWORD_BYTES};
use crate::auth::token::TokenService;
use crate::config::AuthConfig;
use crate::db::models::{NewUser, User};
use crate::db::store::UserStore;
use crate::error::{AppError, AuthError};
use crate::validation::{is_valid_email, present};
use crate::Result;

/// Registration and login.
pub struct AccountService {
    users: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
    bcrypt_cost: u32,
    uniform_login_errors: bool,
    default_avatar: String,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<TokenService>,
        config: &AuthConfig,
        default_avatar: String,
    ) -> Self {
        Self {
            users,
            tokens,
            bcrypt_cost: config.bcrypt_cost,
            uniform_login_errors: config.uniform_login_errors,
            default_avatar,
        }
    }

    /// Creates the account. No token is issued; the caller logs in afterwards.
    pub async fn register(
        &self,
        email: Option<&str>,
        username: Option<&str>,
        password: Option<&str>,
        avatar: Option<String>,
    ) -> Result<User> {
        let (Some(email), Some(username), Some(password)) =
            (present(email), present(username), present(password))
        else {
            return Err(AppError::InvalidInput(
                "Email, username, and password are required!".to_string(),
            ));
        };

        if !is_valid_email(email) {
            return Err(AppError::InvalidInput(
                "Please provide a valid email address!".to_string(),
            ));
        }

        if password.len() > MAX_PASSWORD_BYTES {
            return Err(AppError::InvalidInput(format!(
                "Password must be at most {} bytes!",
                MAX_PASSWORD_BYTES
            )));
        }

        if self.users.find_by_email_or_username(email, username).await?.is_some() {
            warn!(username, "registration rejected: email or username taken");
            return Err(AppError::Conflict("Email or username already exists!".to_string()));
        }

        let password_hash = hash_password(password, self.bcrypt_cost).await?;
        let user = self
            .users
            .create(NewUser {
                email: email.to_string(),
                username: username.to_string(),
                password_hash,
                avatar: Some(avatar.unwrap_or_else(|| self.default_avatar.clone())),
            })
            .await?;

        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Checks the credentials and returns a fresh token.
    pub async fn login(&self, username: Option<&str>, password: Option<&str>) -> Result<String> {
        let (Some(username), Some(password)) = (present(username), present(password)) else {
            return Err(AppError::InvalidInput(
                "Username or password is missing!".to_string(),
            ));
        };

        let user = match self.users.find_by_username(username).await? {
            Some(user) => user,
            None if self.uniform_login_errors => {
                warn!(username, "login rejected");
                return Err(AuthError::InvalidCredentials.into());
            }
            None => return Err(AppError::NotFound("User not found!".to_string())),
        };

        if !verify_password(password, &user.password_hash).await? {
            warn!(username, "login rejected");
            return Err(AuthError::InvalidCredentials.into());
        }

        let token = self.tokens.issue(user.id, &user.username, &user.email)?;
        info!(user_id = %user.id, "login successful");
        Ok(token)
    }
}
