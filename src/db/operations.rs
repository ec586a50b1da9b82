use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::db::models::{NewUser, ScoreEntry, User, UserPatch};
use crate::db::store::{ScoreStore, UserStore};
use crate::error::AppError;
use crate::Result;

const USER_COLUMNS: &str = "id, email, username, password_hash, avatar, created_at, updated_at";
const SCORE_COLUMNS: &str = "id, username, level_reached, created_at, updated_at";

/// Postgres-backed implementation of both stores.
#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.url)
            .await?;

        info!(max_connections = config.max_connections, "connected to postgres");
        Ok(Self { pool: Arc::new(pool) })
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        info!("database migrations applied");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn begin_transaction(&self) -> Result<Transaction<'_, Postgres>> {
        Ok(self.pool.as_ref().begin().await?)
    }

    async fn update_user_with_transaction(
        id: Uuid,
        patch: &UserPatch,
        transaction: &mut Transaction<'_, Postgres>,
    ) -> Result<User> {
        // Lock the row so a concurrent rename cannot interleave with the cascade.
        let old_username: String = sqlx::query_scalar("SELECT username FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **transaction)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found!".to_string()))?;

        if let Some(new_username) = patch.username.as_deref() {
            if new_username != old_username {
                // an entry left under the new name must not be inherited
                let orphan: Option<i32> =
                    sqlx::query_scalar("SELECT 1 FROM score_entries WHERE username = $1")
                        .bind(new_username)
                        .fetch_optional(&mut **transaction)
                        .await?;
                if orphan.is_some() {
                    return Err(AppError::Conflict(
                        "A leaderboard entry already exists for that username!".to_string(),
                    ));
                }

                let renamed = sqlx::query(
                    "UPDATE score_entries SET username = $1, updated_at = now() WHERE username = $2",
                )
                .bind(new_username)
                .bind(&old_username)
                .execute(&mut **transaction)
                .await?;
                debug!(
                    old = %old_username,
                    new = %new_username,
                    rows = renamed.rows_affected(),
                    "renamed score entry"
                );
            }
        }

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                username = COALESCE($3, username),
                avatar = COALESCE($4, avatar),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.email.as_deref())
        .bind(patch.username.as_deref())
        .bind(patch.avatar.as_deref())
        .fetch_one(&mut **transaction)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    async fn find_by_email_or_username(&self, email: &str, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 OR username = $2 LIMIT 1"
        ))
        .bind(email)
        .bind(username)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let user = user.into_user();
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, username, password_hash, avatar, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.avatar.as_deref())
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<User> {
        let mut transaction = self.begin_transaction().await?;

        let result = Self::update_user_with_transaction(id, &patch, &mut transaction).await;

        match result {
            Ok(user) => {
                transaction.commit().await?;
                Ok(user)
            }
            Err(e) => {
                if let Err(rollback_err) = transaction.rollback().await {
                    warn!(user_id = %id, error = %rollback_err, "rollback failed");
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl ScoreStore for PgStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<ScoreEntry>> {
        let entry = sqlx::query_as::<_, ScoreEntry>(&format!(
            "SELECT {SCORE_COLUMNS} FROM score_entries WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(entry)
    }

    async fn create(&self, username: &str, level_reached: i32) -> Result<ScoreEntry> {
        let entry = ScoreEntry::new(username.to_string(), level_reached);
        let entry = sqlx::query_as::<_, ScoreEntry>(&format!(
            r#"
            INSERT INTO score_entries (id, username, level_reached, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {SCORE_COLUMNS}
            "#
        ))
        .bind(entry.id)
        .bind(&entry.username)
        .bind(entry.level_reached)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(entry)
    }

    async fn raise_level(&self, username: &str, level_reached: i32) -> Result<Option<ScoreEntry>> {
        let entry = sqlx::query_as::<_, ScoreEntry>(&format!(
            r#"
            UPDATE score_entries
            SET level_reached = $2, updated_at = now()
            WHERE username = $1 AND level_reached < $2
            RETURNING {SCORE_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(level_reached)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(entry)
    }

    async fn list_all(&self) -> Result<Vec<ScoreEntry>> {
        let entries = sqlx::query_as::<_, ScoreEntry>(&format!(
            "SELECT {SCORE_COLUMNS} FROM score_entries ORDER BY created_at"
        ))
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(entries)
    }
}
