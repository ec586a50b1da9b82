pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod leaderboard;
pub mod profile;
pub mod validation;

use actix_cors::Cors;
use actix_web::{http::header, web, HttpResponse};
use std::sync::Arc;
use tracing::info;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

use crate::config::{CorsConfig, StoreBackend, UploadConfig};
pub use auth::{AccountService, AuthenticatedUser, TokenService};
pub use db::{MemoryStore, PgStore, ScoreEntry, ScoreStore, User, UserStore};
pub use leaderboard::LeaderboardService;
pub use profile::{AvatarStorage, ProfileService};

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub tokens: Arc<TokenService>,
    pub accounts: Arc<AccountService>,
    pub profiles: Arc<ProfileService>,
    pub leaderboard: Arc<LeaderboardService>,
    pub avatars: Arc<AvatarStorage>,
    pg: Option<PgStore>,
}

impl AppState {
    /// Builds the state over the configured backend. For Postgres this
    /// connects and applies the embedded migrations.
    pub async fn new(config: Settings) -> Result<Self> {
        match config.database.backend {
            StoreBackend::Postgres => {
                let store = PgStore::connect(&config.database).await?;
                store.migrate().await?;
                let shared = Arc::new(store.clone());
                let mut state = Self::with_stores(config, shared.clone(), shared);
                state.pg = Some(store);
                Ok(state)
            }
            StoreBackend::Memory => {
                info!("using in-memory store; data is lost on exit");
                let store = Arc::new(MemoryStore::new());
                Ok(Self::with_stores(config, store.clone(), store))
            }
        }
    }

    pub fn with_stores(
        config: Settings,
        users: Arc<dyn UserStore>,
        scores: Arc<dyn ScoreStore>,
    ) -> Self {
        let tokens = Arc::new(TokenService::from_config(&config.auth));
        let accounts = AccountService::new(
            users.clone(),
            tokens.clone(),
            &config.auth,
            config.uploads.default_avatar.clone(),
        );

        Self {
            tokens: tokens.clone(),
            accounts: Arc::new(accounts),
            profiles: Arc::new(ProfileService::new(users, tokens)),
            leaderboard: Arc::new(LeaderboardService::new(scores)),
            avatars: Arc::new(AvatarStorage::from_config(&config.uploads)),
            config: Arc::new(config),
            pg: None,
        }
    }

    pub async fn shutdown(&self) -> Result<()> {
        if let Some(pg) = &self.pg {
            pg.close().await;
        }
        Ok(())
    }
}

/// Mounts every API route. Shared by `main` and the integration tests.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    use auth::handlers::{login, register, verify_token};
    use leaderboard::handlers::{get_leaderboard, save_result};
    use profile::handlers::{get_user_avatar, get_user_info, update_user_avatar, update_user_info};

    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::InvalidInput(err.to_string()).into()),
    )
    .route("/health", web::get().to(health_check))
    .service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/verify-token", web::post().to(verify_token)),
    )
    .service(
        web::scope("/user")
            .route("/user-info", web::get().to(get_user_info))
            .route("/user-info", web::put().to(update_user_info))
            .route("/user-avatar", web::get().to(get_user_avatar))
            .route("/user-avatar", web::put().to(update_user_avatar)),
    )
    .service(
        web::scope("/leaderboard")
            .route("", web::get().to(get_leaderboard))
            .route("/save-result", web::post().to(save_result)),
    );
}

/// Static service for stored avatars.
pub fn avatar_files(config: &UploadConfig) -> actix_files::Files {
    actix_files::Files::new(&config.public_path, &config.avatar_dir)
}

/// Single trusted front-end origin, credentials allowed.
pub fn cors(config: &CorsConfig) -> Cors {
    Cors::default()
        .allowed_origin(&config.allowed_origin)
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
        .supports_credentials()
        .max_age(config.max_age as usize)
}
