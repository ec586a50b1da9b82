use actix_multipart::Multipart;
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::AppState;
use crate::Result;

/// Largest JSON registration body accepted.
const MAX_JSON_BODY: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

async fn read_json_body(mut payload: web::Payload) -> Result<RegisterRequest> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| AppError::InvalidInput(e.to_string()))?;
        if body.len() + chunk.len() > MAX_JSON_BODY {
            return Err(AppError::InvalidInput("Request body too large!".to_string()));
        }
        body.extend_from_slice(&chunk);
    }

    serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid JSON body: {}", e)))
}

/// Accepts either a JSON body or a multipart form with an optional `avatar` file.
pub async fn register(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let (form, avatar) = if req.content_type() == "multipart/form-data" {
        let form = state
            .avatars
            .read_form(Multipart::new(req.headers(), payload))
            .await?;
        let request = RegisterRequest {
            email: form.field("email").map(str::to_string),
            username: form.field("username").map(str::to_string),
            password: form.field("password").map(str::to_string),
        };
        (request, form.avatar)
    } else {
        (read_json_body(payload).await?, None)
    };

    info!(username = ?form.username, "received registration request");

    let result = state
        .accounts
        .register(
            form.email.as_deref(),
            form.username.as_deref(),
            form.password.as_deref(),
            avatar.clone(),
        )
        .await;

    match result {
        Ok(_) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "User registered successfully!"
        }))),
        Err(e) => {
            if let Some(path) = avatar {
                state.avatars.discard(&path).await;
            }
            Err(e)
        }
    }
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    info!(username = ?req.username, "received login request");
    match state
        .accounts
        .login(req.username.as_deref(), req.password.as_deref())
        .await
    {
        Ok(token) => Ok(HttpResponse::Ok().json(AuthResponse {
            token,
            message: "Login successful!".to_string(),
        })),
        Err(e) => {
            if matches!(e, AppError::Database(_) | AppError::Internal(_)) {
                error!(username = ?req.username, error = %e, "login failed");
            }
            Err(e)
        }
    }
}

/// 200 when the bearer token is valid; the extractor answers 401 otherwise.
pub async fn verify_token(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "valid": true,
        "userId": user.0.user_id,
        "username": user.0.username,
        "email": user.0.email,
    }))
}
