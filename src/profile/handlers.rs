use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::AuthenticatedUser;
use crate::AppState;
use crate::Result;

#[derive(Debug, Deserialize)]
pub struct UpdateInfoRequest {
    pub email: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateInfoResponse {
    pub message: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarResponse {
    pub avatar_path: String,
}

pub async fn get_user_info(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let profile = state.profiles.get_info(user.0.user_id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn update_user_info(
    user: AuthenticatedUser,
    req: web::Json<UpdateInfoRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let update = state
        .profiles
        .update_info(user.0.user_id, req.email.as_deref(), req.username.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(UpdateInfoResponse {
        message: "Your information has been updated successfully!".to_string(),
        token: update.token,
    }))
}

pub async fn get_user_avatar(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let avatar_path = state.profiles.get_avatar(user.0.user_id).await?;
    Ok(HttpResponse::Ok().json(AvatarResponse { avatar_path }))
}

pub async fn update_user_avatar(
    user: AuthenticatedUser,
    payload: Multipart,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let form = state.avatars.read_form(payload).await?;
    let stored = form.avatar.clone();

    match state.profiles.update_avatar(user.0.user_id, form.avatar).await {
        Ok(updated) => {
            info!(user_id = %updated.id, "avatar upload accepted");
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "message": "User avatar updated successfully!"
            })))
        }
        Err(e) => {
            if let Some(path) = stored {
                state.avatars.discard(&path).await;
            }
            Err(e)
        }
    }
}
