use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::AuthenticatedUser;
use crate::db::models::ScoreEntry;
use crate::leaderboard::{Submission, SubmitOutcome};
use crate::AppState;
use crate::Result;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResultRequest {
    #[serde(alias = "maxLevelReached")]
    pub level_reached: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SaveResultResponse {
    pub message: &'static str,
    pub outcome: SubmitOutcome,
    pub entry: ScoreEntry,
}

pub async fn get_leaderboard(
    _user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let entries = state.leaderboard.list_all().await?;
    Ok(HttpResponse::Ok().json(entries))
}

pub async fn save_result(
    user: AuthenticatedUser,
    req: web::Json<SaveResultRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    // The username claim goes stale after a rename; the stored record does not.
    let profile = state.profiles.get_info(user.0.user_id).await?;
    let Submission { outcome, entry } = state
        .leaderboard
        .submit_result(Some(&profile.username), req.level_reached)
        .await?;

    let (mut response, message) = match outcome {
        SubmitOutcome::Created => (HttpResponse::Created(), "User result saved successfully!"),
        SubmitOutcome::Updated => (HttpResponse::Ok(), "User result updated successfully!"),
        SubmitOutcome::Unchanged => (
            HttpResponse::Ok(),
            "User result remains unchanged as the new max level is not higher than the existing one!",
        ),
    };

    Ok(response.json(SaveResultResponse {
        message,
        outcome,
        entry,
    }))
}
