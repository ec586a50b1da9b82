use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use tracing::warn;

use crate::auth::token::Identity;
use crate::error::{AppError, AuthError};
use crate::AppState;

/// Identity of a caller holding a valid bearer token.
///
/// Taking this as a handler argument rejects the request with 401 before the
/// handler body runs.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

/// `Authorization: Bearer <token>` value, if the header is present at all.
pub fn bearer_token(req: &HttpRequest) -> Result<Option<&str>, AuthError> {
    let Some(value) = req.headers().get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| AuthError::Invalid)?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Some)
        .ok_or(AuthError::Invalid)
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state is not registered".to_string()))?;

    let result = bearer_token(req)
        .and_then(|token| token.ok_or(AuthError::NoToken))
        .and_then(|token| state.tokens.verify(token));

    match result {
        Ok(identity) => Ok(AuthenticatedUser(identity)),
        Err(e) => {
            warn!(path = %req.path(), reason = %e, "unauthenticated request rejected");
            Err(e.into())
        }
    }
}
