use actix_web::web;

use crate::error::AppError;
use crate::Result;

/// bcrypt ignores everything past this many bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Salted bcrypt hash, computed on the blocking pool.
pub async fn hash_password(password: &str, cost: u32) -> Result<String> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::InvalidInput(format!(
            "Password must be at most {} bytes!",
            MAX_PASSWORD_BYTES
        )));
    }
    let password = password.to_owned();
    let hashed = web::block(move || bcrypt::hash(password, cost)).await??;
    Ok(hashed)
}

/// A password longer than any storable one never matches.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Ok(false);
    }
    let password = password.to_owned();
    let hash = hash.to_owned();
    let matches = web::block(move || bcrypt::verify(password, &hash)).await??;
    Ok(matches)
}
