use actix_multipart::{Field, Multipart, MultipartError};
use chrono::Utc;
use futures::TryStreamExt;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::error::AppError;
use crate::Result;

/// Multipart field carrying the image.
pub const AVATAR_FIELD: &str = "avatar";

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];
const MAX_TEXT_FIELD_BYTES: usize = 16 * 1024;

/// Text fields of a multipart form plus the stored avatar path, if one was sent.
#[derive(Debug, Default)]
pub struct UploadedForm {
    pub fields: HashMap<String, String>,
    pub avatar: Option<String>,
}

impl UploadedForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Writes uploaded avatars to disk under a fixed directory.
pub struct AvatarStorage {
    dir: PathBuf,
    max_bytes: usize,
}

fn malformed(err: MultipartError) -> AppError {
    AppError::InvalidInput(format!("Malformed multipart body: {}", err))
}

/// Lowercased extension if the file name looks like an accepted image.
pub fn image_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

async fn read_limited(field: &mut Field, limit: usize, too_large: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(malformed)? {
        if buf.len() + chunk.len() > limit {
            return Err(AppError::InvalidInput(too_large.to_string()));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

impl AvatarStorage {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(&config.avatar_dir, config.max_avatar_bytes)
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Drains the form. Only the `avatar` field may carry a file; it must be
    /// a jpg/jpeg/png/gif within the size limit and is written to disk before
    /// this returns. If any part of the form is rejected, nothing stays on disk.
    pub async fn read_form(&self, mut payload: Multipart) -> Result<UploadedForm> {
        let mut form = UploadedForm::default();

        match self.read_fields(&mut payload, &mut form).await {
            Ok(()) => Ok(form),
            Err(e) => {
                if let Some(path) = form.avatar.take() {
                    self.discard(&path).await;
                }
                Err(e)
            }
        }
    }

    async fn read_fields(&self, payload: &mut Multipart, form: &mut UploadedForm) -> Result<()> {
        while let Some(mut field) = payload.try_next().await.map_err(malformed)? {
            let disposition = field.content_disposition().clone();
            let name = disposition.get_name().unwrap_or_default().to_string();

            match disposition.get_filename() {
                // browsers send an empty filename when no file was picked
                Some("") => {
                    read_limited(&mut field, self.max_bytes, "File too large!").await?;
                }
                Some(filename) if name == AVATAR_FIELD => {
                    if form.avatar.is_some() {
                        return Err(AppError::InvalidInput("Only one avatar file is allowed!".to_string()));
                    }
                    let ext = image_extension(filename).ok_or_else(|| {
                        AppError::InvalidInput("Only image files are allowed!".to_string())
                    })?;
                    let too_large = format!("File too large! Maximum size is {} bytes.", self.max_bytes);
                    let bytes = read_limited(&mut field, self.max_bytes, &too_large).await?;
                    form.avatar = Some(self.store(&ext, &bytes).await?);
                }
                Some(_) => {
                    warn!(field = %name, "unexpected file field in upload");
                    return Err(AppError::InvalidInput(format!("Unexpected file field '{}'", name)));
                }
                None => {
                    let bytes = read_limited(&mut field, MAX_TEXT_FIELD_BYTES, "Form field too large!").await?;
                    let value = String::from_utf8(bytes).map_err(|_| {
                        AppError::InvalidInput(format!("Form field '{}' is not valid UTF-8", name))
                    })?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(())
    }

    async fn store(&self, ext: &str, bytes: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let filename = format!(
            "avatar-{}-{}.{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            ext
        );
        let path = self.dir.join(&filename);
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "avatar stored");
        Ok(path.to_string_lossy().into_owned())
    }

    /// Removes a file stored by this request when the request then fails.
    pub async fn discard(&self, path: &str) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(path, error = %e, "failed to remove orphaned avatar");
        }
    }
}
