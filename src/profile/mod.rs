//! User profile: info, rename cascade and avatar uploads.

pub mod handlers;
mod service;
pub mod upload;

pub use service::{InfoUpdate, ProfileService};
pub use upload::{AvatarStorage, UploadedForm};
