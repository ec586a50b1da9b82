//! Authentication module
//!
//! Token issuance and verification, password hashing, registration and
//! login, and the extractor guarding authenticated routes.

mod extractor;
pub mod handlers;
mod password;
mod service;
mod token;

pub use extractor::{bearer_token, AuthenticatedUser};
pub use password::{hash_password, verify_password};
pub use service::AccountService;
pub use token::{Claims, Identity, TokenService};
