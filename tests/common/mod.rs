#![allow(dead_code)]

use actix_web::http::header;
use actix_web::web;
use levelboard_server::{AppState, MemoryStore, Settings};
use std::sync::Arc;

pub const BOUNDARY: &str = "levelboard-test-boundary";

pub fn test_settings() -> Settings {
    Settings::new_for_test().expect("Failed to load test config")
}

pub fn state_with(settings: Settings) -> web::Data<AppState> {
    let store = Arc::new(MemoryStore::new());
    web::Data::new(AppState::with_stores(settings, store.clone(), store))
}

pub fn test_state() -> web::Data<AppState> {
    state_with(test_settings())
}

/// Registers through the account service and returns a login token.
pub async fn seed_user(state: &AppState, email: &str, username: &str, password: &str) -> String {
    state
        .accounts
        .register(Some(email), Some(username), Some(password), None)
        .await
        .expect("registration failed");
    state
        .accounts
        .login(Some(username), Some(password))
        .await
        .expect("login failed")
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

pub fn multipart_content_type() -> (header::HeaderName, String) {
    (
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", BOUNDARY),
    )
}

fn text_part(body: &mut Vec<u8>, name: &str, value: &str) {
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        )
        .as_bytes(),
    );
}

fn file_part(body: &mut Vec<u8>, name: &str, filename: &str, bytes: &[u8]) {
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            BOUNDARY, name, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
}

/// Hand-built `multipart/form-data` body: text fields first, then the file.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        text_part(&mut body, name, value);
    }
    if let Some((name, filename, bytes)) = file {
        file_part(&mut body, name, filename, bytes);
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Same as [`multipart_body`] with the file sent before the text fields.
pub fn multipart_body_file_first(file: (&str, &str, &[u8]), fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    let (name, filename, bytes) = file;
    file_part(&mut body, name, filename, bytes);
    for (name, value) in fields {
        text_part(&mut body, name, value);
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}
