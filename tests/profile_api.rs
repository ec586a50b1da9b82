use actix_web::{test, App};
use levelboard_server::configure_routes;
use serde_json::{json, Value};

mod common;

#[actix_web::test]
async fn test_user_info_requires_token() {
    let state = common::test_state();
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;

    for req in [
        test::TestRequest::get().uri("/user/user-info"),
        test::TestRequest::put().uri("/user/user-info").set_json(json!({ "username": "x" })),
        test::TestRequest::get().uri("/user/user-avatar"),
        test::TestRequest::put().uri("/user/user-avatar"),
        test::TestRequest::get().uri("/leaderboard"),
        test::TestRequest::post().uri("/leaderboard/save-result").set_json(json!({ "levelReached": 1 })),
    ] {
        let response = req.send_request(&app).await;
        assert_eq!(response.status(), 401);
    }
}

#[actix_web::test]
async fn test_get_user_info_hides_password() {
    let state = common::test_state();
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;
    let token = common::seed_user(&state, "a@x.com", "alice", "pw1").await;

    let response = test::TestRequest::get()
        .uri("/user/user-info")
        .insert_header(common::bearer(&token))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["avatar"], "avatars/default_avatar.jpg");
    assert!(body.get("passwordHash").is_none());
}

#[actix_web::test]
async fn test_rename_carries_leaderboard_entry() {
    let state = common::test_state();
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;
    let token = common::seed_user(&state, "a@x.com", "alice", "pw1").await;

    let response = test::TestRequest::post()
        .uri("/leaderboard/save-result")
        .insert_header(common::bearer(&token))
        .set_json(json!({ "levelReached": 4 }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 201);

    let response = test::TestRequest::put()
        .uri("/user/user-info")
        .insert_header(common::bearer(&token))
        .set_json(json!({ "username": "alicia", "email": "alicia@x.com" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = test::read_body_json(response).await;
    let fresh = body["token"].as_str().unwrap().to_string();
    let identity = state.tokens.verify(&fresh).unwrap();
    assert_eq!(identity.username, "alicia");
    assert_eq!(identity.email, "alicia@x.com");

    let entries = state.leaderboard.list_all().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].username, "alicia");
    assert_eq!(entries[0].level_reached, 4);

    // the old token still carries "alice" but results land on the current name
    let response = test::TestRequest::post()
        .uri("/leaderboard/save-result")
        .insert_header(common::bearer(&token))
        .set_json(json!({ "levelReached": 6 }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);

    let response = test::TestRequest::put()
        .uri("/user/user-info")
        .insert_header(common::bearer(&fresh))
        .set_json(json!({ "username": "alice" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);

    let entries = state.leaderboard.list_all().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].username, "alice");
    assert_eq!(entries[0].level_reached, 6);
}

#[actix_web::test]
async fn test_update_info_conflicts() {
    let state = common::test_state();
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;
    let token = common::seed_user(&state, "a@x.com", "alice", "pw1").await;
    common::seed_user(&state, "b@x.com", "bob", "pw2").await;

    let response = test::TestRequest::put()
        .uri("/user/user-info")
        .insert_header(common::bearer(&token))
        .set_json(json!({ "username": "bob" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["error"]["message"], "Username already exists for another user!");

    let response = test::TestRequest::put()
        .uri("/user/user-info")
        .insert_header(common::bearer(&token))
        .set_json(json!({ "email": "b@x.com" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["error"]["message"], "Email already exists for another user!");
}

#[actix_web::test]
async fn test_avatar_update_without_file_keeps_avatar() {
    let state = common::test_state();
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;
    let token = common::seed_user(&state, "a@x.com", "alice", "pw1").await;

    let response = test::TestRequest::put()
        .uri("/user/user-avatar")
        .insert_header(common::bearer(&token))
        .insert_header(common::multipart_content_type())
        .set_payload(common::multipart_body(&[("note", "no file here")], None))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["error"]["message"], "Avatar file is missing!");

    let response = test::TestRequest::get()
        .uri("/user/user-avatar")
        .insert_header(common::bearer(&token))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["avatarPath"], "avatars/default_avatar.jpg");
}

#[actix_web::test]
async fn test_avatar_upload_replaces_path() {
    let state = common::test_state();
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;
    let token = common::seed_user(&state, "a@x.com", "alice", "pw1").await;

    let response = test::TestRequest::put()
        .uri("/user/user-avatar")
        .insert_header(common::bearer(&token))
        .insert_header(common::multipart_content_type())
        .set_payload(common::multipart_body(&[], Some(("avatar", "face.jpeg", b"jpeg bytes"))))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);

    let response = test::TestRequest::get()
        .uri("/user/user-avatar")
        .insert_header(common::bearer(&token))
        .send_request(&app)
        .await;
    let body: Value = test::read_body_json(response).await;
    let path = body["avatarPath"].as_str().unwrap().to_string();
    assert!(path.ends_with(".jpeg"));
    assert_eq!(tokio::fs::read(&path).await.unwrap(), b"jpeg bytes");
    tokio::fs::remove_file(&path).await.ok();
}

#[actix_web::test]
async fn test_avatar_size_limit() {
    let mut settings = common::test_settings();
    settings.uploads.max_avatar_bytes = 16;
    let state = common::state_with(settings);
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;
    let token = common::seed_user(&state, "a@x.com", "alice", "pw1").await;

    let response = test::TestRequest::put()
        .uri("/user/user-avatar")
        .insert_header(common::bearer(&token))
        .insert_header(common::multipart_content_type())
        .set_payload(common::multipart_body(&[], Some(("avatar", "big.png", &[0u8; 64]))))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 400);

    let user = state.tokens.verify(&token).unwrap();
    assert_eq!(
        state.profiles.get_avatar(user.user_id).await.unwrap(),
        "avatars/default_avatar.jpg"
    );
}

#[actix_web::test]
async fn test_rejected_form_leaves_no_avatar_on_disk() {
    let dir = std::env::temp_dir().join(format!("levelboard-rejected-{}", uuid::Uuid::new_v4()));
    let mut settings = common::test_settings();
    settings.uploads.avatar_dir = dir.to_string_lossy().into_owned();
    let state = common::state_with(settings);
    let app = test::init_service(App::new().app_data(state.clone()).configure(configure_routes)).await;
    let token = common::seed_user(&state, "a@x.com", "alice", "pw1").await;

    // the avatar is stored before the oversized field is reached
    let oversized_note = "n".repeat(20 * 1024);
    let response = test::TestRequest::put()
        .uri("/user/user-avatar")
        .insert_header(common::bearer(&token))
        .insert_header(common::multipart_content_type())
        .set_payload(common::multipart_body_file_first(
            ("avatar", "a.png", b"png bytes"),
            &[("note", &oversized_note)],
        ))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 400);

    let mut left = Vec::new();
    if let Ok(mut entries) = tokio::fs::read_dir(&dir).await {
        while let Some(entry) = entries.next_entry().await.unwrap() {
            left.push(entry.file_name());
        }
    }
    assert!(left.is_empty(), "files left behind: {:?}", left);

    let user = state.tokens.verify(&token).unwrap();
    assert_eq!(
        state.profiles.get_avatar(user.user_id).await.unwrap(),
        "avatars/default_avatar.jpg"
    );
    tokio::fs::remove_dir_all(&dir).await.ok();
}
