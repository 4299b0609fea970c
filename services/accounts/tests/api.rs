use std::sync::{Arc, Mutex};

use accounts::{
    AppState,
    config::ServerConfig,
    credentials::{CredentialConfig, CredentialManager, HashCost},
    mailer::{EmailMessage, Mailer, MailerError},
    repositories::{AccountStore, MemoryAccountStore},
    routes::create_router,
};
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

/// Mailer that records every message, optionally failing delivery
#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl RecordingMailer {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), MailerError> {
        if self.fail {
            return Err(MailerError::Rejected(503));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryAccountStore>,
    mailer: Arc<RecordingMailer>,
    _uploads: TempDir,
}

fn spawn_app_with(mailer: RecordingMailer) -> TestApp {
    let uploads = TempDir::new().unwrap();
    let store = Arc::new(MemoryAccountStore::new());
    let mailer = Arc::new(mailer);

    let credentials = CredentialManager::new(CredentialConfig {
        jwt_secret: "integration-secret".to_string(),
        jwt_expiry: 3600,
        hash_cost: HashCost {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
    })
    .unwrap();

    let config = ServerConfig {
        upload_path: uploads.path().to_string_lossy().into_owned(),
        ..ServerConfig::default()
    };

    let state = AppState::new(store.clone(), mailer.clone(), credentials, config);

    TestApp {
        router: create_router(state),
        store,
        mailer,
        _uploads: uploads,
    }
}

fn spawn_app() -> TestApp {
    spawn_app_with(RecordingMailer::default())
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(format!("/workshift/api/v1{}", uri))
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(format!("/workshift/api/v1{}", uri));
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> Response {
    app.router.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn register(app: &TestApp, email: &str, password: &str, role: &str) -> String {
    let response = send(
        app,
        json_request(
            "POST",
            "/auth/register",
            None,
            json!({
                "username": "jane",
                "email": email,
                "password": password,
                "role": role,
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    body["token"].as_str().unwrap().to_string()
}

async fn login(app: &TestApp, email: &str, password: &str) -> Response {
    send(
        app,
        json_request(
            "POST",
            "/auth/login",
            None,
            json!({ "email": email, "password": password }),
        ),
    )
    .await
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app();

    let response = send(&app, empty_request("GET", "/health", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_register_returns_token_and_cookie() {
    let app = spawn_app();

    let response = send(
        &app,
        json_request(
            "POST",
            "/auth/register",
            None,
            json!({
                "username": "jane",
                "email": "jane@example.com",
                "password": "secret1",
            }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(!cookie.contains("Secure"));

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["role"], "user");
    assert!(body["token"].is_string());

    let stored = app
        .store
        .find_by_email("jane@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.password_hash.starts_with("$argon2id$"));
    assert!(!stored.actif);
}

#[tokio::test]
async fn test_register_rejects_invalid_input() {
    let app = spawn_app();

    let response = send(
        &app,
        json_request(
            "POST",
            "/auth/register",
            None,
            json!({ "username": "jane", "email": "not-an-email", "password": "secret1" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["success"], false);

    let response = send(
        &app,
        json_request(
            "POST",
            "/auth/register",
            None,
            json!({ "username": "jane", "email": "jane@example.com", "password": "short" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let app = spawn_app();
    register(&app, "jane@example.com", "secret1", "user").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/auth/register",
            None,
            json!({ "username": "other", "email": "jane@example.com", "password": "secret2" }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Duplicate field value entered"
    );

    // The first account keeps its password
    assert_eq!(
        login(&app, "jane@example.com", "secret1").await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = spawn_app();
    register(&app, "jane@example.com", "secret1", "user").await;

    let wrong_password = login(&app, "jane@example.com", "wrong-password").await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    let wrong_password = body_json(wrong_password).await;

    let unknown_email = login(&app, "nobody@example.com", "secret1").await;
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    let unknown_email = body_json(unknown_email).await;

    assert_eq!(wrong_password, unknown_email);
}

#[tokio::test]
async fn test_login_requires_email_and_password() {
    let app = spawn_app();

    let response = send(
        &app,
        json_request(
            "POST",
            "/auth/login",
            None,
            json!({ "email": "jane@example.com" }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Please provide an email and password"
    );
}

#[tokio::test]
async fn test_me_requires_a_session() {
    let app = spawn_app();

    let response = send(&app, empty_request("GET", "/auth/me", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, empty_request("GET", "/auth/me", Some("garbage"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_accepts_bearer_and_cookie() {
    let app = spawn_app();
    let token = register(&app, "jane@example.com", "secret1", "user").await;

    let response = send(&app, empty_request("GET", "/auth/me", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["email"], "jane@example.com");
    assert!(body["data"].get("passwordHash").is_none());
    assert!(body["data"].get("resetPasswordToken").is_none());

    let request = Request::builder()
        .uri("/workshift/api/v1/auth/me")
        .header(header::COOKIE, format!("token={}", token))
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = spawn_app();

    let response = send(&app, empty_request("GET", "/auth/logout", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("token=none;"));
    assert_eq!(body_json(response).await["data"], json!({}));
}

#[tokio::test]
async fn test_update_password() {
    let app = spawn_app();
    let token = register(&app, "jane@example.com", "secret1", "user").await;

    let response = send(
        &app,
        json_request(
            "PUT",
            "/auth/updatepassword",
            Some(&token),
            json!({ "currentPassword": "wrong-password", "newPassword": "secret2" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Password is incorrect");

    let response = send(
        &app,
        json_request(
            "PUT",
            "/auth/updatepassword",
            Some(&token),
            json!({ "currentPassword": "secret1", "newPassword": "secret2" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["token"].is_string());

    assert_eq!(
        login(&app, "jane@example.com", "secret1").await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        login(&app, "jane@example.com", "secret2").await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_update_details() {
    let app = spawn_app();
    let token = register(&app, "jane@example.com", "secret1", "user").await;

    let response = send(
        &app,
        json_request(
            "PUT",
            "/auth/updatedetails",
            Some(&token),
            json!({ "username": "janet" }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], "janet");
    assert_eq!(body["data"]["email"], "jane@example.com");
}

#[tokio::test]
async fn test_forgot_and_reset_password() {
    let app = spawn_app();
    register(&app, "jane@example.com", "secret1", "user").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/auth/forgotpassword",
            None,
            json!({ "email": "jane@example.com" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "jane@example.com");
    let raw_token = sent[0]
        .body
        .split("reset-password/")
        .nth(1)
        .unwrap()
        .trim()
        .to_string();

    // Only the digest is stored
    let stored = app
        .store
        .find_by_email("jane@example.com")
        .await
        .unwrap()
        .unwrap();
    let digest = stored.reset_password_token.unwrap();
    assert_ne!(digest, raw_token);
    assert!(stored.reset_password_expire.is_some());

    let response = send(
        &app,
        json_request(
            "PUT",
            &format!("/auth/resetpassword/{}", raw_token),
            None,
            json!({ "password": "brand-new" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["token"].is_string());

    let stored = app
        .store
        .find_by_email("jane@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.reset_password_token.is_none());
    assert!(stored.reset_password_expire.is_none());

    assert_eq!(
        login(&app, "jane@example.com", "brand-new").await.status(),
        StatusCode::OK
    );

    // A consumed token cannot be replayed
    let response = send(
        &app,
        json_request(
            "PUT",
            &format!("/auth/resetpassword/{}", raw_token),
            None,
            json!({ "password": "another-one" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Invalid token");
}

#[tokio::test]
async fn test_forgot_password_unknown_email() {
    let app = spawn_app();

    let response = send(
        &app,
        json_request(
            "POST",
            "/auth/forgotpassword",
            None,
            json!({ "email": "nobody@example.com" }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_forgot_password_delivery_failure_withdraws_token() {
    let app = spawn_app_with(RecordingMailer::failing());
    register(&app, "jane@example.com", "secret1", "user").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/auth/forgotpassword",
            None,
            json!({ "email": "jane@example.com" }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Email could not be sent");

    let stored = app
        .store
        .find_by_email("jane@example.com")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.reset_password_token.is_none());
    assert!(stored.reset_password_expire.is_none());
}

#[tokio::test]
async fn test_users_routes_require_admin() {
    let app = spawn_app();

    let response = send(&app, empty_request("GET", "/users", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = register(&app, "jane@example.com", "secret1", "user").await;
    let response = send(&app, empty_request("GET", "/users", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["error"],
        "Not authorized to access this route"
    );
}

#[tokio::test]
async fn test_admin_manages_accounts() {
    let app = spawn_app();
    let token = register(&app, "boss@example.com", "secret1", "admin").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/users",
            Some(&token),
            json!({
                "username": "worker",
                "email": "worker@example.com",
                "password": "initial1",
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["role"], "user");

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "worker@example.com");

    let response = send(&app, empty_request("GET", "/users", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["count"], 2);

    // Passwords set by an admin are hashed like any other
    let response = send(
        &app,
        json_request(
            "PUT",
            &format!("/users/{}", id),
            Some(&token),
            json!({ "password": "changed1" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        login(&app, "worker@example.com", "changed1").await.status(),
        StatusCode::OK
    );

    let response = send(
        &app,
        empty_request("DELETE", &format!("/users/{}", id), Some(&token)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        empty_request("GET", &format!("/users/{}", id), Some(&token)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, empty_request("GET", "/users/not-a-uuid", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_uploads_photo() {
    let app = spawn_app();
    let token = register(&app, "boss@example.com", "secret1", "admin").await;
    let id = app
        .store
        .find_by_email("boss@example.com")
        .await
        .unwrap()
        .unwrap()
        .id;

    let boundary = "X-WORKSHIFT-BOUNDARY";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"me.png\"\r\n\
         Content-Type: image/png\r\n\r\nnot-really-a-png\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/workshift/api/v1/users/{}/photo", id))
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let expected = format!("profile_{}.png", id);
    assert_eq!(body_json(response).await["data"], expected.as_str());
    let stored = app.store.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.photo, expected);
}
