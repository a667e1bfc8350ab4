use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::Duration;
use mealmates_auth::{TokenConfig, TokenService};
use mealmates_db::Database;
use mealmates_gateway::{CheckoutProvider, CheckoutRequest, CheckoutSession, GatewayError, SmsSender};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tower::ServiceExt;

use super::create_router;
use crate::state::AppState;

struct RecordingSms(mpsc::UnboundedSender<(String, String)>);

#[async_trait]
impl SmsSender for RecordingSms {
    async fn send(&self, to: &str, text: &str) -> Result<(), GatewayError> {
        let _ = self.0.send((to.to_string(), text.to_string()));
        Ok(())
    }
}

struct FailingSms;

#[async_trait]
impl SmsSender for FailingSms {
    async fn send(&self, _to: &str, _text: &str) -> Result<(), GatewayError> {
        Err(GatewayError::SmsRejected("Non White-listed Destination".to_string()))
    }
}

struct StubCheckout;

#[async_trait]
impl CheckoutProvider for StubCheckout {
    async fn create_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession, GatewayError> {
        Ok(CheckoutSession {
            id: format!("cs_test_{}", request.amount),
            url: Some("https://checkout.stripe.com/c/pay/cs_test".to_string()),
        })
    }
}

struct DownCheckout;

#[async_trait]
impl CheckoutProvider for DownCheckout {
    async fn create_session(&self, _request: &CheckoutRequest) -> Result<CheckoutSession, GatewayError> {
        Err(GatewayError::Upstream {
            status: 503,
            message: "unavailable".to_string(),
        })
    }
}

async fn test_state() -> AppState {
    let tokens = Arc::new(TokenService::new(&TokenConfig {
        access_secret: "test-access-secret".to_string(),
        refresh_secret: "test-refresh-secret".to_string(),
        access_ttl: Duration::minutes(60),
        refresh_ttl: Duration::days(10),
    }));
    AppState::new(Database::in_memory().await.unwrap(), tokens)
}

fn app(state: AppState) -> Router {
    create_router(state, &["http://localhost:5173".to_string()])
}

struct TestResponse {
    status: StatusCode,
    cookies: Vec<String>,
    body: Value,
}

impl TestResponse {
    /// `name=value` pair of a Set-Cookie header, ready to send back
    fn cookie(&self, name: &str) -> String {
        self.cookies
            .iter()
            .filter_map(|c| c.split(';').next())
            .find(|pair| pair.starts_with(&format!("{}=", name)))
            .unwrap()
            .to_string()
    }
}

async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let cookies = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    TestResponse { status, cookies, body }
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_cookie(uri: &str, method: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn alice() -> Value {
    json!({
        "email": "alice@example.com",
        "username": "Alice",
        "password": "hunter22",
        "fullname": "Alice Doe",
        "role": "resident"
    })
}

async fn register_and_login(app: &Router) -> TestResponse {
    let registered = send(app, post_json("/api/users/register", alice())).await;
    assert_eq!(registered.status, StatusCode::CREATED);

    let login = send(
        app,
        post_json(
            "/api/users/login",
            json!({"email": "alice@example.com", "password": "hunter22"}),
        ),
    )
    .await;
    assert_eq!(login.status, StatusCode::OK);
    login
}

#[tokio::test]
async fn test_register_hides_secrets() {
    let app = app(test_state().await);

    let response = send(&app, post_json("/api/users/register", alice())).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["statusCode"], 201);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["data"]["username"], "alice");
    assert!(response.body["data"].get("password").is_none());
    assert!(response.body["data"].get("passwordHash").is_none());
    assert!(response.body["data"].get("refreshToken").is_none());

    let duplicate = send(&app, post_json("/api/users/register", alice())).await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
    assert_eq!(duplicate.body["success"], false);
    assert_eq!(duplicate.body["message"], "User exist with this email/username");
}

#[tokio::test]
async fn test_register_requires_all_fields() {
    let app = app(test_state().await);

    let mut missing = alice();
    missing["fullname"] = json!("  ");
    let response = send(&app, post_json("/api/users/register", missing)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "All fields are required");

    let malformed = Request::builder()
        .method("POST")
        .uri("/api/users/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = send(&app, malformed).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
}

#[tokio::test]
async fn test_login_sets_cookies() {
    let app = app(test_state().await);
    let login = register_and_login(&app).await;

    assert_eq!(login.cookies.len(), 2);
    for cookie in &login.cookies {
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=None"));
    }
    assert!(login.body["data"]["accessToken"].is_string());
    assert!(login.body["data"]["refreshToken"].is_string());
    assert_eq!(login.body["data"]["user"]["email"], "alice@example.com");
    assert!(login.body["data"]["user"].get("refreshToken").is_none());
}

#[tokio::test]
async fn test_login_failures() {
    let app = app(test_state().await);
    send(&app, post_json("/api/users/register", alice())).await;

    let unknown = send(
        &app,
        post_json("/api/users/login", json!({"email": "bob@example.com", "password": "x"})),
    )
    .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.body["message"], "User does not exist");

    let wrong = send(
        &app,
        post_json("/api/users/login", json!({"email": "alice@example.com", "password": "x"})),
    )
    .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["message"], "Invalid user credentials");

    let no_email = send(&app, post_json("/api/users/login", json!({"password": "x"}))).await;
    assert_eq!(no_email.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_email.body["message"], "Email is required");
}

#[tokio::test]
async fn test_current_user_and_logout() {
    let app = app(test_state().await);
    let login = register_and_login(&app).await;
    let access = login.cookie("accessToken");
    let refresh = login.cookie("refreshToken");

    let me = send(&app, with_cookie("/api/users/current-user", "GET", &access)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["username"], "alice");

    // Bearer header works as well
    let bearer = Request::builder()
        .uri("/api/users/current-user")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", login.body["data"]["accessToken"].as_str().unwrap()),
        )
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, bearer).await.status, StatusCode::OK);

    let anonymous = send(
        &app,
        Request::builder()
            .uri("/api/users/current-user")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.body["message"], "Unauthorized request");

    let logout = send(&app, with_cookie("/api/users/logout", "POST", &access)).await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(logout.body["data"], json!({}));
    assert_eq!(logout.cookies.len(), 2);
    assert!(logout.cookies.iter().all(|c| c.contains("Max-Age=0")));

    // The refresh token died with the session
    let refreshed = send(&app, with_cookie("/api/users/refresh-token", "POST", &refresh)).await;
    assert_eq!(refreshed.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_is_single_use() {
    let app = app(test_state().await);
    let login = register_and_login(&app).await;
    let refresh = login.cookie("refreshToken");

    let first = send(&app, with_cookie("/api/users/refresh-token", "POST", &refresh)).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.cookies.len(), 2);
    let rotated = first.body["data"]["refreshToken"].as_str().unwrap().to_string();
    assert_ne!(format!("refreshToken={}", rotated), refresh);

    let replay = send(&app, with_cookie("/api/users/refresh-token", "POST", &refresh)).await;
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);
    assert_eq!(replay.body["message"], "Refresh token is expired or used");

    // Body fallback for clients without cookies
    let from_body = send(
        &app,
        post_json("/api/users/refresh-token", json!({"refreshToken": rotated})),
    )
    .await;
    assert_eq!(from_body.status, StatusCode::OK);

    let missing = send(&app, post_json("/api/users/refresh-token", json!({}))).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["message"], "Unauthorized request");
}

#[tokio::test]
async fn test_change_password() {
    let app = app(test_state().await);
    let login = register_and_login(&app).await;
    let access = login.cookie("accessToken");
    let refresh = login.cookie("refreshToken");

    let change = |old: &str, new: &str| {
        Request::builder()
            .method("POST")
            .uri("/api/users/change-password")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, access.clone())
            .body(Body::from(
                json!({"oldPassword": old, "newPassword": new}).to_string(),
            ))
            .unwrap()
    };

    let wrong = send(&app, change("nope", "correct-horse")).await;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong.body["message"], "Invalid old password");

    let ok = send(&app, change("hunter22", "correct-horse")).await;
    assert_eq!(ok.status, StatusCode::OK);

    let old_login = send(
        &app,
        post_json(
            "/api/users/login",
            json!({"email": "alice@example.com", "password": "hunter22"}),
        ),
    )
    .await;
    assert_eq!(old_login.status, StatusCode::UNAUTHORIZED);

    let new_login = send(
        &app,
        post_json(
            "/api/users/login",
            json!({"email": "alice@example.com", "password": "correct-horse"}),
        ),
    )
    .await;
    assert_eq!(new_login.status, StatusCode::OK);

    // The refresh token from before the change no longer rotates
    let stale = send(&app, with_cookie("/api/users/refresh-token", "POST", &refresh)).await;
    assert_eq!(stale.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_users_is_protected() {
    let app = app(test_state().await);

    let anonymous = send(
        &app,
        Request::builder()
            .uri("/api/users/getAllUser")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let login = register_and_login(&app).await;
    let users = send(
        &app,
        with_cookie("/api/users/getAllUser", "GET", &login.cookie("accessToken")),
    )
    .await;
    assert_eq!(users.status, StatusCode::OK);
    let list = users.body["data"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert!(list[0].get("password").is_none());
    assert!(list[0].get("refreshToken").is_none());
}

fn complaint() -> Value {
    json!({
        "locality": "Andheri East",
        "foodType": "cooked",
        "foodDescription": "Rice and dal for 20 people",
        "selectedImage": "https://img.example.com/1.jpg",
        "latitude": 19.11,
        "longitude": 72.87,
        "date": "2024-07-10",
        "mobileNo": 919876543210u64
    })
}

#[tokio::test]
async fn test_complaint_sends_confirmation() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let app = app(test_state().await.with_sms(Arc::new(RecordingSms(tx))));

    let response = send(&app, post_json("/api/users/register-complaint", complaint())).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["mobileNo"], "919876543210");
    assert_eq!(response.body["data"]["image"], "https://img.example.com/1.jpg");
    assert_eq!(response.body["data"]["date"], "2024-07-10T00:00:00+00:00");

    let (to, text) = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(to, "919876543210");
    assert_eq!(text, "Your food complaint is registered successfully!!");
}

#[tokio::test]
async fn test_complaint_survives_sms_failure() {
    let app = app(test_state().await.with_sms(Arc::new(FailingSms)));

    let response = send(&app, post_json("/api/users/register-complaint", complaint())).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Complaint Registered successfully!");

    let list = send(
        &app,
        Request::builder()
            .uri("/api/users/get-complaint")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.body["data"].as_array().unwrap().len(), 1);
    assert_eq!(list.body["data"][0]["locality"], "Andheri East");
}

#[tokio::test]
async fn test_complaint_validation() {
    let app = app(test_state().await);

    let mut no_mobile = complaint();
    no_mobile.as_object_mut().unwrap().remove("mobileNo");
    let response = send(&app, post_json("/api/users/register-complaint", no_mobile)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Mobile number is required");

    let mut bad_date = complaint();
    bad_date["date"] = json!("yesterday");
    let response = send(&app, post_json("/api/users/register-complaint", bad_date)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_session() {
    let state = test_state().await.with_checkout(Arc::new(StubCheckout));
    let db = state.db.clone();
    let app = app(state);

    let missing = send(
        &app,
        post_json(
            "/api/users/create-checkout-session",
            json!({"name": "Bob", "email": "bob@example.com"}),
        ),
    )
    .await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.body["message"], "Amount is required");

    let created = send(
        &app,
        post_json(
            "/api/users/create-checkout-session",
            json!({"name": "Bob", "email": "bob@example.com", "amount": "250", "message": "Keep it up"}),
        ),
    )
    .await;
    assert_eq!(created.status, StatusCode::OK);
    assert_eq!(created.body["data"]["id"], "cs_test_250");

    let payments = db.list_payments().await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].checkout_session_id, "cs_test_250");
    assert_eq!(payments[0].amount, 250);
}

#[tokio::test]
async fn test_checkout_gateway_failure_persists_nothing() {
    let state = test_state().await;
    let db = state.db.clone();

    let unconfigured = app(state.clone());
    let body = json!({"name": "Bob", "email": "bob@example.com", "amount": 100});
    let response = send(
        &unconfigured,
        post_json("/api/users/create-checkout-session", body.clone()),
    )
    .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["message"], "Payment processing is not configured");

    let down = app(state.with_checkout(Arc::new(DownCheckout)));
    let response = send(&down, post_json("/api/users/create-checkout-session", body)).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);

    assert!(db.list_payments().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_payment_details_require_session() {
    let app = app(test_state().await);

    let anonymous = send(
        &app,
        Request::builder()
            .uri("/api/users/get-payment-details")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let login = register_and_login(&app).await;
    let response = send(
        &app,
        with_cookie(
            "/api/users/get-payment-details",
            "GET",
            &login.cookie("accessToken"),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"], json!([]));
}

#[tokio::test]
async fn test_health() {
    let app = app(test_state().await);
    let response = send(
        &app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
}
