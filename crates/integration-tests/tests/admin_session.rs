//! Admin auth routes over an in-memory session store, fake accounts and a
//! hand-driven clock.

#![allow(clippy::unwrap_used)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, OnceLock};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{TimeDelta, TimeZone, Utc};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, SessionManagerLayer};

use dar_sellami_admin::config::AdminConfig;
use dar_sellami_admin::models::AdminAccount;
use dar_sellami_admin::routes;
use dar_sellami_admin::services::auth::hash_password;
use dar_sellami_admin::state::AppState;
use dar_sellami_core::{AdminUserId, ManualClock};
use dar_sellami_integration_tests::InMemoryAccounts;

const PASSWORD: &str = "harissa-and-olive-oil";

fn password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(PASSWORD).unwrap())
}

fn account(id: i32, email: &str) -> AdminAccount {
    AdminAccount {
        id: AdminUserId::new(id),
        email: email.to_owned(),
        password_hash: password_hash().to_owned(),
        is_active: true,
    }
}

fn config() -> AdminConfig {
    AdminConfig {
        database_url: SecretString::from("postgres://localhost/dar_sellami_test"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 3001,
        base_url: "http://localhost:3001".to_owned(),
        session_secret: SecretString::from(
            "k3Jd9sLq0vXz7RtY2wPm5NcB8hGf4AeUq1Wx6Zr2Tn8Vb4Mc0Ls7Pd3Hj9Kf5Ga1",
        ),
        session_timeout: TimeDelta::hours(24),
        dashboard_title: "Dar Sellami Admin Dashboard".to_owned(),
        items_per_page: 10,
        max_login_attempts: 5,
        sentry_dsn: None,
    }
}

fn app(accounts: Vec<AdminAccount>, clock: Arc<ManualClock>) -> Router {
    let config = config();
    // Never connected: these routes only touch the pool for order listings
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/dar_sellami_test")
        .unwrap();
    let state = AppState::with_collaborators(
        config.clone(),
        pool,
        Arc::new(InMemoryAccounts(accounts)),
        clock,
    );

    routes::routes(config.max_login_attempts)
        .layer(SessionManagerLayer::new(MemoryStore::default()))
        .with_state(state)
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
    ))
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_with_cookie(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut request = Request::get(uri).header("x-forwarded-for", "203.0.113.7");
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    request.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Sign in and return the session cookie.
async fn sign_in(app: &Router, email: &str) -> String {
    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/login",
            &json!({ "email": email, "password": PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    cookie.split(';').next().unwrap().to_owned()
}

async fn session_state(app: &Router, cookie: &str) -> Value {
    let response = app
        .clone()
        .oneshot(get_with_cookie("/auth/session", Some(cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await
}

#[tokio::test]
async fn test_login_opens_session() {
    let app = app(vec![account(1, "chef@darsellami.tn")], clock());

    let cookie = sign_in(&app, "Chef@DarSellami.tn").await;
    let body = session_state(&app, &cookie).await;

    assert_eq!(
        body,
        json!({ "authenticated": true, "user": { "id": 1, "email": "chef@darsellami.tn" } })
    );
}

#[tokio::test]
async fn test_wrong_password_is_generic() {
    let app = app(vec![account(1, "x@y.com")], clock());

    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/login",
            &json!({ "email": "x@y.com", "password": "bad" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!("invalid_credentials"));
    assert_eq!(body["message"], json!("Invalid email or password"));
}

#[tokio::test]
async fn test_unknown_email_matches_wrong_password() {
    let app = app(vec![account(1, "x@y.com")], clock());

    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/login",
            &json!({ "email": "nobody@y.com", "password": PASSWORD }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        json_body(response).await["message"],
        json!("Invalid email or password")
    );
}

#[tokio::test]
async fn test_duplicate_accounts_report_integrity_fault() {
    let app = app(
        vec![account(1, "chef@darsellami.tn"), account(2, "CHEF@darsellami.tn")],
        clock(),
    );

    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/login",
            &json!({ "email": "chef@darsellami.tn", "password": PASSWORD }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["code"], json!("integrity_fault"));
    assert_eq!(
        body["message"],
        json!("Database integrity error. Please contact administrator.")
    );
}

#[tokio::test]
async fn test_session_expires_after_timeout() {
    let clock = clock();
    let app = app(vec![account(1, "chef@darsellami.tn")], Arc::clone(&clock));
    let cookie = sign_in(&app, "chef@darsellami.tn").await;

    clock.advance(TimeDelta::hours(23));
    assert_eq!(session_state(&app, &cookie).await["authenticated"], json!(true));

    clock.advance(TimeDelta::hours(2));
    assert_eq!(
        session_state(&app, &cookie).await,
        json!({ "authenticated": false })
    );

    // Guarded routes see the same expiry
    let response = app
        .clone()
        .oneshot(get_with_cookie("/api/orders", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = app(vec![account(1, "chef@darsellami.tn")], clock());
    let cookie = sign_in(&app, "chef@darsellami.tn").await;

    let response = app
        .clone()
        .oneshot(
            Request::post("/auth/logout")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        session_state(&app, &cookie).await["authenticated"],
        json!(false)
    );
}

#[tokio::test]
async fn test_guarded_routes_require_session() {
    let app = app(vec![account(1, "chef@darsellami.tn")], clock());

    for uri in ["/dashboard", "/api/orders"] {
        let response = app
            .clone()
            .oneshot(get_with_cookie(uri, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await,
            json!({ "success": false, "message": "Authentication required" })
        );
    }
}

#[tokio::test]
async fn test_signup_is_not_offered() {
    let app = app(Vec::new(), clock());

    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/signup",
            &json!({ "email": "new@darsellami.tn", "password": PASSWORD }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["code"], json!("signup_disabled"));
    assert_eq!(
        body["message"],
        json!("Admin registration is not available through this interface")
    );
}
