#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chatgate::{
    api::{self, AppState},
    gate::{
        GateConfig,
        session::{GuestPattern, JwtSessions},
    },
};
use secrecy::SecretString;
use std::sync::Arc;
use tower::ServiceExt;
use url::Url;

const SECRET: &str = "router-secret-0123456789abcdef012345";

fn sessions() -> JwtSessions {
    JwtSessions::new(&SecretString::from(SECRET.to_string()), 3600).expect("sessions")
}

fn app(base_url: Option<&str>) -> axum::Router {
    let base_url = base_url.map(|url| Url::parse(url).expect("url"));
    let pattern = GuestPattern::new(GuestPattern::DEFAULT).expect("pattern");
    let config = GateConfig::new(base_url, pattern).expect("config");
    api::router(Arc::new(AppState::new(config, sessions(), "guest.test")))
}

fn cookie(email: &str) -> String {
    let (token, _) = sessions().issue("user-1", Some(email)).expect("token");
    format!("chatgate.session-token={token}")
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn configured_base_url_overrides_request_host() -> Result<()> {
    let response = app(Some("https://chat.example.com"))
        .oneshot(
            Request::builder()
                .uri("/chat/7")
                .header(header::HOST, "10.0.0.12:3000")
                .header("x-forwarded-host", "internal.lb")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        "https://chat.example.com/api/auth/guest?redirectUrl=https%3A%2F%2Fchat.example.com%2Fchat%2F7"
    );
    Ok(())
}

#[tokio::test]
async fn secure_base_url_expects_secure_cookie_name() -> Result<()> {
    // Over https the plain cookie name is ignored, so the request has no session.
    let response = app(Some("https://chat.example.com"))
        .oneshot(
            Request::builder()
                .uri("/login")
                .header(header::COOKIE, cookie("ada@example.com"))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(location(&response).contains("/api/auth/guest?redirectUrl="));

    let secure_cookie = cookie("ada@example.com").replacen("chatgate.", "__Secure-chatgate.", 1);
    let response = app(Some("https://chat.example.com"))
        .oneshot(
            Request::builder()
                .uri("/login")
                .header(header::COOKIE, secure_cookie)
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "https://chat.example.com/");
    Ok(())
}

#[tokio::test]
async fn tampered_token_is_no_session() -> Result<()> {
    let tampered = format!("{}x", cookie("ada@example.com"));
    let response = app(None)
        .oneshot(
            Request::builder()
                .uri("/register")
                .header(header::HOST, "localhost:3000")
                .header(header::COOKIE, tampered)
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        location(&response),
        "http://localhost:3000/api/auth/guest?redirectUrl=http%3A%2F%2Flocalhost%3A3000%2Fregister"
    );
    Ok(())
}

#[tokio::test]
async fn auth_routes_are_not_gated() -> Result<()> {
    let response = app(None)
        .oneshot(
            Request::builder()
                .uri("/api/auth/session")
                .body(Body::empty())?,
        )
        .await?;

    // Passed through to the router, which has no such route.
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let json: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(json["error"], "Not Found");
    Ok(())
}

#[tokio::test]
async fn models_need_a_session() -> Result<()> {
    let response = app(None)
        .oneshot(Request::builder().uri("/api/models").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let response = app(None)
        .oneshot(
            Request::builder()
                .uri("/api/models")
                .header(header::COOKIE, cookie("guest-01ARZ3NDEKTSV4RRFFQ69G5FAV@guest.test"))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let json: serde_json::Value = serde_json::from_slice(&body)?;
    assert!(json["models"].as_array().is_some_and(|models| !models.is_empty()));
    Ok(())
}

#[tokio::test]
async fn openapi_document_is_served() -> Result<()> {
    let response = app(None)
        .oneshot(
            Request::builder()
                .uri("/api/openapi.json")
                .header(header::COOKIE, cookie("ada@example.com"))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let json: serde_json::Value = serde_json::from_slice(&body)?;
    assert!(json["paths"]["/api/auth/guest"].is_object());
    Ok(())
}

#[tokio::test]
async fn guest_bootstrap_rejects_smuggled_hosts() -> Result<()> {
    for redirect_url in [
        "%2F%09%2Fevil.example.com%2F",
        "%2F%0A%2Fevil.example.com%2F",
        "%2F%0D%2Fevil.example.com%2F",
        "%2F%5Cevil.example.com",
    ] {
        let response = app(None)
            .oneshot(
                Request::builder()
                    .uri(format!("/api/auth/guest?redirectUrl={redirect_url}"))
                    .header(header::HOST, "chat.example.com")
                    .body(Body::empty())?,
            )
            .await?;

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{redirect_url}");
        assert_eq!(location(&response), "http://chat.example.com/", "{redirect_url}");
    }
    Ok(())
}

#[tokio::test]
async fn guest_bootstrap_with_garbage_host_still_redirects() -> Result<()> {
    let response = app(None)
        .oneshot(
            Request::builder()
                .uri("/api/auth/guest?redirectUrl=%2F%0Aevil")
                .header(header::HOST, "bad host")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/");
    Ok(())
}
