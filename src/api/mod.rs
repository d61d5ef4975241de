use crate::gate::{self, GateConfig, GateState, session::JwtSessions};
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::options,
};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;

pub(crate) mod handlers;
mod openapi;

pub use openapi::openapi;

const X_REQUEST_ID: &str = "x-request-id";

/// Everything the handlers and the gate share. Immutable after startup.
#[derive(Debug)]
pub struct AppState {
    gate: GateState,
    sessions: Arc<JwtSessions>,
    guest_email_domain: String,
}

impl AppState {
    #[must_use]
    pub fn new(
        config: GateConfig,
        sessions: JwtSessions,
        guest_email_domain: impl Into<String>,
    ) -> Self {
        let sessions = Arc::new(sessions);
        Self {
            gate: GateState::new(config, sessions.clone()),
            sessions,
            guest_email_domain: guest_email_domain.into(),
        }
    }

    #[must_use]
    pub fn gate(&self) -> &GateState {
        &self.gate
    }

    #[must_use]
    pub fn sessions(&self) -> &JwtSessions {
        &self.sessions
    }

    #[must_use]
    pub fn guest_email_domain(&self) -> &str {
        &self.guest_email_domain
    }
}

/// Build the full application: documented routes, the auth gate and the
/// HTTP layers.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    let (router, spec) = openapi::api_router().split_for_parts();
    let spec = Arc::new(spec);

    router
        .route("/api/health", options(handlers::health::health))
        .route(
            "/api/openapi.json",
            axum::routing::get(move || {
                let spec = spec.clone();
                async move { axum::Json(spec.as_ref().clone()) }
            }),
        )
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.gate().clone(),
            gate::gate,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(X_REQUEST_ID),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    X_REQUEST_ID,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

/// Start the server on `[::]:port`.
/// # Errors
/// Return error if the port cannot be bound or the server fails.
pub async fn new(port: u16, state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    serve(listener, state).await
}

/// Serve the application on an already bound listener until a shutdown
/// signal arrives.
/// # Errors
/// Return error if the server fails.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
