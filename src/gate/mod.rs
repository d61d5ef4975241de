//! # Auth gate
//!
//! Every inbound request passes through [`gate`] before reaching a handler.
//! The gate is stateless: it reads the request, optionally verifies the
//! session cookie and produces one of:
//!
//! - the fixed `/ping` liveness response,
//! - a pass-through to the inner router,
//! - a `307` to the guest bootstrap carrying the original URL, when there is
//!   no usable session,
//! - a `307` to `/` for signed-in regular users hitting `/login` or
//!   `/register`.
//!
//! Invalid, expired or missing session tokens are all treated as "no
//! session"; the gate never fails a request.

pub mod matcher;
pub mod origin;
pub mod session;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use self::{
    matcher::RouteMatcher,
    origin::{ExternalOrigin, RequestInfo, secure_cookie},
    session::{GuestPattern, SessionKind, SessionVerifier},
};

pub const PING_PREFIX: &str = "/ping";
pub const AUTH_API_PREFIX: &str = "/api/auth";
pub const HEALTH_API_PREFIX: &str = "/api/health";
pub const GUEST_BOOTSTRAP_PATH: &str = "/api/auth/guest";
pub const HOME_PATH: &str = "/";
pub const ACCOUNT_PAGES: [&str; 2] = ["/login", "/register"];

/// Immutable gate configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct GateConfig {
    base_url: Option<Url>,
    guest_pattern: GuestPattern,
    routes: RouteMatcher,
}

impl GateConfig {
    /// Build a configuration gating the chat application routes.
    ///
    /// # Errors
    /// Returns an error if the built-in route patterns fail to compile.
    pub fn new(base_url: Option<Url>, guest_pattern: GuestPattern) -> Result<Self, regex::Error> {
        Ok(Self {
            base_url,
            guest_pattern,
            routes: RouteMatcher::chat_routes()?,
        })
    }

    #[must_use]
    pub fn with_routes(mut self, routes: RouteMatcher) -> Self {
        self.routes = routes;
        self
    }

    #[must_use]
    pub fn secure_cookie(&self, request: &RequestInfo) -> bool {
        secure_cookie(
            self.base_url.as_ref(),
            request.forwarded_proto.as_deref(),
            request.scheme.as_deref(),
        )
    }

    #[must_use]
    pub fn origin(&self, request: &RequestInfo) -> ExternalOrigin {
        ExternalOrigin::resolve(self.base_url.as_ref(), request)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Pong,
    Pass,
    Redirect(String),
}

/// Decide what to do with a request.
#[must_use]
pub fn decide(
    config: &GateConfig,
    verifier: &dyn SessionVerifier,
    request: &RequestInfo,
    headers: &HeaderMap,
) -> Decision {
    let path = request.path.as_str();

    if !config.routes.matches(path) {
        return Decision::Pass;
    }

    if path.starts_with(PING_PREFIX) {
        return Decision::Pong;
    }

    if path.starts_with(AUTH_API_PREFIX) || path.starts_with(HEALTH_API_PREFIX) {
        return Decision::Pass;
    }

    let secure = config.secure_cookie(request);
    let origin = config.origin(request);

    let Some(claims) = verifier.verify(headers, secure) else {
        let external_url = origin.url_for(&request.path_and_query());
        let target = format!(
            "{GUEST_BOOTSTRAP_PATH}?redirectUrl={}",
            urlencoding::encode(&external_url)
        );
        debug!(secure, "No session, redirecting {external_url} to guest bootstrap");
        return Decision::Redirect(origin.location(&target));
    };

    let kind = config.guest_pattern.classify(&claims);
    if kind == SessionKind::Regular && ACCOUNT_PAGES.contains(&path) {
        debug!(sub = %claims.sub, "Signed-in user on {path}, redirecting home");
        return Decision::Redirect(origin.location(HOME_PATH));
    }

    Decision::Pass
}

/// Shared state for the gate middleware.
#[derive(Clone)]
pub struct GateState {
    config: Arc<GateConfig>,
    verifier: Arc<dyn SessionVerifier>,
}

impl GateState {
    #[must_use]
    pub fn new(config: GateConfig, verifier: Arc<dyn SessionVerifier>) -> Self {
        Self {
            config: Arc::new(config),
            verifier,
        }
    }

    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    #[must_use]
    pub fn verifier(&self) -> &dyn SessionVerifier {
        self.verifier.as_ref()
    }
}

impl std::fmt::Debug for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// axum middleware applying [`decide`] to every request.
pub async fn gate(State(state): State<GateState>, request: Request, next: Next) -> Response {
    let info = RequestInfo::from_parts(request.uri(), request.headers());

    match decide(state.config(), state.verifier(), &info, request.headers()) {
        Decision::Pong => (StatusCode::OK, "pong").into_response(),
        Decision::Pass => next.run(request).await,
        Decision::Redirect(location) => Redirect::temporary(&location).into_response(),
    }
}
