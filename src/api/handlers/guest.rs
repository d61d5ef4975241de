//! Guest session bootstrap.
//!
//! Browsers land here from the auth gate when they have no usable session.
//! A guest identity is minted, stored in the session cookie, and the browser
//! is sent back to where it was going. Only same-origin targets are honoured
//! so the endpoint cannot be used as an open redirect.

use crate::{
    api::AppState,
    gate::{
        HOME_PATH,
        origin::{ExternalOrigin, RequestInfo},
        session::session_cookie,
    },
};
use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode, Uri, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use ulid::Ulid;
use url::Url;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct GuestParams {
    /// Where to send the browser once the guest session is set. Defaults to `/`.
    redirect_url: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/auth/guest",
    params(GuestParams),
    responses(
        (status = 307, description = "Guest session issued, or an existing session sent home"),
        (status = 500, description = "Guest session could not be issued")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn guest(
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<GuestParams>,
    state: Extension<Arc<AppState>>,
) -> Response {
    let info = RequestInfo::from_parts(&uri, &headers);
    let config = state.gate().config();
    let secure = config.secure_cookie(&info);
    let origin = config.origin(&info);

    if state.gate().verifier().verify(&headers, secure).is_some() {
        return Redirect::temporary(&origin.location(HOME_PATH)).into_response();
    }

    let target = redirect_target(&origin, params.redirect_url.as_deref());

    let id = Ulid::new().to_string();
    let email = format!("guest-{id}@{}", state.guest_email_domain());
    let token = match state.sessions().issue(&id, Some(&email)) {
        Ok((token, _)) => token,
        Err(err) => {
            error!("Failed to issue guest session: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let cookie = match session_cookie(&token, secure, state.sessions().ttl_seconds()) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    info!(sub = %id, secure, "Issued guest session");

    let mut response = Redirect::temporary(&target).into_response();
    response.headers_mut().insert(SET_COOKIE, cookie);
    response
}

/// Absolute URL to send the browser to after bootstrap.
///
/// Accepts absolute paths (`/chat/1`) and absolute URLs that resolve to the
/// same origin; anything else, including input carrying control characters,
/// falls back to the home page.
fn redirect_target(origin: &ExternalOrigin, requested: Option<&str>) -> String {
    let Some(requested) = requested.map(str::trim).filter(|r| !r.is_empty()) else {
        return origin.location(HOME_PATH);
    };

    // URL parsing drops tab and newline, which can turn `/\t/host` into `//host`.
    if requested.chars().any(|c| c.is_ascii_control()) {
        warn!("Ignoring redirectUrl with control characters: {requested:?}");
        return origin.location(HOME_PATH);
    }

    let candidate = if requested.starts_with('/') {
        origin.join(requested)
    } else {
        Url::parse(requested).ok()
    };

    match candidate {
        Some(url) if origin.is_same_origin(&url) => url.into(),
        _ => {
            warn!("Ignoring redirectUrl outside this origin: {requested}");
            origin.location(HOME_PATH)
        }
    }
}
