use crate::{
    api::{self, AppState},
    cli::telemetry,
    gate::{
        GateConfig,
        session::{GuestPattern, JwtSessions},
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub auth_url: Option<Url>,
    pub auth_secret: SecretString,
    pub guest_pattern: GuestPattern,
    pub guest_email_domain: String,
    pub session_ttl_seconds: i64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the session keys or gate cannot be built, or the server fails.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let sessions = JwtSessions::new(&args.auth_secret, args.session_ttl_seconds)
        .context("Failed to initialize session keys")?;

    match &args.auth_url {
        Some(url) => info!("Using external base URL {url}"),
        None => info!("No external base URL configured, deriving origin from requests"),
    }

    let config = GateConfig::new(args.auth_url, args.guest_pattern)
        .context("Failed to compile gate routes")?;

    let state = Arc::new(AppState::new(config, sessions, args.guest_email_domain));

    let result = api::new(args.port, state).await;

    telemetry::shutdown_tracer();

    result
}
