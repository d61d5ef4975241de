//! Map validated CLI arguments to an action.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_PORT, auth};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        auth_url: auth_opts.auth_url,
        auth_secret: auth_opts.auth_secret,
        guest_pattern: auth_opts.guest_pattern,
        guest_email_domain: auth_opts.guest_email_domain,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
    }))
}
