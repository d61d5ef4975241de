//! # Chatgate
//!
//! `chatgate` is the edge authentication gate placed in front of a hosted chat
//! application. Every request passes through the gate before it reaches a
//! handler or the upstream app.
//!
//! ## Gate decisions
//!
//! - `/ping` is answered with `pong` so load balancers never touch sessions.
//! - `/api/auth/*` and `/api/health*` pass through untouched.
//! - Requests without a valid session are redirected to the guest bootstrap at
//!   `/api/auth/guest`, carrying the original URL as `redirectUrl`.
//! - Signed-in regular users are redirected away from `/login` and `/register`.
//!
//! ## Origins behind proxies
//!
//! Redirects are absolute. The origin comes from the configured `AUTH_URL` when
//! present, otherwise from `x-forwarded-proto`/`x-forwarded-host`, then from the
//! request itself. The same inputs decide whether the session cookie carries the
//! `__Secure-` prefix.
//!
//! ## Sessions
//!
//! Sessions are HS256 JWTs signed with `AUTH_SECRET`. A session whose email
//! matches the guest pattern is treated as a guest.

pub mod api;
pub mod catalog;
pub mod cli;
pub mod gate;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
