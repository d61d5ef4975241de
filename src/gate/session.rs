//! Session tokens carried in a signed cookie.
//!
//! Tokens are HS256 JWTs. The cookie name depends on the secure-cookie mode:
//! secure sessions use the `__Secure-` prefix so browsers refuse to set them
//! over plain HTTP.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::debug;

pub const SESSION_COOKIE: &str = "chatgate.session-token";
pub const SECURE_SESSION_COOKIE: &str = "__Secure-chatgate.session-token";
pub const MIN_SECRET_LEN: usize = 32;

#[must_use]
pub const fn cookie_name(secure: bool) -> &'static str {
    if secure {
        SECURE_SESSION_COOKIE
    } else {
        SESSION_COOKIE
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionKind {
    /// Identity provisioned automatically by the guest bootstrap.
    Guest,
    /// Identity created through explicit registration.
    Regular,
}

/// Email pattern identifying guest identities.
#[derive(Debug, Clone)]
pub struct GuestPattern(Regex);

impl GuestPattern {
    pub const DEFAULT: &'static str = r"^guest-[A-Za-z0-9]+(@\S+)?$";

    /// # Errors
    /// Returns an error if `pattern` is not a valid regular expression.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self(Regex::new(pattern)?))
    }

    #[must_use]
    pub fn is_guest(&self, email: &str) -> bool {
        self.0.is_match(email)
    }

    #[must_use]
    pub fn classify(&self, claims: &Claims) -> SessionKind {
        if self.is_guest(claims.email.as_deref().unwrap_or_default()) {
            SessionKind::Guest
        } else {
            SessionKind::Regular
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session secret must be at least {MIN_SECRET_LEN} characters")]
    WeakSecret,
    #[error("failed to encode session token")]
    Encode(#[source] jsonwebtoken::errors::Error),
    #[error("invalid session token")]
    Decode(#[source] jsonwebtoken::errors::Error),
    #[error("system clock is before the unix epoch")]
    Clock,
}

/// Resolve request headers into session claims.
///
/// Implementations hold their own key material; `None` means there is no
/// usable session, whatever the reason.
pub trait SessionVerifier: Send + Sync {
    fn verify(&self, headers: &HeaderMap, secure_cookie: bool) -> Option<Claims>;
}

/// Issues and verifies HS256 session tokens.
pub struct JwtSessions {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
}

impl JwtSessions {
    /// # Errors
    /// Returns [`SessionError::WeakSecret`] if the secret is shorter than
    /// [`MIN_SECRET_LEN`].
    pub fn new(secret: &SecretString, ttl_seconds: i64) -> Result<Self, SessionError> {
        let secret = secret.expose_secret();
        if secret.len() < MIN_SECRET_LEN {
            return Err(SessionError::WeakSecret);
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl_seconds,
        })
    }

    #[must_use]
    pub const fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Sign a new session for `sub`.
    ///
    /// # Errors
    /// Returns an error if the clock is unusable or signing fails.
    pub fn issue(&self, sub: &str, email: Option<&str>) -> Result<(String, Claims), SessionError> {
        let now = unix_now()?;
        let claims = Claims {
            sub: sub.to_string(),
            email: email.map(str::to_string),
            iat: now,
            exp: now.saturating_add(self.ttl_seconds),
        };
        let token = self.sign(&claims)?;
        Ok((token, claims))
    }

    /// Sign arbitrary claims.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn sign(&self, claims: &Claims) -> Result<String, SessionError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(SessionError::Encode)
    }

    /// Verify a raw token and return its claims.
    ///
    /// # Errors
    /// Returns an error on bad signature, malformed token or expiry.
    pub fn decode(&self, token: &str) -> Result<Claims, SessionError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(SessionError::Decode)
    }
}

impl SessionVerifier for JwtSessions {
    fn verify(&self, headers: &HeaderMap, secure_cookie: bool) -> Option<Claims> {
        let token = extract_cookie(headers, cookie_name(secure_cookie))?;
        match self.decode(&token) {
            Ok(claims) => Some(claims),
            Err(err) => {
                debug!("Ignoring session cookie: {err}");
                None
            }
        }
    }
}

impl std::fmt::Debug for JwtSessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSessions")
            .field("keys", &"***")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

/// Build an `HttpOnly` session cookie.
///
/// # Errors
/// Returns an error if the token contains bytes not allowed in a header.
pub fn session_cookie(
    token: &str,
    secure: bool,
    ttl_seconds: i64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let name = cookie_name(secure);
    let mut cookie = format!("{name}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| val.trim().to_string())
        })
        .find(|val| !val.is_empty())
}

fn unix_now() -> Result<i64, SessionError> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| SessionError::Clock)?
        .as_secs();
    i64::try_from(secs).map_err(|_| SessionError::Clock)
}
