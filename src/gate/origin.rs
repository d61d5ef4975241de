//! Request origin helpers.
//!
//! A CDN or load balancer in front of the service may terminate TLS and
//! forward plain HTTP, so neither the request scheme nor the `Host` header is
//! trustworthy on its own. The configured base URL wins when present.

use axum::http::{HeaderMap, Uri, header::HOST};
use url::Url;

pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// The parts of an inbound request the gate looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    pub path: String,
    pub query: Option<String>,
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub forwarded_proto: Option<String>,
    pub forwarded_host: Option<String>,
}

impl RequestInfo {
    #[must_use]
    pub fn from_parts(uri: &Uri, headers: &HeaderMap) -> Self {
        Self {
            path: uri.path().to_string(),
            query: uri.query().filter(|q| !q.is_empty()).map(str::to_string),
            scheme: uri.scheme_str().map(str::to_ascii_lowercase),
            host: header_value(headers, HOST.as_str())
                .or_else(|| uri.authority().map(|a| a.as_str().to_string())),
            forwarded_proto: header_value(headers, X_FORWARDED_PROTO)
                .map(|proto| proto.to_ascii_lowercase()),
            forwarded_host: header_value(headers, X_FORWARDED_HOST),
        }
    }

    /// Path followed by `?query` when a query is present.
    #[must_use]
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{query}", self.path),
            None => self.path.clone(),
        }
    }
}

// Forwarded headers may carry a comma separated chain; the first hop is the client-facing one.
fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Whether session cookies are issued and looked up in `Secure` mode.
///
/// Any single signal is enough: the configured base URL uses `https`, the
/// `x-forwarded-proto` header says `https`, or the request itself arrived
/// over `https`.
#[must_use]
pub fn secure_cookie(
    base_url: Option<&Url>,
    forwarded_proto: Option<&str>,
    request_scheme: Option<&str>,
) -> bool {
    base_url.is_some_and(|url| url.scheme() == "https")
        || forwarded_proto == Some("https")
        || request_scheme == Some("https")
}

/// Client-facing `scheme://host[/base-path]`, without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalOrigin(String);

impl ExternalOrigin {
    /// Resolve the origin from the configured base URL, falling back to the
    /// forwarded headers and then to the request itself.
    #[must_use]
    pub fn resolve(base_url: Option<&Url>, request: &RequestInfo) -> Self {
        if let Some(url) = base_url {
            return Self(url.as_str().trim_end_matches('/').to_string());
        }

        let proto = request
            .forwarded_proto
            .as_deref()
            .or(request.scheme.as_deref())
            .unwrap_or("http");
        let host = request
            .forwarded_host
            .as_deref()
            .or(request.host.as_deref())
            .unwrap_or("localhost");

        Self(format!("{proto}://{host}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Absolute URL of `path_and_query` as the client would have typed it.
    #[must_use]
    pub fn url_for(&self, path_and_query: &str) -> String {
        format!("{}{path_and_query}", self.0)
    }

    /// Resolve an absolute-path reference against the origin, for use as a
    /// `Location` header. Falls back to the bare reference when the origin
    /// does not parse (e.g. a garbage `Host` header).
    #[must_use]
    pub fn location(&self, reference: &str) -> String {
        self.join(reference)
            .map_or_else(|| reference.to_string(), String::from)
    }

    /// Resolve `reference` against the origin. `None` when either side does
    /// not parse.
    #[must_use]
    pub fn join(&self, reference: &str) -> Option<Url> {
        Url::parse(&self.0).ok()?.join(reference).ok()
    }

    /// True when `candidate` shares scheme, host and port with this origin.
    #[must_use]
    pub fn is_same_origin(&self, candidate: &Url) -> bool {
        Url::parse(&self.0).is_ok_and(|base| base.origin() == candidate.origin())
    }
}
