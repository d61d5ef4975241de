use crate::gate::session::{GuestPattern, MIN_SECRET_LEN};
use anyhow::{Context, anyhow, bail};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use ulid::Ulid;
use url::Url;

pub const ARG_AUTH_URL: &str = "auth-url";
pub const ARG_AUTH_SECRET: &str = "auth-secret";
pub const ARG_GUEST_EMAIL_PATTERN: &str = "guest-email-pattern";
pub const ARG_GUEST_EMAIL_DOMAIN: &str = "guest-email-domain";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";

#[derive(Debug)]
pub struct Options {
    pub auth_url: Option<Url>,
    pub auth_secret: SecretString,
    pub guest_pattern: GuestPattern,
    pub guest_email_domain: String,
    pub session_ttl_seconds: i64,
}

impl Options {
    /// Parse auth arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the base URL, secret or guest settings are invalid.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        // clap passes through empty env vars, treat them as unset
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let auth_url = get_non_empty(ARG_AUTH_URL)
            .map(|value| parse_base_url(&value))
            .transpose()?;

        let Some(secret) = get_non_empty(ARG_AUTH_SECRET) else {
            bail!("missing required argument: --{ARG_AUTH_SECRET}");
        };
        if secret.len() < MIN_SECRET_LEN {
            bail!("--{ARG_AUTH_SECRET} must be at least {MIN_SECRET_LEN} characters");
        }

        let pattern = get_non_empty(ARG_GUEST_EMAIL_PATTERN)
            .unwrap_or_else(|| GuestPattern::DEFAULT.to_string());
        let guest_pattern = GuestPattern::new(&pattern)
            .with_context(|| format!("invalid --{ARG_GUEST_EMAIL_PATTERN}: {pattern}"))?;

        let guest_email_domain = get_non_empty(ARG_GUEST_EMAIL_DOMAIN)
            .ok_or_else(|| anyhow!("missing required argument: --{ARG_GUEST_EMAIL_DOMAIN}"))?;

        // Guests minted by the bootstrap must be recognised as guests by the gate.
        let sample = format!("guest-{}@{guest_email_domain}", Ulid::nil());
        if !guest_pattern.is_guest(&sample) {
            bail!(
                "--{ARG_GUEST_EMAIL_PATTERN} '{}' does not match guest emails like '{sample}'",
                guest_pattern.as_str()
            );
        }

        let session_ttl_seconds = matches
            .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
            .copied()
            .unwrap_or(2_592_000);
        if session_ttl_seconds <= 0 {
            bail!("--{ARG_SESSION_TTL_SECONDS} must be positive");
        }

        Ok(Self {
            auth_url,
            auth_secret: SecretString::from(secret),
            guest_pattern,
            guest_email_domain,
            session_ttl_seconds,
        })
    }
}

fn parse_base_url(value: &str) -> anyhow::Result<Url> {
    let url = Url::parse(value).with_context(|| format!("invalid --{ARG_AUTH_URL}: {value}"))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => bail!("--{ARG_AUTH_URL} must be an absolute http(s) URL: {value}"),
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_AUTH_URL)
                .long(ARG_AUTH_URL)
                .help("External base URL used for redirects, example: https://chat.example.com")
                .long_help(
                    "External base URL used for redirects. Set it when the service runs behind a CDN or load balancer that rewrites Host or terminates TLS; it overrides the request-derived scheme and host.",
                )
                .env("AUTH_URL"),
        )
        .arg(
            Arg::new(ARG_AUTH_SECRET)
                .long(ARG_AUTH_SECRET)
                .help("Secret used to sign and verify session tokens")
                .env("AUTH_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_GUEST_EMAIL_PATTERN)
                .long(ARG_GUEST_EMAIL_PATTERN)
                .help("Regular expression identifying guest session emails")
                .env("CHATGATE_GUEST_EMAIL_PATTERN")
                .default_value(GuestPattern::DEFAULT),
        )
        .arg(
            Arg::new(ARG_GUEST_EMAIL_DOMAIN)
                .long(ARG_GUEST_EMAIL_DOMAIN)
                .help("Email domain used for guest identities")
                .env("CHATGATE_GUEST_EMAIL_DOMAIN")
                .default_value("guest.chatgate.local"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session cookie TTL in seconds")
                .env("CHATGATE_SESSION_TTL_SECONDS")
                .default_value("2592000")
                .value_parser(clap::value_parser!(i64)),
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn matches(args: &[&str]) -> ArgMatches {
        let command = with_args(Command::new("chatgate"));
        let mut argv = vec!["chatgate"];
        argv.extend_from_slice(args);
        command.get_matches_from(argv)
    }

    fn parse(args: &[&str]) -> anyhow::Result<Options> {
        temp_env::with_vars(
            [
                ("AUTH_URL", None::<&str>),
                ("AUTH_SECRET", None),
                ("CHATGATE_GUEST_EMAIL_PATTERN", None),
                ("CHATGATE_GUEST_EMAIL_DOMAIN", None),
                ("CHATGATE_SESSION_TTL_SECONDS", None),
            ],
            || Options::parse(&matches(args)),
        )
    }

    #[test]
    fn defaults() {
        let options = parse(&["--auth-secret", SECRET]).unwrap();
        assert!(options.auth_url.is_none());
        assert_eq!(options.guest_pattern.as_str(), GuestPattern::DEFAULT);
        assert_eq!(options.guest_email_domain, "guest.chatgate.local");
        assert_eq!(options.session_ttl_seconds, 2_592_000);
    }

    #[test]
    fn auth_url_is_parsed() {
        let options = parse(&[
            "--auth-secret",
            SECRET,
            "--auth-url",
            "https://app.example.com/",
        ])
        .unwrap();
        assert_eq!(
            options.auth_url.map(String::from).as_deref(),
            Some("https://app.example.com/")
        );
    }

    #[test]
    fn empty_auth_url_is_unset() {
        let options = parse(&["--auth-secret", SECRET, "--auth-url", "  "]).unwrap();
        assert!(options.auth_url.is_none());
    }

    #[test]
    fn invalid_auth_url_rejected() {
        for url in ["not a url", "ftp://files.example.com", "app.example.com"] {
            assert!(parse(&["--auth-secret", SECRET, "--auth-url", url]).is_err(), "{url}");
        }
    }

    #[test]
    fn short_secret_rejected() {
        let err = parse(&["--auth-secret", "short"]).unwrap_err();
        assert!(err.to_string().contains("at least 32 characters"));
    }

    #[test]
    fn guest_pattern_must_match_guest_domain() {
        let err = parse(&[
            "--auth-secret",
            SECRET,
            "--guest-email-pattern",
            r"@guests\.example\.com$",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("does not match guest emails"));

        let options = parse(&[
            "--auth-secret",
            SECRET,
            "--guest-email-pattern",
            r"@guests\.example\.com$",
            "--guest-email-domain",
            "guests.example.com",
        ])
        .unwrap();
        assert!(options.guest_pattern.is_guest("guest-1@guests.example.com"));
    }

    #[test]
    fn invalid_guest_pattern_rejected() {
        assert!(parse(&["--auth-secret", SECRET, "--guest-email-pattern", "("]).is_err());
    }

    #[test]
    fn non_positive_ttl_rejected() {
        assert!(parse(&["--auth-secret", SECRET, "--session-ttl-seconds", "0"]).is_err());
    }

    #[test]
    fn env_values() {
        temp_env::with_vars(
            [
                ("AUTH_URL", Some("https://chat.example.com")),
                ("AUTH_SECRET", Some(SECRET)),
                ("CHATGATE_SESSION_TTL_SECONDS", Some("60")),
            ],
            || {
                let options = Options::parse(&matches(&[])).unwrap();
                assert_eq!(
                    options.auth_url.as_ref().map(Url::as_str),
                    Some("https://chat.example.com/")
                );
                assert_eq!(options.session_ttl_seconds, 60);
            },
        );
    }
}
