//! Route allow-list for the auth gate.
//!
//! Patterns use the `:name` segment syntax: `:id` matches exactly one
//! non-empty segment, `:path*` matches zero or more trailing segments and
//! `:path+` one or more. Patterns are compiled once and evaluated in order;
//! the first rule that matches wins.

use regex::Regex;

/// Static asset prefixes the catch-all rule never gates.
pub const STATIC_ASSET_PREFIXES: [&str; 5] = [
    "_next/static",
    "_next/image",
    "favicon.ico",
    "sitemap.xml",
    "robots.txt",
];

#[derive(Debug, Clone)]
enum Rule {
    Path(Regex),
    AllExcept(Vec<String>),
}

impl Rule {
    fn matches(&self, path: &str) -> bool {
        match self {
            Self::Path(re) => re.is_match(path),
            Self::AllExcept(excluded) => path
                .strip_prefix('/')
                .is_some_and(|rest| !excluded.iter().any(|prefix| rest.starts_with(prefix))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteMatcher {
    rules: Vec<Rule>,
}

impl RouteMatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `:name` style path pattern.
    ///
    /// # Errors
    /// Returns an error if the compiled expression is rejected by `regex`.
    pub fn path(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.rules.push(Rule::Path(compile(pattern)?));
        Ok(self)
    }

    /// Match every absolute path except those whose remainder after the
    /// leading `/` starts with one of `prefixes`.
    #[must_use]
    pub fn all_except(mut self, prefixes: &[&str]) -> Self {
        self.rules.push(Rule::AllExcept(
            prefixes.iter().map(ToString::to_string).collect(),
        ));
        self
    }

    /// Routes the chat application puts behind the gate.
    ///
    /// # Errors
    /// Returns an error if one of the built-in patterns fails to compile.
    pub fn chat_routes() -> Result<Self, regex::Error> {
        Ok(Self::new()
            .path("/")?
            .path("/chat/:id")?
            .path("/api/:path*")?
            .path("/login")?
            .path("/register")?
            .all_except(&STATIC_ASSET_PREFIXES))
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(path))
    }
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    let mut expr = String::from("^");

    for segment in pattern.split('/').filter(|s| !s.is_empty()) {
        match segment.strip_prefix(':') {
            Some(name) if name.ends_with('*') => expr.push_str("(?:/[^/]+)*"),
            Some(name) if name.ends_with('+') => expr.push_str("(?:/[^/]+)+"),
            Some(_) => expr.push_str("/[^/]+"),
            None => {
                expr.push('/');
                expr.push_str(&regex::escape(segment));
            }
        }
    }

    if expr == "^" {
        expr.push('/');
    } else {
        expr.push_str("/?");
    }
    expr.push('$');

    Regex::new(&expr)
}
