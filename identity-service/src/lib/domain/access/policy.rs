/// One entry of the route table.
///
/// `pattern` is either an exact path (`/actuator/health`) or a subtree
/// (`/api/auth/**`), which matches the prefix itself and anything below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pattern: String,
    requires_auth: bool,
}

impl RouteRule {
    pub fn public(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            requires_auth: false,
        }
    }

    pub fn authenticated(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            requires_auth: true,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    pub fn matches(&self, path: &str) -> bool {
        match self.pattern.strip_suffix("/**") {
            Some(prefix) => {
                path == prefix
                    || path
                        .strip_prefix(prefix)
                        .map_or(false, |rest| rest.starts_with('/'))
            }
            None => path == self.pattern,
        }
    }
}

/// Ordered route table deciding which paths need an authenticated principal.
///
/// First matching rule wins; a path no rule matches requires authentication.
/// Only "authenticated or not" is decided here: the principal's role is not
/// consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationPolicy {
    rules: Vec<RouteRule>,
}

impl AuthorizationPolicy {
    /// Public route patterns used when none are configured.
    pub const DEFAULT_PUBLIC_PATHS: [&'static str; 7] = [
        "/api/auth/**",
        "/api/test/**",
        "/api/moods/**",
        "/api/mood-logs/**",
        "/api/audio/**",
        "/api/ml/**",
        "/actuator/**",
    ];

    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// Policy where every listed pattern is public and everything else is
    /// protected.
    pub fn with_public_paths<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(patterns.into_iter().map(RouteRule::public).collect())
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn requires_authentication(&self, path: &str) -> bool {
        self.rules
            .iter()
            .find(|rule| rule.matches(path))
            .map_or(true, RouteRule::requires_auth)
    }
}

impl Default for AuthorizationPolicy {
    fn default() -> Self {
        Self::with_public_paths(Self::DEFAULT_PUBLIC_PATHS)
    }
}
