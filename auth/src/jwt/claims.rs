use chrono::Duration;
use serde::Deserialize;
use serde::Serialize;

/// Identity a token can be issued for.
///
/// Implemented by each service's own user type so this crate stays free of
/// any persistence model.
pub trait TokenSubject {
    /// Opaque user identifier, embedded as the `userId` claim.
    fn user_id(&self) -> String;

    /// Username, embedded as both `sub` and `username`.
    fn username(&self) -> &str;
}

/// Claims carried by every access token.
///
/// `sub` and `username` hold the same value; `userId` is what the
/// request interceptor resolves the principal from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// Subject (username)
    pub sub: String,

    #[serde(rename = "userId")]
    pub user_id: String,

    pub username: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl TokenClaims {
    /// Build claims for `subject`, valid from `issued_at` for `ttl`.
    pub fn for_subject<S: TokenSubject + ?Sized>(subject: &S, issued_at: i64, ttl: Duration) -> Self {
        let username = subject.username().to_string();

        Self {
            sub: username.clone(),
            user_id: subject.user_id(),
            username,
            iat: issued_at,
            exp: issued_at.saturating_add(ttl.num_seconds()),
        }
    }

    /// A token is usable strictly before its `exp` instant.
    pub fn is_expired(&self, current_timestamp: i64) -> bool {
        self.exp <= current_timestamp
    }
}

/// Claims as they may appear in an arbitrary (possibly forged) token.
///
/// Used by the unverified extraction path, where every field is optional
/// and absence is reported by the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PartialClaims {
    #[serde(default)]
    pub sub: Option<String>,

    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,

    #[serde(default)]
    pub username: Option<String>,
}
