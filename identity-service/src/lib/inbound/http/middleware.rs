use std::sync::Arc;

use auth::TokenError;
use auth::TokenService;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use thiserror::Error;

use crate::domain::access::AuthorizationPolicy;
use crate::domain::access::Principal;
use crate::domain::credential::models::UserId;
use crate::domain::credential::ports::CredentialStore;
use crate::inbound::http::handlers::ApiError;

const BEARER_PREFIX: &str = "Bearer ";

/// What the interceptor concluded about one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationOutcome {
    /// No `Authorization: Bearer` header.
    NoToken,
    /// A bearer token was presented but did not yield a principal. The request
    /// still proceeds, anonymously; protected routes turn it away later.
    Rejected(RejectionReason),
    Authenticated(Principal),
}

impl AuthenticationOutcome {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthenticationOutcome::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RejectionReason {
    #[error("{0}")]
    Token(#[from] TokenError),

    #[error("no user with id {0}")]
    UnknownUser(UserId),

    #[error("credential store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Resolves bearer tokens to principals.
///
/// Performs at most one store lookup per request and never fails the request
/// itself: every problem ends in [`AuthenticationOutcome::Rejected`].
pub struct AuthenticationInterceptor<CS>
where
    CS: CredentialStore,
{
    tokens: Arc<TokenService>,
    store: Arc<CS>,
}

impl<CS> AuthenticationInterceptor<CS>
where
    CS: CredentialStore,
{
    pub fn new(tokens: Arc<TokenService>, store: Arc<CS>) -> Self {
        Self { tokens, store }
    }

    pub async fn resolve(&self, headers: &HeaderMap) -> AuthenticationOutcome {
        let Some(token) = bearer_token(headers) else {
            return AuthenticationOutcome::NoToken;
        };

        // Nothing embedded in the token is trusted before this passes.
        if let Err(e) = self.tokens.verify(token) {
            return AuthenticationOutcome::Rejected(e.into());
        }

        let user_id = match self.tokens.extract_user_id(token).and_then(|id| {
            UserId::from_string(&id).map_err(|e| TokenError::Malformed(e.to_string()))
        }) {
            Ok(user_id) => user_id,
            Err(e) => return AuthenticationOutcome::Rejected(e.into()),
        };

        match self.store.find_by_id(&user_id).await {
            Ok(Some(user)) => AuthenticationOutcome::Authenticated(Principal::from(&user)),
            Ok(None) => AuthenticationOutcome::Rejected(RejectionReason::UnknownUser(user_id)),
            Err(e) => {
                tracing::error!(
                    user_id = %user_id,
                    error = %e,
                    "Credential lookup failed during authentication"
                );
                AuthenticationOutcome::Rejected(RejectionReason::StoreUnavailable(e.to_string()))
            }
        }
    }
}

/// Token carried by an `Authorization: Bearer <token>` header, if any.
///
/// Other schemes and non-visible-ASCII header values count as no token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
}

/// Middleware attaching the request's principal, when there is one.
///
/// Never rejects: access decisions belong to [`authorize`].
pub async fn authenticate<CS: CredentialStore>(
    State(interceptor): State<Arc<AuthenticationInterceptor<CS>>>,
    mut req: Request,
    next: Next,
) -> Response {
    match interceptor.resolve(req.headers()).await {
        AuthenticationOutcome::Authenticated(principal) => {
            tracing::debug!(
                user_id = %principal.user_id,
                username = %principal.username,
                authorities = ?principal.authorities,
                "Request authenticated"
            );
            req.extensions_mut().insert(principal);
        }
        AuthenticationOutcome::Rejected(reason) => {
            tracing::debug!(reason = %reason, "Bearer token rejected, continuing anonymously");
        }
        AuthenticationOutcome::NoToken => {}
    }

    next.run(req).await
}

/// Middleware turning away anonymous requests to protected routes.
pub async fn authorize(
    State(policy): State<Arc<AuthorizationPolicy>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if policy.requires_authentication(req.uri().path())
        && req.extensions().get::<Principal>().is_none()
    {
        tracing::warn!(
            method = %req.method(),
            path = %req.uri().path(),
            "Unauthenticated request to protected route"
        );
        return Err(ApiError::Unauthorized(
            "Authentication required".to_string(),
        ));
    }

    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use auth::FixedClock;
    use auth::TokenSubject;
    use axum::http::HeaderValue;
    use chrono::Duration;
    use chrono::Utc;

    use super::*;
    use crate::domain::credential::models::Role;
    use crate::domain::credential::models::UserRecord;
    use crate::domain::credential::models::Username;
    use crate::outbound::repositories::InMemoryCredentialStore;

    const SECRET: &[u8] = b"test_secret_key_at_least_32_bytes!";

    struct Fixture {
        clock: Arc<FixedClock>,
        tokens: Arc<TokenService>,
        interceptor: AuthenticationInterceptor<InMemoryCredentialStore>,
        user: UserRecord,
    }

    async fn fixture() -> Fixture {
        let clock = Arc::new(FixedClock::at(Utc::now().timestamp()));
        let tokens = Arc::new(
            TokenService::new(SECRET, Duration::hours(1)).with_clock(clock.clone()),
        );
        let store = Arc::new(InMemoryCredentialStore::new());

        let user = store
            .save(UserRecord::new(
                Username::new("alice".to_string()).unwrap(),
                "$argon2id$unused".to_string(),
            ))
            .await
            .unwrap();

        Fixture {
            clock,
            interceptor: AuthenticationInterceptor::new(Arc::clone(&tokens), store),
            tokens,
            user,
        }
    }

    fn headers(authorization: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(authorization).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("bearer abc")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_no_header_is_no_token() {
        let fixture = fixture().await;

        let outcome = fixture.interceptor.resolve(&HeaderMap::new()).await;
        assert_eq!(outcome, AuthenticationOutcome::NoToken);
    }

    #[tokio::test]
    async fn test_other_scheme_is_no_token() {
        let fixture = fixture().await;

        let outcome = fixture.interceptor.resolve(&headers("Basic dXNlcjpwYXNz")).await;
        assert_eq!(outcome, AuthenticationOutcome::NoToken);
    }

    #[tokio::test]
    async fn test_valid_token_authenticates() {
        let fixture = fixture().await;
        let token = fixture.tokens.generate(&fixture.user).unwrap();

        let outcome = fixture
            .interceptor
            .resolve(&headers(&format!("Bearer {}", token)))
            .await;

        let principal = outcome.principal().expect("Expected a principal");
        assert_eq!(principal.user_id, fixture.user.id);
        assert_eq!(principal.username, "alice");
        assert_eq!(principal.role, Role::User);
        assert_eq!(principal.authorities, vec!["ROLE_USER".to_string()]);
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let fixture = fixture().await;
        let token = fixture.tokens.generate(&fixture.user).unwrap();

        fixture.clock.advance(Duration::hours(1).num_seconds());

        let outcome = fixture
            .interceptor
            .resolve(&headers(&format!("Bearer {}", token)))
            .await;
        assert_eq!(
            outcome,
            AuthenticationOutcome::Rejected(RejectionReason::Token(TokenError::Expired))
        );
    }

    #[tokio::test]
    async fn test_forged_token_is_rejected() {
        let fixture = fixture().await;
        let forger = TokenService::new(b"not_the_server_secret_32_bytes!!", Duration::hours(1));
        let token = forger.generate(&fixture.user).unwrap();

        let outcome = fixture
            .interceptor
            .resolve(&headers(&format!("Bearer {}", token)))
            .await;
        assert_eq!(
            outcome,
            AuthenticationOutcome::Rejected(RejectionReason::Token(TokenError::InvalidSignature))
        );
    }

    #[tokio::test]
    async fn test_empty_bearer_is_rejected() {
        let fixture = fixture().await;

        let outcome = fixture.interceptor.resolve(&headers("Bearer ")).await;
        assert!(matches!(
            outcome,
            AuthenticationOutcome::Rejected(RejectionReason::Token(TokenError::Malformed(_)))
        ));
    }

    #[tokio::test]
    async fn test_unknown_user_is_rejected() {
        let fixture = fixture().await;

        struct Ghost(UserId);

        impl TokenSubject for Ghost {
            fn user_id(&self) -> String {
                self.0.to_string()
            }

            fn username(&self) -> &str {
                "ghost"
            }
        }

        let ghost = Ghost(UserId::new());
        let token = fixture.tokens.generate(&ghost).unwrap();

        let outcome = fixture
            .interceptor
            .resolve(&headers(&format!("Bearer {}", token)))
            .await;
        assert_eq!(
            outcome,
            AuthenticationOutcome::Rejected(RejectionReason::UnknownUser(ghost.0))
        );
    }

    #[tokio::test]
    async fn test_non_uuid_user_id_is_rejected() {
        let fixture = fixture().await;

        struct Legacy;

        impl TokenSubject for Legacy {
            fn user_id(&self) -> String {
                "667e9c2f1b2a4c0012345678".to_string()
            }

            fn username(&self) -> &str {
                "legacy"
            }
        }

        let token = fixture.tokens.generate(&Legacy).unwrap();

        let outcome = fixture
            .interceptor
            .resolve(&headers(&format!("Bearer {}", token)))
            .await;
        assert!(matches!(
            outcome,
            AuthenticationOutcome::Rejected(RejectionReason::Token(TokenError::Malformed(_)))
        ));
    }

    mod lookups {
        use async_trait::async_trait;
        use axum::body::Body;
        use axum::http::StatusCode;
        use mockall::mock;
        use tower::ServiceExt;

        use super::*;
        use crate::domain::credential::errors::CredentialError;
        use crate::domain::credential::service::CredentialService;
        use crate::inbound::http::router::create_router;

        mock! {
            pub TestCredentialStore {}

            #[async_trait]
            impl CredentialStore for TestCredentialStore {
                async fn exists_by_username(&self, username: &Username) -> Result<bool, CredentialError>;
                async fn find_by_username(&self, username: &Username) -> Result<Option<UserRecord>, CredentialError>;
                async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, CredentialError>;
                async fn save(&self, record: UserRecord) -> Result<UserRecord, CredentialError>;
            }
        }

        fn alice() -> UserRecord {
            UserRecord::new(
                Username::new("alice".to_string()).unwrap(),
                "$argon2id$unused".to_string(),
            )
        }

        fn tokens(clock: Arc<FixedClock>) -> Arc<TokenService> {
            Arc::new(TokenService::new(SECRET, Duration::hours(1)).with_clock(clock))
        }

        #[tokio::test]
        async fn test_valid_token_looks_up_store_once() {
            let user = alice();
            let tokens = tokens(Arc::new(FixedClock::at(Utc::now().timestamp())));
            let token = tokens.generate(&user).unwrap();

            let mut store = MockTestCredentialStore::new();
            let expected_id = user.id;
            let returned = user.clone();
            store
                .expect_find_by_id()
                .withf(move |id| *id == expected_id)
                .times(1)
                .returning(move |_| Ok(Some(returned.clone())));

            let interceptor = AuthenticationInterceptor::new(tokens, Arc::new(store));
            let outcome = interceptor
                .resolve(&headers(&format!("Bearer {}", token)))
                .await;

            assert_eq!(outcome.principal().map(|p| p.user_id), Some(user.id));
        }

        #[tokio::test]
        async fn test_unusable_tokens_never_reach_store() {
            let clock = Arc::new(FixedClock::at(Utc::now().timestamp()));
            let tokens = tokens(clock.clone());
            let expired = tokens.generate(&alice()).unwrap();
            clock.advance(Duration::hours(2).num_seconds());

            let forger = TokenService::new(b"not_the_server_secret_32_bytes!!", Duration::hours(1));
            let forged = forger.generate(&alice()).unwrap();

            let mut store = MockTestCredentialStore::new();
            store.expect_find_by_id().times(0);

            let interceptor = AuthenticationInterceptor::new(tokens, Arc::new(store));

            assert_eq!(
                interceptor.resolve(&HeaderMap::new()).await,
                AuthenticationOutcome::NoToken
            );
            for authorization in [
                format!("Bearer {}", expired),
                format!("Bearer {}", forged),
                "Bearer garbage".to_string(),
            ] {
                let outcome = interceptor.resolve(&headers(&authorization)).await;
                assert!(matches!(outcome, AuthenticationOutcome::Rejected(_)));
            }
        }

        #[tokio::test]
        async fn test_store_failure_leaves_request_anonymous() {
            let tokens = tokens(Arc::new(FixedClock::at(Utc::now().timestamp())));
            let token = tokens.generate(&alice()).unwrap();

            let mut store = MockTestCredentialStore::new();
            store
                .expect_find_by_id()
                .times(2)
                .returning(|_| Err(CredentialError::DatabaseError("connection refused".into())));
            let store = Arc::new(store);

            let interceptor = Arc::new(AuthenticationInterceptor::new(
                Arc::clone(&tokens),
                Arc::clone(&store),
            ));

            let outcome = interceptor
                .resolve(&headers(&format!("Bearer {}", token)))
                .await;
            assert!(matches!(
                outcome,
                AuthenticationOutcome::Rejected(RejectionReason::StoreUnavailable(_))
            ));

            let router = create_router(
                Arc::new(CredentialService::new(store, Arc::clone(&tokens))),
                interceptor,
                Arc::new(AuthorizationPolicy::default()),
                false,
            );
            let response = router
                .oneshot(
                    axum::http::Request::get("/api/me")
                        .header(AUTHORIZATION, format!("Bearer {}", token))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
