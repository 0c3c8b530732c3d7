use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::current_principal;
use super::handlers::health;
use super::handlers::login;
use super::handlers::register;
use super::middleware::authenticate;
use super::middleware::authorize;
use super::middleware::AuthenticationInterceptor;
use crate::domain::access::AuthorizationPolicy;
use crate::domain::credential::ports::CredentialStore;
use crate::domain::credential::service::CredentialService;

pub struct AppState<CS>
where
    CS: CredentialStore,
{
    pub credential_service: Arc<CredentialService<CS>>,
    pub interceptor: Arc<AuthenticationInterceptor<CS>>,
    pub policy: Arc<AuthorizationPolicy>,
    /// Report unknown usernames at login exactly like wrong passwords.
    pub unify_login_errors: bool,
}

// Manual impl: deriving would require `CS: Clone`.
impl<CS> Clone for AppState<CS>
where
    CS: CredentialStore,
{
    fn clone(&self) -> Self {
        Self {
            credential_service: Arc::clone(&self.credential_service),
            interceptor: Arc::clone(&self.interceptor),
            policy: Arc::clone(&self.policy),
            unify_login_errors: self.unify_login_errors,
        }
    }
}

pub fn create_router<CS: CredentialStore>(
    credential_service: Arc<CredentialService<CS>>,
    interceptor: Arc<AuthenticationInterceptor<CS>>,
    policy: Arc<AuthorizationPolicy>,
    unify_login_errors: bool,
) -> Router {
    let state = AppState {
        credential_service,
        interceptor,
        policy,
        unify_login_errors,
    };

    let auth_routes = Router::new()
        .route("/api/auth/register", post(register::<CS>))
        .route("/api/auth/login", post(login::<CS>));

    let principal_routes = Router::new().route("/api/me", get(current_principal));

    let actuator_routes = Router::new().route("/actuator/health", get(health));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    // Layers run bottom-up: the interceptor attaches the principal before the
    // policy inspects it.
    Router::new()
        .merge(auth_routes)
        .merge(principal_routes)
        .merge(actuator_routes)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.policy),
            authorize,
        ))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.interceptor),
            authenticate::<CS>,
        ))
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
