use std::sync::Arc;

use anyhow::Context;
use auth::PasswordHasher;
use auth::TokenService;
use axum::Router;
use identity_service::access::AuthorizationPolicy;
use identity_service::config::Config;
use identity_service::config::StoreBackend;
use identity_service::credential::ports::CredentialStore;
use identity_service::credential::service::CredentialService;
use identity_service::inbound::http::middleware::AuthenticationInterceptor;
use identity_service::inbound::http::router::create_router;
use identity_service::repositories::InMemoryCredentialStore;
use identity_service::repositories::PostgresCredentialStore;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "identity-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        store = ?config.store.backend,
        token_ttl_seconds = config.jwt.ttl_seconds,
        public_paths = config.authorization.public_paths.len(),
        unify_login_errors = config.login.unify_errors,
        "Configuration loaded"
    );

    let tokens = Arc::new(TokenService::new(
        config.jwt.secret.as_bytes(),
        config.jwt.ttl(),
    ));
    let password_hasher = config.password.hasher()?;
    let policy = Arc::new(config.authorization.policy());

    let http_application = match config.store.backend {
        StoreBackend::Postgres => {
            let database_url = config
                .database
                .url
                .as_deref()
                .context("database.url must be set for the postgres store")?;

            let pg_pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .connect(database_url)
                .await?;
            tracing::info!(
                max_connections = config.database.max_connections,
                database = "postgresql",
                "Database connection pool created"
            );

            sqlx::migrate!("./migrations").run(&pg_pool).await?;
            tracing::info!(database = "postgresql", "Database migrations completed");

            build_application(
                Arc::new(PostgresCredentialStore::new(pg_pool)),
                tokens,
                password_hasher,
                policy,
                config.login.unify_errors,
            )
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory credential store, registrations are lost on restart");

            build_application(
                Arc::new(InMemoryCredentialStore::new()),
                tokens,
                password_hasher,
                policy,
                config.login.unify_errors,
            )
        }
    };

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    if let Err(e) = axum::serve(http_listener, http_application).await {
        tracing::error!(error = %e, "Server error");
        return Err(e.into());
    }

    tracing::info!("Server exited successfully");

    Ok(())
}

fn build_application<CS: CredentialStore>(
    store: Arc<CS>,
    tokens: Arc<TokenService>,
    password_hasher: PasswordHasher,
    policy: Arc<AuthorizationPolicy>,
    unify_login_errors: bool,
) -> Router {
    let credential_service = Arc::new(
        CredentialService::new(Arc::clone(&store), Arc::clone(&tokens))
            .with_password_hasher(password_hasher),
    );
    let interceptor = Arc::new(AuthenticationInterceptor::new(tokens, store));

    create_router(credential_service, interceptor, policy, unify_login_errors)
}
