use std::env;

use auth::PasswordError;
use auth::PasswordHasher;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::domain::access::AuthorizationPolicy;

/// Application configuration for identity-service.
///
/// Loaded from configuration files with environment variable overrides.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub password: PasswordConfig,
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub authorization: AuthorizationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    /// Process-local; registrations do not survive a restart.
    Memory,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
}

/// PostgreSQL configuration, required when `store.backend = "postgres"`.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    #[serde(default = "DatabaseConfig::default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseConfig {
    fn default_max_connections() -> u32 {
        5
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: Self::default_max_connections(),
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "JwtConfig::default_ttl_seconds")]
    pub ttl_seconds: i64,
}

impl JwtConfig {
    /// HS256 keys shorter than the hash output weaken the MAC.
    pub const MIN_SECRET_BYTES: usize = 32;

    /// Upper bound on token lifetime: one year.
    pub const MAX_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

    fn default_ttl_seconds() -> i64 {
        60 * 60
    }

    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_seconds)
    }
}

// Keeps the signing secret out of logs.
impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

/// Optional Argon2id cost override. Unset fields fall back to the
/// library defaults (19 MiB, 2 passes, 1 lane).
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PasswordConfig {
    pub memory_kib: Option<u32>,
    pub iterations: Option<u32>,
    pub parallelism: Option<u32>,
}

impl PasswordConfig {
    pub fn hasher(&self) -> Result<PasswordHasher, PasswordError> {
        if self.memory_kib.is_none() && self.iterations.is_none() && self.parallelism.is_none() {
            return Ok(PasswordHasher::new());
        }

        PasswordHasher::with_params(
            self.memory_kib.unwrap_or(19 * 1024),
            self.iterations.unwrap_or(2),
            self.parallelism.unwrap_or(1),
        )
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoginConfig {
    /// Answer "unknown user" with the same message as "wrong password".
    #[serde(default)]
    pub unify_errors: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthorizationConfig {
    /// Route patterns reachable without a principal, in match order.
    #[serde(default = "AuthorizationConfig::default_public_paths")]
    pub public_paths: Vec<String>,
}

impl AuthorizationConfig {
    fn default_public_paths() -> Vec<String> {
        AuthorizationPolicy::DEFAULT_PUBLIC_PATHS
            .iter()
            .map(|path| path.to_string())
            .collect()
    }

    pub fn policy(&self) -> AuthorizationPolicy {
        AuthorizationPolicy::with_public_paths(self.public_paths.iter().cloned())
    }
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            public_paths: Self::default_public_paths(),
        }
    }
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (JWT__SECRET, SERVER__HTTP_PORT, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: JWT__SECRET=... overrides jwt.secret
            .add_source(Environment::default().separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Reject settings the service cannot run safely with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < JwtConfig::MIN_SECRET_BYTES {
            return Err(ConfigError::Message(format!(
                "jwt.secret must be at least {} bytes",
                JwtConfig::MIN_SECRET_BYTES
            )));
        }

        if self.jwt.ttl_seconds <= 0 || self.jwt.ttl_seconds > JwtConfig::MAX_TTL_SECONDS {
            return Err(ConfigError::Message(format!(
                "jwt.ttl_seconds must be between 1 and {}",
                JwtConfig::MAX_TTL_SECONDS
            )));
        }

        if self.store.backend == StoreBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Message(
                "database.url is required when store.backend = \"postgres\"".to_string(),
            ));
        }

        Ok(())
    }
}
