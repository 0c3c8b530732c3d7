use std::sync::Arc;

use async_trait::async_trait;
use auth::PasswordHasher;
use auth::TokenService;

use crate::domain::credential::errors::CredentialError;
use crate::domain::credential::models::UserRecord;
use crate::domain::credential::models::Username;
use crate::domain::credential::ports::CredentialServicePort;
use crate::domain::credential::ports::CredentialStore;

/// Registration and login over a credential store.
///
/// The only component that touches both the store and the token service.
pub struct CredentialService<CS>
where
    CS: CredentialStore,
{
    store: Arc<CS>,
    tokens: Arc<TokenService>,
    password_hasher: PasswordHasher,
}

impl<CS> CredentialService<CS>
where
    CS: CredentialStore,
{
    /// Create a credential service with injected dependencies.
    ///
    /// # Arguments
    /// * `store` - Credential persistence implementation
    /// * `tokens` - Token issuer shared with the request interceptor
    pub fn new(store: Arc<CS>, tokens: Arc<TokenService>) -> Self {
        Self {
            store,
            tokens,
            password_hasher: PasswordHasher::new(),
        }
    }

    /// Replace the default password hasher, e.g. to apply configured cost.
    pub fn with_password_hasher(mut self, password_hasher: PasswordHasher) -> Self {
        self.password_hasher = password_hasher;
        self
    }
}

#[async_trait]
impl<CS> CredentialServicePort for CredentialService<CS>
where
    CS: CredentialStore,
{
    async fn register(&self, username: Username, password: &str) -> Result<(), CredentialError> {
        if self.store.exists_by_username(&username).await? {
            return Err(CredentialError::DuplicateUsername(username.to_string()));
        }

        let password_hash = self.password_hasher.hash(password)?;

        // A concurrent registration can still win between the check above and
        // this insert; the store reports that as DuplicateUsername as well.
        let record = self
            .store
            .save(UserRecord::new(username, password_hash))
            .await?;

        tracing::info!(
            user_id = %record.id,
            username = %record.username,
            role = %record.role,
            "User registered"
        );

        Ok(())
    }

    async fn login(&self, username: &str, password: &str) -> Result<String, CredentialError> {
        // A name that fails validation can never have been registered.
        let username = Username::new(username.to_string())
            .map_err(|_| CredentialError::UserNotFound(username.to_string()))?;

        let user = self
            .store
            .find_by_username(&username)
            .await?
            .ok_or_else(|| CredentialError::UserNotFound(username.to_string()))?;

        if !self.password_hasher.verify(password, &user.password_hash)? {
            tracing::debug!(username = %user.username, "Password mismatch");
            return Err(CredentialError::InvalidCredentials);
        }

        let token = self.tokens.generate(&user)?;
        tracing::info!(user_id = %user.id, "Access token issued");

        Ok(token)
    }
}
