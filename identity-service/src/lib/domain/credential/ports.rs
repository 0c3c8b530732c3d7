use async_trait::async_trait;

use crate::domain::credential::errors::CredentialError;
use crate::domain::credential::models::UserId;
use crate::domain::credential::models::UserRecord;
use crate::domain::credential::models::Username;

/// Port for registration and login.
#[async_trait]
pub trait CredentialServicePort: Send + Sync + 'static {
    /// Register a new user with role `USER`. No token is issued.
    ///
    /// # Errors
    /// * `DuplicateUsername` - Username is already taken, including when a
    ///   concurrent registration wins the race inside the store
    /// * `Password` - Hashing failed
    /// * `DatabaseError` - Store operation failed
    async fn register(&self, username: Username, password: &str) -> Result<(), CredentialError>;

    /// Verify credentials and issue an access token.
    ///
    /// # Returns
    /// Signed token string
    ///
    /// # Errors
    /// * `UserNotFound` - No user with this username
    /// * `InvalidCredentials` - Password does not match
    /// * `Token` - Token could not be issued
    /// * `DatabaseError` - Store operation failed
    async fn login(&self, username: &str, password: &str) -> Result<String, CredentialError>;
}

/// Persistence of user credentials.
///
/// Implementations must enforce username uniqueness atomically in `save`
/// (a unique constraint or equivalent) and report a violation as
/// `DuplicateUsername`.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Whether a user with this username exists.
    ///
    /// # Errors
    /// * `DatabaseError` - Store operation failed
    async fn exists_by_username(&self, username: &Username) -> Result<bool, CredentialError>;

    /// Retrieve user by username.
    ///
    /// # Returns
    /// Optional record (None if not found)
    ///
    /// # Errors
    /// * `DatabaseError` - Store operation failed
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<UserRecord>, CredentialError>;

    /// Retrieve user by identifier.
    ///
    /// # Returns
    /// Optional record (None if not found)
    ///
    /// # Errors
    /// * `DatabaseError` - Store operation failed
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, CredentialError>;

    /// Persist a new user.
    ///
    /// # Returns
    /// The stored record
    ///
    /// # Errors
    /// * `DuplicateUsername` - Username is already taken
    /// * `DatabaseError` - Store operation failed
    async fn save(&self, record: UserRecord) -> Result<UserRecord, CredentialError>;
}
