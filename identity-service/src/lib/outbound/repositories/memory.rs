use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::credential::errors::CredentialError;
use crate::domain::credential::models::UserId;
use crate::domain::credential::models::UserRecord;
use crate::domain::credential::models::Username;
use crate::domain::credential::ports::CredentialStore;

/// Process-local credential store for development and tests.
///
/// The uniqueness check and the insert in `save` happen under one write lock.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<UserId, UserRecord>,
    ids_by_username: HashMap<Username, UserId>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub async fn len(&self) -> usize {
        self.inner.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn exists_by_username(&self, username: &Username) -> Result<bool, CredentialError> {
        Ok(self.inner.read().await.ids_by_username.contains_key(username))
    }

    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<UserRecord>, CredentialError> {
        let inner = self.inner.read().await;

        Ok(inner
            .ids_by_username
            .get(username)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserRecord>, CredentialError> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }

    async fn save(&self, record: UserRecord) -> Result<UserRecord, CredentialError> {
        let mut inner = self.inner.write().await;

        if inner.ids_by_username.contains_key(&record.username) {
            return Err(CredentialError::DuplicateUsername(
                record.username.as_str().to_string(),
            ));
        }

        inner
            .ids_by_username
            .insert(record.username.clone(), record.id);
        inner.users.insert(record.id, record.clone());

        Ok(record)
    }
}
