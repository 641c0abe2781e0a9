use std::collections::HashMap;

use async_trait::async_trait;
use guard_protocol::ErrorKind;
use guard_protocol::Login;
use guard_protocol::TokenBundle;
use tokio::sync::Mutex;

use crate::SecretStore;
use crate::VersionedBundle;

/// An in-memory [`SecretStore`], used by tests and by `guard-cli` when run
/// without a persistent vault backend configured.
#[derive(Default)]
pub struct InMemorySecretStore {
    documents: Mutex<HashMap<Login, VersionedBundle>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get(&self, login: &Login) -> Result<Option<VersionedBundle>, ErrorKind> {
        Ok(self.documents.lock().await.get(login).cloned())
    }

    async fn store(
        &self,
        login: &Login,
        bundle: TokenBundle,
        expected_version: Option<u64>,
    ) -> Result<u64, ErrorKind> {
        let mut documents = self.documents.lock().await;
        let current_version = documents.get(login).map(|doc| doc.version);
        if current_version != expected_version {
            return Err(ErrorKind::ExternalTransient(format!(
                "version conflict: expected {expected_version:?}, found {current_version:?}"
            )));
        }
        let next_version = current_version.unwrap_or(0) + 1;
        documents.insert(
            login.clone(),
            VersionedBundle {
                bundle,
                version: next_version,
            },
        );
        Ok(next_version)
    }

    async fn delete(&self, login: &Login) -> Result<(), ErrorKind> {
        self.documents.lock().await.remove(login);
        Ok(())
    }
}
