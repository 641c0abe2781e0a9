//! Credential storage for reviewer school accounts. See spec §4.4.
//!
//! `guard-vault` is a thin, TTL-cached layer over a pluggable
//! [`SecretStore`] — modeled on the upstream credential-store trait, but
//! specialized to the one document this bot ever caches: a reviewer's
//! [`TokenBundle`]. Documents are versioned so two concurrent writers (a
//! tick refreshing an expiring token, a reviewer re-authenticating via
//! `/start`) can detect and retry a lost race instead of silently clobbering
//! each other.

mod memory;

pub use memory::InMemorySecretStore;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use guard_clock::Clock;
use guard_protocol::ErrorKind;
use guard_protocol::Login;
use guard_protocol::TokenBundle;
use tokio::sync::RwLock;

/// A token document together with the version it was last written at.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedBundle {
    pub bundle: TokenBundle,
    pub version: u64,
}

/// The durable backend `TokenVault` caches in front of. Implementations
/// talk to whatever secret store an operator chooses (SQLite alongside
/// `guard-store`, an OS keychain, a cloud secret manager); this crate only
/// defines the contract and the caching policy above it.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, login: &Login) -> Result<Option<VersionedBundle>, ErrorKind>;

    /// Write `bundle`, succeeding only if the store's current version
    /// matches `expected_version` (`None` means "must not already exist").
    /// Returns the new version on success.
    async fn store(
        &self,
        login: &Login,
        bundle: TokenBundle,
        expected_version: Option<u64>,
    ) -> Result<u64, ErrorKind>;

    async fn delete(&self, login: &Login) -> Result<(), ErrorKind>;
}

struct CacheEntry {
    bundle: VersionedBundle,
    cached_at: DateTime<Utc>,
}

/// The vault reviewers' credentials are read and written through. Caches
/// reads for `ttl_minutes` so a tick's fan-out over many reviewers doesn't
/// round-trip the backing store once per reviewer per tick.
pub struct TokenVault {
    store: Arc<dyn SecretStore>,
    clock: Arc<dyn Clock>,
    ttl_minutes: i64,
    cache: RwLock<HashMap<Login, CacheEntry>>,
}

impl TokenVault {
    pub fn new(store: Arc<dyn SecretStore>, clock: Arc<dyn Clock>, ttl_minutes: i64) -> Self {
        Self {
            store,
            clock,
            ttl_minutes,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The cached bundle for `login`, falling through to the backing store
    /// on a cache miss or expiry. Returns `None` if the reviewer has never
    /// authenticated or has since logged out.
    pub async fn get(&self, login: &Login) -> Result<Option<TokenBundle>, ErrorKind> {
        let now = self.clock.now();
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(login) {
                if guard_clock::minutes_between(entry.cached_at, now) < self.ttl_minutes {
                    return Ok(Some(entry.bundle.bundle.clone()));
                }
            }
        }

        let fetched = self.store.get(login).await?;
        let mut cache = self.cache.write().await;
        match fetched {
            Some(versioned) => {
                let bundle = versioned.bundle.clone();
                cache.insert(
                    login.clone(),
                    CacheEntry {
                        bundle: versioned,
                        cached_at: now,
                    },
                );
                Ok(Some(bundle))
            }
            None => {
                cache.remove(login);
                Ok(None)
            }
        }
    }

    /// Persist a fresh bundle for `login` and refresh the cache entry.
    /// Re-authentication (`/start`) passes `expected_version: None`, which
    /// here means an unconditional write-through merge (spec §4.4): read
    /// whatever version is currently stored, if any, and write back at that
    /// version, so a returning reviewer overwrites rather than conflicting.
    /// A background token refresh should instead pass the version it read,
    /// to detect a concurrent re-authentication and back off instead of
    /// clobbering it.
    pub async fn store(
        &self,
        login: &Login,
        bundle: TokenBundle,
        expected_version: Option<u64>,
    ) -> Result<(), ErrorKind> {
        let version = match expected_version {
            Some(expected) => self.store.store(login, bundle.clone(), Some(expected)).await?,
            None => self.store_unconditional(login, bundle.clone()).await?,
        };
        let now = self.clock.now();
        let mut cache = self.cache.write().await;
        cache.insert(
            login.clone(),
            CacheEntry {
                bundle: VersionedBundle { bundle, version },
                cached_at: now,
            },
        );
        Ok(())
    }

    /// Read the current version for `login`, if any, and write `bundle`
    /// back at that version — an upsert in terms of the backing
    /// [`SecretStore`], which otherwise treats `expected_version: None` as
    /// "must not already exist".
    async fn store_unconditional(&self, login: &Login, bundle: TokenBundle) -> Result<u64, ErrorKind> {
        let current_version = self.store.get(login).await?.map(|versioned| versioned.version);
        self.store.store(login, bundle, current_version).await
    }

    /// Remove a reviewer's credential on `/logout`.
    pub async fn delete(&self, login: &Login) -> Result<(), ErrorKind> {
        self.store.delete(login).await?;
        self.cache.write().await.remove(login);
        Ok(())
    }

    /// Evict a cached entry without touching the backing store, used when a
    /// caller knows its cached copy is stale (e.g. after an adapter call
    /// returns `NotAuthenticated` for a token that looked fresh).
    pub async fn invalidate(&self, login: &Login) {
        self.cache.write().await.remove(login);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use guard_clock::FixedClock;
    use pretty_assertions::assert_eq;

    fn bundle(now: DateTime<Utc>) -> TokenBundle {
        TokenBundle::new("access", "refresh", now + Duration::hours(1))
    }

    #[tokio::test]
    async fn get_populates_cache_from_backing_store() {
        let store = Arc::new(InMemorySecretStore::new());
        let login = Login::new("jdoe");
        let now = Utc::now();
        store.store(&login, bundle(now), None).await.expect("seed");

        let clock = Arc::new(FixedClock(now));
        let vault = TokenVault::new(store.clone(), clock, 5);
        let fetched = vault.get(&login).await.expect("get").expect("present");
        assert_eq!(fetched.access_token, "access");
    }

    #[tokio::test]
    async fn get_returns_none_for_unknown_login() {
        let store = Arc::new(InMemorySecretStore::new());
        let clock = Arc::new(FixedClock(Utc::now()));
        let vault = TokenVault::new(store, clock, 5);
        assert_eq!(vault.get(&Login::new("nobody")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn store_rejects_mismatched_expected_version() {
        let store = Arc::new(InMemorySecretStore::new());
        let login = Login::new("jdoe");
        let now = Utc::now();
        store.store(&login, bundle(now), None).await.expect("seed");

        let err = store
            .store(&login, bundle(now), Some(999))
            .await
            .unwrap_err();
        assert!(matches!(err, ErrorKind::ExternalTransient(_)));
    }

    #[tokio::test]
    async fn delete_clears_both_cache_and_store() {
        let store = Arc::new(InMemorySecretStore::new());
        let login = Login::new("jdoe");
        let now = Utc::now();
        store.store(&login, bundle(now), None).await.expect("seed");

        let clock = Arc::new(FixedClock(now));
        let vault = TokenVault::new(store.clone(), clock, 5);
        vault.get(&login).await.expect("warm cache");
        vault.delete(&login).await.expect("delete");
        assert_eq!(vault.get(&login).await.unwrap(), None);
    }
}
