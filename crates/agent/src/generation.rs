//! Cache generations: precache at install, purge at activate.
//!
//! One store exists per deployment generation, named `prefix + generation`.
//! Install fills the current store from the precache list in a single
//! transaction. Activate deletes every other store and claims clients.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use obx_core::{AppConfig, CacheDb, CacheStore, Error, Network, Request, Response};
use serde::Serialize;
use tokio::task::JoinSet;
use url::Url;

use crate::Host;

/// Deployment generation identifier, e.g. `v42`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Generation(String);

impl Generation {
    /// Validate and wrap a generation identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return Err(Error::InvalidInput(format!("invalid generation identifier {id:?}")));
        }
        Ok(Self(id))
    }

    /// Store name for this generation under `prefix`.
    pub fn store_name(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.0)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the generation manager needs, injected at construction.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub generation: Generation,
    pub prefix: String,
    /// Absolute URLs, in install order.
    pub precache: Vec<Url>,
    pub offline_fallback: Url,
}

impl GenerationConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let invalid = |e: obx_core::ConfigError| Error::InvalidInput(e.to_string());
        Ok(Self {
            generation: Generation::new(config.generation.clone())?,
            prefix: config.cache_prefix.clone(),
            precache: config.precache_urls().map_err(invalid)?,
            offline_fallback: config.offline_fallback_url().map_err(invalid)?,
        })
    }
}

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub store: String,
    /// Precached URLs, in precache order.
    pub cached: Vec<String>,
}

/// Result of an activation. Claiming happened even if cleanup stopped early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    pub store: String,
    pub deleted: Vec<String>,
    /// First deletion failure; remaining stale stores were left in place.
    pub cleanup_error: Option<String>,
}

/// The store enumeration and deletion activate relies on.
#[async_trait]
pub(crate) trait StoreRegistry: Send + Sync {
    async fn store_names(&self) -> Result<Vec<String>, Error>;
    async fn delete_store(&self, name: &str) -> Result<bool, Error>;
}

#[async_trait]
impl StoreRegistry for CacheDb {
    async fn store_names(&self) -> Result<Vec<String>, Error> {
        CacheDb::store_names(self).await
    }

    async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        CacheDb::delete_store(self, name).await
    }
}

/// Owns the identity and lifecycle of the current cache generation.
#[derive(Debug, Clone)]
pub struct GenerationManager {
    db: CacheDb,
    config: GenerationConfig,
    store_name: String,
}

impl GenerationManager {
    pub fn new(db: CacheDb, config: GenerationConfig) -> Self {
        let store_name = config.generation.store_name(&config.prefix);
        Self { db, config, store_name }
    }

    pub fn current_store_name(&self) -> &str {
        &self.store_name
    }

    /// Handle to the current store. Does not create it.
    pub fn current_store(&self) -> CacheStore {
        self.db.store(&self.store_name)
    }

    pub fn precache(&self) -> &[Url] {
        &self.config.precache
    }

    pub fn offline_fallback(&self) -> &Url {
        &self.config.offline_fallback
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Populate the current store with the precache list.
    ///
    /// Every asset is fetched concurrently and must come back 2xx. Entries
    /// are written in one transaction only after all fetches succeed, so a
    /// failed install leaves the store as it was. On success the host is
    /// told to skip waiting.
    pub async fn install(&self, network: &Arc<dyn Network>, host: &dyn Host) -> Result<InstallReport, Error> {
        tracing::info!(generation = %self.config.generation, store = %self.store_name, "installing");

        let store = self.db.open_store(&self.store_name).await?;
        let pairs = self.fetch_precache(network).await?;
        store.put_all(&pairs).await.map_err(|e| Error::InstallFailed(e.to_string()))?;

        host.skip_waiting().await?;

        let cached: Vec<String> = pairs.iter().map(|(req, _)| req.url.to_string()).collect();
        tracing::info!(store = %store.name(), assets = cached.len(), "install complete");

        Ok(InstallReport { store: self.store_name.clone(), cached })
    }

    async fn fetch_precache(&self, network: &Arc<dyn Network>) -> Result<Vec<(Request, Response)>, Error> {
        let mut join_set = JoinSet::new();

        for (index, url) in self.precache().iter().enumerate() {
            let network = Arc::clone(network);
            let request = Request::get(url.clone());
            join_set.spawn(async move {
                let result = network.fetch(&request).await;
                (index, request, result)
            });
        }

        let mut fetched = Vec::with_capacity(self.precache().len());
        while let Some(joined) = join_set.join_next().await {
            let (index, request, result) = joined.map_err(|e| Error::InstallFailed(e.to_string()))?;
            let response = match result {
                Ok(response) if response.ok() => response,
                Ok(response) => {
                    return Err(Error::InstallFailed(format!("{}: status {}", request.url, response.status)));
                }
                Err(e) => return Err(Error::InstallFailed(format!("{}: {}", request.url, e))),
            };
            fetched.push((index, request, response));
        }

        fetched.sort_by_key(|(index, _, _)| *index);
        Ok(fetched.into_iter().map(|(_, req, res)| (req, res)).collect())
    }

    /// Delete every store but the current one, then claim clients.
    ///
    /// The first deletion failure stops the cleanup pass and is reported in
    /// [`ActivateReport::cleanup_error`]; claiming still goes ahead. Only a
    /// failed claim fails the activation.
    pub async fn activate(&self, host: &dyn Host) -> Result<ActivateReport, Error> {
        if matches!(self.db.has_store(&self.store_name).await, Ok(false)) {
            tracing::warn!(store = %self.store_name, "activating a generation that was never installed");
        }
        self.activate_with(&self.db, host).await
    }

    async fn activate_with(&self, registry: &dyn StoreRegistry, host: &dyn Host) -> Result<ActivateReport, Error> {
        tracing::info!(generation = %self.config.generation, "activating");

        let mut report = ActivateReport { store: self.store_name.clone(), deleted: Vec::new(), cleanup_error: None };

        if let Err(e) = self.purge_stale(registry, &mut report.deleted).await {
            tracing::warn!(error = %e, deleted = report.deleted.len(), "stale store cleanup aborted");
            report.cleanup_error = Some(e.to_string());
        }

        host.claim_clients().await?;

        tracing::info!(store = %self.store_name, deleted = report.deleted.len(), "activation complete");
        Ok(report)
    }

    async fn purge_stale(&self, registry: &dyn StoreRegistry, deleted: &mut Vec<String>) -> Result<(), Error> {
        for name in registry.store_names().await? {
            if name == self.store_name {
                continue;
            }
            registry.delete_store(&name).await?;
            tracing::debug!(store = %name, "deleted stale store");
            deleted.push(name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockHost, MockNetwork, ORIGIN, app_config};

    async fn manager(db: &CacheDb, generation: &str) -> GenerationManager {
        let config = GenerationConfig::from_app_config(&app_config(generation)).unwrap();
        GenerationManager::new(db.clone(), config)
    }

    #[test]
    fn test_generation_validation() {
        assert!(Generation::new("v1").is_ok());
        assert!(Generation::new("").is_err());
        assert!(Generation::new("v 1").is_err());
        assert_eq!(Generation::new("v7").unwrap().store_name("obx-cache-"), "obx-cache-v7");
    }

    #[tokio::test]
    async fn test_install_precaches_every_asset() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = MockNetwork::serving_precache();
        let host = MockHost::default();
        let manager = manager(&db, "v1").await;

        let report = manager.install(&network.shared(), &host).await.unwrap();

        assert_eq!(report.store, "obx-cache-v1");
        assert_eq!(report.cached.len(), manager.precache().len());
        let store = manager.current_store();
        for url in manager.precache() {
            let hit = store.get(&Request::get(url.clone())).await.unwrap();
            assert!(hit.is_some(), "missing {url}");
        }
        assert_eq!(host.skip_waiting_calls(), 1);
    }

    #[tokio::test]
    async fn test_install_preserves_precache_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = MockNetwork::serving_precache();
        let manager = manager(&db, "v1").await;

        let report = manager.install(&network.shared(), &MockHost::default()).await.unwrap();

        let expected: Vec<String> = manager.precache().iter().map(Url::to_string).collect();
        assert_eq!(report.cached, expected);
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = MockNetwork::serving_precache();
        network.fail(&format!("{ORIGIN}logo.svg"));
        let host = MockHost::default();
        let manager = manager(&db, "v1").await;

        let result = manager.install(&network.shared(), &host).await;

        assert!(matches!(result, Err(Error::InstallFailed(_))));
        assert!(manager.current_store().is_empty().await.unwrap());
        assert_eq!(host.skip_waiting_calls(), 0);
    }

    #[tokio::test]
    async fn test_install_rejects_non_ok_status() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = MockNetwork::serving_precache();
        network.unroute(&format!("{ORIGIN}manifest.webmanifest"));
        let manager = manager(&db, "v1").await;

        let result = manager.install(&network.shared(), &MockHost::default()).await;

        let Err(Error::InstallFailed(msg)) = result else { panic!("expected install failure") };
        assert!(msg.contains("status 404"));
    }

    #[tokio::test]
    async fn test_activate_removes_other_generations() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = MockNetwork::serving_precache().shared();
        let host = MockHost::default();

        let old = manager(&db, "v1").await;
        old.install(&network, &host).await.unwrap();
        old.activate(&host).await.unwrap();

        let new = manager(&db, "v2").await;
        new.install(&network, &host).await.unwrap();
        assert_eq!(db.store_names().await.unwrap().len(), 2);

        let report = new.activate(&host).await.unwrap();

        assert_eq!(report.deleted, vec!["obx-cache-v1".to_string()]);
        assert!(report.cleanup_error.is_none());
        assert_eq!(db.store_names().await.unwrap(), vec!["obx-cache-v2".to_string()]);
        assert_eq!(host.claim_calls(), 2);
    }

    #[tokio::test]
    async fn test_activate_matches_names_exactly() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("obx-cache-v12").await.unwrap();
        db.open_store("unrelated").await.unwrap();
        db.open_store("obx-cache-v1").await.unwrap();

        let report = manager(&db, "v1").await.activate(&MockHost::default()).await.unwrap();

        assert_eq!(report.deleted.len(), 2);
        assert_eq!(db.store_names().await.unwrap(), vec!["obx-cache-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_activate_fails_when_claim_fails() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let host = MockHost::default();
        host.refuse_claim();

        let result = manager(&db, "v1").await.activate(&host).await;
        assert!(matches!(result, Err(Error::Host(_))));
    }

    /// Refuses to delete one named store.
    struct StuckStore {
        db: CacheDb,
        stuck: &'static str,
    }

    #[async_trait]
    impl StoreRegistry for StuckStore {
        async fn store_names(&self) -> Result<Vec<String>, Error> {
            self.db.store_names().await
        }

        async fn delete_store(&self, name: &str) -> Result<bool, Error> {
            if name == self.stuck {
                return Err(Error::Host(format!("store {name} is still in use")));
            }
            self.db.delete_store(name).await
        }
    }

    #[tokio::test]
    async fn test_cleanup_failure_stops_purge_but_still_claims() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for name in ["obx-cache-a", "obx-cache-b", "obx-cache-c", "obx-cache-v1"] {
            db.open_store(name).await.unwrap();
        }
        let registry = StuckStore { db: db.clone(), stuck: "obx-cache-b" };
        let host = MockHost::default();

        let report = manager(&db, "v1").await.activate_with(&registry, &host).await.unwrap();

        assert_eq!(report.deleted, vec!["obx-cache-a".to_string()]);
        assert!(report.cleanup_error.is_some());
        assert_eq!(host.claim_calls(), 1);
        assert_eq!(
            db.store_names().await.unwrap(),
            vec!["obx-cache-b".to_string(), "obx-cache-c".to_string(), "obx-cache-v1".to_string()]
        );
    }
}
