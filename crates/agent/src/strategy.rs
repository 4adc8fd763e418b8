//! Response strategies for in-scope requests.
//!
//! ### Navigations: network first
//! Serve the live response and copy it into the current store in the
//! background. If the network fails, serve the cached entry for the
//! request, else the offline page, else fail.
//!
//! ### Assets: stale-while-revalidate
//! Serve the cached entry at once and refresh it from the network in the
//! background. On a miss, wait for the network; there is nothing else to
//! fall back to.
//!
//! Nothing here checks that the offline page was actually precached; if it
//! was not, an offline navigation with no entry of its own simply fails.

use std::sync::Arc;

use obx_core::{CacheStore, Error, Network, Request, Response};
use url::Url;

use crate::BackgroundTasks;

/// Both strategies, bound to the current store.
#[derive(Clone)]
pub struct Strategies {
    store: CacheStore,
    offline_fallback: Url,
    network: Arc<dyn Network>,
    background: BackgroundTasks,
}

impl Strategies {
    pub fn new(store: CacheStore, offline_fallback: Url, network: Arc<dyn Network>, background: BackgroundTasks) -> Self {
        Self { store, offline_fallback, network, background }
    }

    /// Network-first with offline fallback.
    pub async fn network_first(&self, request: Request) -> Result<Response, Error> {
        let err = match self.network.fetch(&request).await {
            Ok(response) => {
                self.store_in_background(request, response.clone());
                return Ok(response);
            }
            Err(e) => e,
        };

        tracing::debug!(url = %request.url, error = %err, "navigation failed, trying cache");

        if let Some(cached) = self.store.get(&request).await? {
            tracing::debug!(url = %request.url, "serving cached navigation");
            return Ok(cached);
        }

        let fallback = Request::get(self.offline_fallback.clone());
        if let Some(offline) = self.store.get(&fallback).await? {
            tracing::debug!(url = %request.url, fallback = %self.offline_fallback, "serving offline page");
            return Ok(offline);
        }

        Err(Error::NoCachedResponse(format!("{}: {}", request.url, err)))
    }

    /// Cache-first with a background refresh on every request.
    pub async fn stale_while_revalidate(&self, request: Request) -> Result<Response, Error> {
        let cached = match self.store.get(&request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed, treating as miss");
                None
            }
        };

        let leg = tokio::spawn(refresh(self.network.clone(), self.store.clone(), request.clone()));

        match cached {
            Some(response) => {
                tracing::debug!(url = %request.url, "serving cached asset, refreshing in background");
                let url = request.url;
                self.background.spawn(async move {
                    match leg.await {
                        Ok(Ok(_)) => tracing::debug!(url = %url, "asset refreshed"),
                        Ok(Err(e)) => tracing::debug!(url = %url, error = %e, "asset refresh failed"),
                        Err(e) => tracing::warn!(url = %url, error = %e, "asset refresh task did not complete"),
                    }
                });
                Ok(response)
            }
            None => {
                tracing::debug!(url = %request.url, "asset not cached, waiting for network");
                leg.await.map_err(|e| Error::Network(e.to_string()))?
            }
        }
    }

    fn store_in_background(&self, request: Request, response: Response) {
        let store = self.store.clone();
        self.background.spawn(async move {
            if let Err(e) = store.put(&request, &response).await {
                tracing::warn!(url = %request.url, error = %e, "failed to store navigation response");
            }
        });
    }
}

/// Network leg of stale-while-revalidate: fetch, store, resolve.
async fn refresh(network: Arc<dyn Network>, store: CacheStore, request: Request) -> Result<Response, Error> {
    let response = network.fetch(&request).await?;
    if let Err(e) = store.put(&request, &response).await {
        tracing::warn!(url = %request.url, error = %e, "failed to store refreshed asset");
    }
    Ok(response)
}
