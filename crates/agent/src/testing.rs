//! Scripted network and host doubles for agent tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use obx_core::{AppConfig, Error, Network, Request, Response};
use tokio::sync::Notify;

use crate::Host;

pub const ORIGIN: &str = "http://localhost:8080/";

pub fn app_config(generation: &str) -> AppConfig {
    AppConfig { generation: generation.into(), origin: ORIGIN.into(), ..Default::default() }
}

#[derive(Default)]
struct NetworkState {
    routes: HashMap<String, Response>,
    failing: HashSet<String>,
    calls: Vec<String>,
}

/// Network double: serves scripted responses, 404 for anything else.
#[derive(Clone, Default)]
pub struct MockNetwork {
    state: Arc<Mutex<NetworkState>>,
    offline: Arc<AtomicBool>,
    gate: Arc<Mutex<Option<Arc<Notify>>>>,
}

impl MockNetwork {
    /// Serves every default precache path.
    pub fn serving_precache() -> Self {
        let network = Self::default();
        for url in app_config("v1").precache_urls().unwrap() {
            let body = format!("precached {}", url.path());
            network.route(url.as_str(), &body);
        }
        network
    }

    pub fn shared(&self) -> Arc<dyn Network> {
        Arc::new(self.clone())
    }

    pub fn route(&self, url: &str, body: &str) {
        let response = Response::new(url, 200, body.to_string()).with_header("content-type", "text/html");
        self.state.lock().unwrap().routes.insert(url.to_string(), response);
    }

    pub fn unroute(&self, url: &str) {
        self.state.lock().unwrap().routes.remove(url);
    }

    /// Make fetches of `url` fail at the transport level.
    pub fn fail(&self, url: &str) {
        self.state.lock().unwrap().failing.insert(url.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Hold every fetch until the returned notifier fires.
    pub fn hold(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(notify.clone());
        notify
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let url = request.url.to_string();
        self.state.lock().unwrap().calls.push(url.clone());

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{url}: offline")));
        }

        let state = self.state.lock().unwrap();
        if state.failing.contains(&url) {
            return Err(Error::Network(format!("{url}: connection reset")));
        }
        Ok(state
            .routes
            .get(&url)
            .cloned()
            .unwrap_or_else(|| Response::new(url.as_str(), 404, "not found")))
    }
}

/// Host double counting lifecycle calls.
#[derive(Default)]
pub struct MockHost {
    skip_waiting: AtomicUsize,
    claims: AtomicUsize,
    refuse_claim: AtomicBool,
}

impl MockHost {
    pub fn skip_waiting_calls(&self) -> usize {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn claim_calls(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }

    pub fn refuse_claim(&self) {
        self.refuse_claim.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Host for MockHost {
    async fn skip_waiting(&self) -> Result<(), Error> {
        self.skip_waiting.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        if self.refuse_claim.load(Ordering::SeqCst) {
            return Err(Error::Host("claim refused".into()));
        }
        self.claims.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
