//! The agent: lifecycle event dispatch over the three components.

use std::sync::Arc;

use obx_core::{AppConfig, CacheDb, Error, Network, Request};

use crate::{
    ActivateReport, BackgroundTasks, Classification, EventOutcome, FetchOutcome, GenerationConfig, GenerationManager,
    Host, InstallReport, LifecycleEvent, RequestClassifier, Strategies,
};

struct Inner {
    generations: GenerationManager,
    classifier: RequestClassifier,
    strategies: Strategies,
    network: Arc<dyn Network>,
    host: Arc<dyn Host>,
    background: BackgroundTasks,
}

/// Offline-caching agent for one generation.
///
/// Cheap to clone; clones share the same stores and background tasks.
#[derive(Clone)]
pub struct ServiceAgent {
    inner: Arc<Inner>,
}

impl ServiceAgent {
    pub fn new(
        db: CacheDb, config: GenerationConfig, classifier: RequestClassifier, network: Arc<dyn Network>,
        host: Arc<dyn Host>,
    ) -> Self {
        let generations = GenerationManager::new(db, config);
        let background = BackgroundTasks::new();
        let strategies = Strategies::new(
            generations.current_store(),
            generations.offline_fallback().clone(),
            network.clone(),
            background.clone(),
        );

        Self { inner: Arc::new(Inner { generations, classifier, strategies, network, host, background }) }
    }

    /// Build an agent from loaded application configuration.
    pub fn from_app_config(
        config: &AppConfig, db: CacheDb, network: Arc<dyn Network>, host: Arc<dyn Host>,
    ) -> Result<Self, Error> {
        let generation = GenerationConfig::from_app_config(config)?;
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        Ok(Self::new(db, generation, RequestClassifier::new(origin), network, host))
    }

    pub fn generations(&self) -> &GenerationManager {
        &self.inner.generations
    }

    pub fn classifier(&self) -> &RequestClassifier {
        &self.inner.classifier
    }

    pub fn background(&self) -> &BackgroundTasks {
        &self.inner.background
    }

    /// Dispatch one lifecycle event.
    pub async fn handle(&self, event: LifecycleEvent) -> Result<EventOutcome, Error> {
        match event {
            LifecycleEvent::Install => self.install().await.map(EventOutcome::Installed),
            LifecycleEvent::Activate => self.activate().await.map(EventOutcome::Activated),
            LifecycleEvent::Fetch(request) => Ok(EventOutcome::Fetch(self.fetch(request))),
        }
    }

    pub async fn install(&self) -> Result<InstallReport, Error> {
        let inner = &self.inner;
        inner.generations.install(&inner.network, inner.host.as_ref()).await
    }

    pub async fn activate(&self) -> Result<ActivateReport, Error> {
        self.inner.generations.activate(self.inner.host.as_ref()).await
    }

    /// Intercept a fetch: hand back a response future, or decline.
    pub fn fetch(&self, request: Request) -> FetchOutcome {
        let classification = self.inner.classifier.classify(&request);
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            mode = request.mode.as_str(),
            ?classification,
            "intercepted fetch"
        );

        let strategies = self.inner.strategies.clone();
        match classification {
            Classification::OutOfScope => FetchOutcome::NotHandled,
            Classification::Navigation => {
                FetchOutcome::Handled(Box::pin(async move { strategies.network_first(request).await }))
            }
            Classification::Asset => {
                FetchOutcome::Handled(Box::pin(async move { strategies.stale_while_revalidate(request).await }))
            }
        }
    }
}
