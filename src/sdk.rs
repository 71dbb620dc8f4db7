//! SDK entry point: wires configuration, transport, workers and runner.

use std::sync::Arc;

use tracing::info;

use crate::api::{AudienceApi, HttpAudienceApi};
use crate::audience::{Audience, AutoTagging, ContactUpdateWorker, EventWorker};
use crate::config::{RunnerConfig, SdkConfiguration};
use crate::error::Result;
use crate::runner::{JobStore, LocalJobRunner, NetworkMonitor, WorkerRegistry};
use crate::work::WorkProcessor;

/// A running SDK instance.
pub struct Sdk {
    configuration: SdkConfiguration,
    runner: LocalJobRunner,
    audience: Audience,
}

impl Sdk {
    pub fn builder(configuration: SdkConfiguration) -> SdkBuilder {
        SdkBuilder {
            configuration,
            runner_config: RunnerConfig::default(),
            store: None,
            network: None,
            api: None,
        }
    }

    pub fn audience(&self) -> &Audience {
        &self.audience
    }

    pub fn runner(&self) -> &LocalJobRunner {
        &self.runner
    }

    pub fn network(&self) -> &NetworkMonitor {
        self.runner.network()
    }

    pub fn configuration(&self) -> &SdkConfiguration {
        &self.configuration
    }

    pub async fn shutdown(&self) {
        self.runner.shutdown().await;
    }
}

pub struct SdkBuilder {
    configuration: SdkConfiguration,
    runner_config: RunnerConfig,
    store: Option<Arc<dyn JobStore>>,
    network: Option<NetworkMonitor>,
    api: Option<Arc<dyn AudienceApi>>,
}

impl SdkBuilder {
    pub fn runner_config(mut self, config: RunnerConfig) -> Self {
        self.runner_config = config;
        self
    }

    /// Persist jobs so they survive restarts.
    pub fn store(mut self, store: Arc<dyn JobStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn network(mut self, network: NetworkMonitor) -> Self {
        self.network = Some(network);
        self
    }

    /// Replace the HTTP transport.
    pub fn api(mut self, api: Arc<dyn AudienceApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub async fn start(self) -> Result<Sdk> {
        let configuration = self.configuration;
        let api: Arc<dyn AudienceApi> = match self.api {
            Some(api) => api,
            None => Arc::new(HttpAudienceApi::new(
                configuration.base_url.clone(),
                &configuration.sdk_key,
            )?),
        };

        let registry = WorkerRegistry::new()
            .register(
                ContactUpdateWorker::NAME,
                Arc::new(ContactUpdateWorker::new(api.clone())),
            )
            .register(EventWorker::NAME, Arc::new(EventWorker::new(api)));

        let runner = LocalJobRunner::start(
            self.runner_config,
            registry,
            self.network.unwrap_or_default(),
            self.store,
        )
        .await?;

        let processor = WorkProcessor::new(Arc::new(runner.clone()));
        let audience = Audience::new(processor, AutoTagging::from(&configuration));

        info!(
            shard = %configuration.shard,
            auto_tagging = configuration.auto_tagging,
            debug = configuration.debug_mode,
            "sdk started"
        );

        Ok(Sdk {
            configuration,
            runner,
            audience,
        })
    }
}
