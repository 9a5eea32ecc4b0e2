// src/config.rs

//! Configuration loading utilities.
//!
//! This module wires a [`Config`] into the runtime pieces: the adapter
//! registry, the HTTP fetcher and per-site pipelines.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::error::Result;
use crate::models::Config;
use crate::services::{AdapterRegistry, CatalogPipeline};
use crate::utils::http::{Fetcher, HttpFetcher};

/// Load and validate configuration from a TOML file.
///
/// Falls back to defaults if the file cannot be loaded.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_or_default(path);
    config.validate()?;
    Ok(config)
}

/// Adapter directory: an explicit override wins over the configured one.
pub fn adapter_dir(config: &Config, overridden: Option<&Path>) -> PathBuf {
    overridden
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.adapters.dir.clone())
}

/// Load every adapter definition from `dir`.
pub fn load_registry(dir: &Path) -> Result<AdapterRegistry> {
    let registry = AdapterRegistry::from_dir(dir)?;
    log::info!(
        "Loaded {} adapters from {}",
        registry.len(),
        dir.display()
    );
    Ok(registry)
}

/// Shared runtime state for building pipelines.
///
/// Every pipeline of a site shares one request throttle, so concurrent
/// invocations never exceed `per_site_concurrency` requests to that site.
pub struct Engine {
    pub config: Config,
    pub registry: AdapterRegistry,
    fetcher: Arc<dyn Fetcher>,
    throttles: HashMap<String, Arc<Semaphore>>,
}

impl Engine {
    pub fn new(config: Config, registry: AdapterRegistry) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config.crawler)?);
        Ok(Self::with_fetcher(config, registry, fetcher))
    }

    pub fn with_fetcher(config: Config, registry: AdapterRegistry, fetcher: Arc<dyn Fetcher>) -> Self {
        let permits = config.crawler.per_site_concurrency.max(1);
        let throttles = registry
            .sites()
            .into_iter()
            .map(|site| (site.to_string(), Arc::new(Semaphore::new(permits))))
            .collect();
        Self {
            config,
            registry,
            fetcher,
            throttles,
        }
    }

    /// Pipeline for a registered site.
    pub fn pipeline(&self, site_id: &str) -> Result<CatalogPipeline> {
        let adapter = self.registry.get(site_id)?;
        let pipeline = CatalogPipeline::new(
            site_id,
            adapter,
            Arc::clone(&self.fetcher),
            &self.config.crawler,
        );
        Ok(match self.throttles.get(site_id) {
            Some(throttle) => pipeline.with_throttle(Arc::clone(throttle)),
            None => pipeline,
        })
    }
}
