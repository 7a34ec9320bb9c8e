use std::sync::Arc;

use log::{debug, info, warn};

use crate::cache::{ArchitectureCache, CalculationKey, ResultCache};
use crate::directory::ModelDirectory;
use crate::error::EstimationError;
use crate::kv_cache::{estimate_kv_cache, precise_kv_cache, ArchitectureConfig, KvEstimate, Method};

/// Resolves KV cache figures, preferring cached results, then the precise
/// formula, then the parameter-count heuristic.
///
/// Held in an `Arc` so every spawned calculation shares the same caches.
pub struct Calculator {
    directory: Arc<dyn ModelDirectory>,
    configs: Arc<ArchitectureCache>,
    results: Arc<ResultCache>,
    force_estimate: bool,
}

impl Calculator {
    pub fn new(directory: Arc<dyn ModelDirectory>, configs: Arc<ArchitectureCache>, results: Arc<ResultCache>) -> Self {
        Self {
            directory,
            configs,
            results,
            force_estimate: false,
        }
    }

    /// Always take the estimation path, never touching the directory.
    #[must_use]
    pub const fn with_forced_estimate(mut self, force_estimate: bool) -> Self {
        self.force_estimate = force_estimate;
        self
    }

    pub fn results(&self) -> &Arc<ResultCache> {
        &self.results
    }

    pub fn configs(&self) -> &Arc<ArchitectureCache> {
        &self.configs
    }

    /// Memory figure for `key`. Never fails: every error degrades to the estimate.
    ///
    /// The outcome is stored in the result cache before returning, so a repeated
    /// call with the same key is answered from the cache.
    pub async fn resolve(&self, key: &CalculationKey, params_b: f64) -> KvEstimate {
        if let Some(hit) = self.results.get(key) {
            debug!("cache hit for {key:?}");
            return hit;
        }
        debug!("cache miss for {key:?}");

        let estimate = if self.force_estimate {
            Self::estimate(key, params_b)
        } else {
            match self.precise(key).await {
                Ok(gigabytes) => {
                    debug!("precise KV cache for {key:?}: {gigabytes} GB");
                    KvEstimate {
                        gigabytes,
                        method: Method::Precise,
                    }
                }
                Err(err) => {
                    match &err {
                        EstimationError::ArchitectureFetchFailed(_) => {
                            warn!("{}: {err}, falling back to estimation", key.model_id);
                        }
                        _ => info!("{}: {err}, falling back to estimation", key.model_id),
                    }
                    Self::estimate(key, params_b)
                }
            }
        };

        self.results.put(key.clone(), estimate);
        estimate
    }

    async fn precise(&self, key: &CalculationKey) -> Result<f64, EstimationError> {
        let config = self.architecture(&key.model_id).await?;
        precise_kv_cache(&config, key.users, key.context_length, key.dtype)
    }

    async fn architecture(&self, model_id: &str) -> Result<ArchitectureConfig, EstimationError> {
        if let Some(config) = self.configs.get(model_id) {
            return Ok(config);
        }
        let config = self.directory.fetch_architecture(model_id).await?.normalized();
        self.configs.put(model_id, config);
        Ok(config)
    }

    fn estimate(key: &CalculationKey, params_b: f64) -> KvEstimate {
        let gigabytes = estimate_kv_cache(params_b, key.users, key.context_length, key.dtype);
        debug!("estimated KV cache for {key:?}: {gigabytes} GB");
        KvEstimate {
            gigabytes,
            method: Method::Estimated,
        }
    }
}
