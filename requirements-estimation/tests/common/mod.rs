#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use requirements_estimation::{
    ArchitectureCache, ArchitectureConfig, Calculator, DirectoryError, ModelDirectory, ModelSummary, ResultCache,
};
use tokio::sync::Semaphore;

pub enum Behavior {
    Returns(ArchitectureConfig),
    Fails,
    /// Never answers.
    Hangs,
    /// Answers once the gate has a permit.
    Gated(ArchitectureConfig, Arc<Semaphore>),
}

/// In-memory directory that counts architecture fetches.
pub struct FakeDirectory {
    behavior: Behavior,
    pub architecture_calls: AtomicUsize,
}

impl FakeDirectory {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            architecture_calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.architecture_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelDirectory for FakeDirectory {
    async fn list_models(&self) -> Result<Vec<String>, DirectoryError> {
        Ok(vec!["Qwen/Qwen2.5-0.5B".to_string(), "meta-llama/Llama-2-7b-hf".to_string()])
    }

    async fn search_models(&self, query: &str) -> Result<Vec<String>, DirectoryError> {
        let ids = self.list_models().await?;
        Ok(requirements_estimation::directory::rank_models(ids, query))
    }

    async fn fetch_model_summary(&self, model_id: &str) -> Result<ModelSummary, DirectoryError> {
        Ok(ModelSummary {
            model_id: model_id.to_string(),
            author: "test".to_string(),
            parameters_b: 7.0,
            downloads: 0,
            likes: 0,
            fetched_at: Local::now(),
        })
    }

    async fn fetch_architecture(&self, _model_id: &str) -> Result<ArchitectureConfig, DirectoryError> {
        self.architecture_calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Returns(config) => Ok(*config),
            Behavior::Fails => Err(DirectoryError::Status(404)),
            Behavior::Hangs => std::future::pending().await,
            Behavior::Gated(config, gate) => {
                let _permit = gate.acquire().await.map_err(|_| DirectoryError::Status(503))?;
                Ok(*config)
            }
        }
    }
}

pub const fn llama_7b() -> ArchitectureConfig {
    ArchitectureConfig {
        hidden_size: 4096,
        num_attention_heads: 32,
        num_hidden_layers: 32,
        num_key_value_heads: 32,
    }
}

pub fn calculator(directory: Arc<FakeDirectory>) -> Calculator {
    Calculator::new(
        directory,
        Arc::new(ArchitectureCache::new()),
        Arc::new(ResultCache::new(Duration::from_secs(3600))),
    )
}
