//! Process-lifetime caches shared between the calculator tasks and the UI.
//!
//! Both maps sit behind a single `parking_lot::RwLock`; write volume is a
//! handful of entries per user action, so sharding buys nothing.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;
use parking_lot::RwLock;

use crate::dtype::DataType;
use crate::kv_cache::{ArchitectureConfig, KvEstimate};

/// Identity of one memory figure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CalculationKey {
    pub model_id: String,
    pub users: u32,
    pub context_length: u32,
    pub dtype: DataType,
}

impl CalculationKey {
    pub fn new(model_id: impl Into<String>, users: u32, context_length: u32, dtype: DataType) -> Self {
        Self {
            model_id: model_id.into(),
            users,
            context_length,
            dtype,
        }
    }
}

/// Architecture metadata per model id. Entries never expire.
#[derive(Debug, Default)]
pub struct ArchitectureCache {
    configs: RwLock<HashMap<String, ArchitectureConfig>>,
}

impl ArchitectureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, model_id: &str) -> Option<ArchitectureConfig> {
        self.configs.read().get(model_id).copied()
    }

    pub fn put(&self, model_id: &str, config: ArchitectureConfig) {
        self.configs.write().insert(model_id.to_string(), config);
    }

    pub fn len(&self) -> usize {
        self.configs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedResult {
    estimate: KvEstimate,
    inserted_at: Instant,
}

/// Computed KV cache figures per [`CalculationKey`].
///
/// Entries older than the time-to-live read as misses; the next `put`
/// for the key replaces them.
#[derive(Debug)]
pub struct ResultCache {
    entries: RwLock<HashMap<CalculationKey, CachedResult>>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, key: &CalculationKey) -> Option<KvEstimate> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if entry.inserted_at.elapsed() >= self.ttl {
            debug!("result for {key:?} expired");
            return None;
        }
        Some(entry.estimate)
    }

    pub fn put(&self, key: CalculationKey, estimate: KvEstimate) {
        self.entries.write().insert(
            key,
            CachedResult {
                estimate,
                inserted_at: Instant::now(),
            },
        );
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
