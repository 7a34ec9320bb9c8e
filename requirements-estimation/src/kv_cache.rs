use serde::{Deserialize, Serialize};

use crate::dtype::DataType;
use crate::error::EstimationError;
use crate::round2;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// The attention geometry read from a model's `config.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchitectureConfig {
    pub hidden_size: u64,
    pub num_attention_heads: u64,
    pub num_hidden_layers: u64,
    /// Zero when the model does not use grouped-query attention and omits the field.
    pub num_key_value_heads: u64,
}

impl ArchitectureConfig {
    /// Fills in `num_key_value_heads` from the attention head count when it was omitted.
    #[must_use]
    pub const fn normalized(mut self) -> Self {
        if self.num_key_value_heads == 0 {
            self.num_key_value_heads = self.num_attention_heads;
        }
        self
    }
}

/// How a KV cache figure was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Precise,
    Estimated,
}

impl Method {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Precise => "precise",
            Self::Estimated => "estimated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KvEstimate {
    pub gigabytes: f64,
    pub method: Method,
}

/// KV cache memory in GB for `users` concurrent sequences of `context_length` tokens.
///
/// `2 * layers * seq_len * (hidden / heads * kv_heads) * 2 * bytes_per_param * users`.
/// `hidden / heads` is integer division, so head dimensions that do not divide
/// evenly are truncated.
pub fn precise_kv_cache(
    config: &ArchitectureConfig,
    users: u32,
    context_length: u32,
    dtype: DataType,
) -> Result<f64, EstimationError> {
    let config = config.normalized();
    if config.num_attention_heads == 0 || config.hidden_size == 0 || config.num_hidden_layers == 0 {
        return Err(EstimationError::DegenerateArchitecture {
            hidden_size: config.hidden_size,
            num_attention_heads: config.num_attention_heads,
            num_hidden_layers: config.num_hidden_layers,
        });
    }

    let head_dim = config.hidden_size / config.num_attention_heads;
    let kv_bytes = head_dim
        .checked_mul(config.num_key_value_heads)
        .and_then(|v| v.checked_mul(config.num_hidden_layers))
        .and_then(|v| v.checked_mul(u64::from(context_length)))
        .and_then(|v| v.checked_mul(4))
        .ok_or(EstimationError::KvCacheOverflow {
            num_hidden_layers: config.num_hidden_layers,
            context_length,
        })?;

    #[allow(clippy::cast_precision_loss)]
    let memory_gb = kv_bytes as f64 * dtype.bytes_per_param() / BYTES_PER_GB;
    Ok(round2(memory_gb * f64::from(users)))
}

/// Heuristic KV cache size for models whose architecture is unavailable.
///
/// Small models (< 7B) take ~0.5 GB per 1k tokens, medium (< 20B) ~1 GB and
/// anything larger ~2 GB, at fp16.
pub fn estimate_kv_cache(params_b: f64, users: u32, context_length: u32, dtype: DataType) -> f64 {
    let per_thousand = if params_b < 7.0 {
        0.5
    } else if params_b < 20.0 {
        1.0
    } else {
        2.0
    };

    let mut per_user = per_thousand * f64::from(context_length) / 1000.0;
    per_user *= dtype.bytes_per_param() / DataType::Float16.bytes_per_param();

    round2(per_user * f64::from(users))
}
