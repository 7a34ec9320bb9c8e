use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("model ID cannot be empty")]
    EmptyModelId,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API request failed with status: {0}")]
    Status(u16),
    #[error("could not determine parameter count for model: {0}")]
    MissingParameterCount(String),
}

#[derive(Debug, Error)]
pub enum EstimationError {
    #[error("unsupported data type: {0}")]
    UnsupportedDataType(String),
    #[error("failed to fetch model architecture: {0}")]
    ArchitectureFetchFailed(#[from] DirectoryError),
    #[error("degenerate architecture: hidden_size={hidden_size}, num_attention_heads={num_attention_heads}, num_hidden_layers={num_hidden_layers}")]
    DegenerateArchitecture {
        hidden_size: u64,
        num_attention_heads: u64,
        num_hidden_layers: u64,
    },
    #[error("KV cache size overflows: num_hidden_layers={num_hidden_layers}, context_length={context_length}")]
    KvCacheOverflow {
        num_hidden_layers: u64,
        context_length: u32,
    },
}
