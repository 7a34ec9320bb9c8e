use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://huggingface.co";

/// Runtime knobs shared by the CLI and the interactive explorer.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the model directory.
    pub api_url: String,
    /// Bound on every directory request.
    pub request_timeout: Duration,
    /// How long a computed KV cache figure stays valid.
    pub cache_ttl: Duration,
    /// Skip architecture lookups and always use the heuristic.
    pub force_estimate: bool,
    pub user_counts: Vec<u32>,
    pub context_lengths: Vec<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            force_estimate: false,
            user_counts: vec![1, 2, 4, 8, 16, 32],
            context_lengths: vec![2048, 4096, 8192, 16384, 32768],
        }
    }
}

impl Settings {
    pub fn default_users(&self) -> u32 {
        self.user_counts.first().copied().unwrap_or(1)
    }

    pub fn default_context_length(&self) -> u32 {
        self.context_lengths
            .get(1)
            .or_else(|| self.context_lengths.first())
            .copied()
            .unwrap_or(4096)
    }
}
