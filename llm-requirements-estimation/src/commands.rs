use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use requirements_estimation::settings::DEFAULT_API_URL;
use requirements_estimation::Settings;

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Estimate the GPU memory needed to serve large language models
///
/// Memory is the model weights at a given precision plus the KV cache for a
/// number of concurrent users at a given context length. The KV cache is
/// computed from the model's config.json when available and estimated from
/// its parameter count otherwise.
///
/// Supported data types: fp16 (f16, float16), int8 (q8), int4 (q4)
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Base URL of the Hugging Face Hub
    #[arg(long, global = true, value_name = "URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Timeout for each request to the hub, in seconds
    #[arg(long, global = true, value_name = "SECS", default_value_t = 10)]
    pub timeout: u64,

    /// How long computed results stay cached, in seconds
    #[arg(long, global = true, value_name = "SECS", default_value_t = 86_400)]
    pub cache_ttl: u64,

    /// Write logs to this file (the only log output in tui mode)
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Estimate memory requirements for one model
    Estimate {
        /// Hugging Face model ID (e.g. Qwen/Qwen2.5-0.5B)
        #[arg(long, value_name = "MODEL_ID")]
        model: String,

        /// Data type to load the model in; all types are shown when omitted
        #[arg(long, value_name = "DTYPE")]
        dtype: Option<String>,

        /// Number of concurrent users
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        users: u32,

        /// Context length per user, in tokens
        #[arg(long, default_value_t = 4096, value_parser = clap::value_parser!(u32).range(1..))]
        context: u32,

        /// Use the parameter-count heuristic for the KV cache
        #[arg(long)]
        estimate_kv: bool,

        /// Show model details and a full memory breakdown
        #[arg(short, long)]
        verbose: bool,
    },

    /// List models on the hub
    List {
        /// Only models matching this query, best match first
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Explore models interactively
    Tui,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        let force_estimate = matches!(self.command, Some(Commands::Estimate { estimate_kv: true, .. }));
        Settings {
            api_url: self.api_url.clone(),
            request_timeout: Duration::from_secs(self.timeout),
            cache_ttl: Duration::from_secs(self.cache_ttl),
            force_estimate,
            ..Settings::default()
        }
    }
}
