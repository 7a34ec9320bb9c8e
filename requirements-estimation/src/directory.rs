use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::DirectoryError;
use crate::kv_cache::ArchitectureConfig;

/// What the explorer shows about a model besides its memory figures.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    pub model_id: String,
    pub author: String,
    /// Parameter count in billions.
    pub parameters_b: f64,
    pub downloads: u64,
    pub likes: u64,
    pub fetched_at: DateTime<Local>,
}

/// Catalogue of models and their metadata.
#[async_trait]
pub trait ModelDirectory: Send + Sync {
    async fn list_models(&self) -> Result<Vec<String>, DirectoryError>;

    /// Model ids matching `query`, most relevant first.
    async fn search_models(&self, query: &str) -> Result<Vec<String>, DirectoryError>;

    async fn fetch_model_summary(&self, model_id: &str) -> Result<ModelSummary, DirectoryError>;

    /// The model's attention geometry, with omitted KV heads already filled in.
    async fn fetch_architecture(&self, model_id: &str) -> Result<ArchitectureConfig, DirectoryError>;
}

#[derive(Deserialize)]
struct ListEntry {
    id: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Safetensors {
    total: u64,
}

#[derive(Deserialize)]
struct SummaryResponse {
    id: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    downloads: u64,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    safetensors: Safetensors,
}

/// [`ModelDirectory`] backed by the Hugging Face Hub HTTP API.
pub struct HuggingFaceDirectory {
    client: Client,
    base_url: String,
}

impl HuggingFaceDirectory {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DirectoryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T, DirectoryError> {
        debug!("GET {url}");
        let response = self.client.get(url).query(query).send().await?;
        if response.status() != StatusCode::OK {
            return Err(DirectoryError::Status(response.status().as_u16()));
        }
        Ok(response.json::<T>().await?)
    }

    async fn fetch_ids(&self, query: &[(&str, &str)]) -> Result<Vec<String>, DirectoryError> {
        let url = format!("{}/api/models", self.base_url);
        let entries: Vec<ListEntry> = self.get_json(&url, query).await?;
        Ok(entries.into_iter().map(|entry| entry.id).collect())
    }
}

#[async_trait]
impl ModelDirectory for HuggingFaceDirectory {
    async fn list_models(&self) -> Result<Vec<String>, DirectoryError> {
        self.fetch_ids(&[]).await
    }

    async fn search_models(&self, query: &str) -> Result<Vec<String>, DirectoryError> {
        let ids = self.fetch_ids(&[("search", query)]).await?;
        Ok(rank_models(ids, query))
    }

    async fn fetch_model_summary(&self, model_id: &str) -> Result<ModelSummary, DirectoryError> {
        if model_id.is_empty() {
            return Err(DirectoryError::EmptyModelId);
        }
        let url = format!("{}/api/models/{model_id}", self.base_url);
        let response: SummaryResponse = self.get_json(&url, &[]).await?;
        summary_from_response(response, model_id)
    }

    async fn fetch_architecture(&self, model_id: &str) -> Result<ArchitectureConfig, DirectoryError> {
        if model_id.is_empty() {
            return Err(DirectoryError::EmptyModelId);
        }
        let url = format!("{}/{model_id}/raw/main/config.json", self.base_url);
        let config: ArchitectureConfig = self.get_json(&url, &[]).await?;
        Ok(config.normalized())
    }
}

fn summary_from_response(response: SummaryResponse, model_id: &str) -> Result<ModelSummary, DirectoryError> {
    #[allow(clippy::cast_precision_loss)]
    let parameters_b = response.safetensors.total as f64 / 1e9;
    if parameters_b == 0.0 {
        return Err(DirectoryError::MissingParameterCount(model_id.to_string()));
    }
    Ok(ModelSummary {
        model_id: response.id,
        author: response.author,
        parameters_b,
        downloads: response.downloads,
        likes: response.likes,
        fetched_at: Local::now(),
    })
}

/// Orders `ids` by relevance to `query`.
///
/// Case-insensitive substring hits come first (earliest match, then shortest
/// id), followed by fuzzy matches by descending score. Ids matching neither
/// way are dropped. An empty query keeps the input order.
pub fn rank_models(ids: Vec<String>, query: &str) -> Vec<String> {
    if query.is_empty() {
        return ids;
    }

    let query = query.to_lowercase();
    let matcher = SkimMatcherV2::default();
    let mut exact: Vec<(usize, String)> = Vec::new();
    let mut fuzzy: Vec<(i64, String)> = Vec::new();

    for id in ids {
        if let Some(position) = id.to_lowercase().find(&query) {
            exact.push((position, id));
        } else if let Some(score) = matcher.fuzzy_match(&id, &query) {
            fuzzy.push((score, id));
        }
    }

    exact.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.len().cmp(&b.1.len())));
    fuzzy.sort_by(|a, b| b.0.cmp(&a.0));

    exact
        .into_iter()
        .map(|(_, id)| id)
        .chain(fuzzy.into_iter().map(|(_, id)| id))
        .collect()
}
