//! REST knowledge store implementation
//!
//! Talks to the knowledge base backend: multipart upload for ingestion, JSON
//! for the rest, bearer-token authenticated.

use crate::{DocumentFile, KnowledgeStore, RemoteChunk};
use anyhow::anyhow;
use async_trait::async_trait;
use cogni_core::{
    DocumentStats, Error, KnowledgeConfig, Result, StoreCapability, StoreMetadata,
};
use reqwest::{multipart, Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

/// REST implementation of the knowledge store.
///
/// Capabilities default to ingest/search/stats; deletion is opt-in because
/// older backend deployments lack the endpoint.
#[derive(Debug)]
pub struct RestKnowledgeStore {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
    capabilities: Vec<StoreCapability>,
}

#[derive(Serialize)]
struct SearchBody<'a> {
    query: &'a str,
    limit: usize,
}

/// Backends return either a bare array or an envelope with a `results` field.
#[derive(Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    Bare(Vec<RemoteChunk>),
    Enveloped { results: Vec<RemoteChunk> },
}

#[derive(Deserialize)]
struct StatsResponse {
    total_chunks: usize,
    #[serde(default)]
    files: Vec<StatsFile>,
}

#[derive(Deserialize)]
struct StatsFile {
    file_name: String,
}

impl RestKnowledgeStore {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::config_error(format!("invalid knowledge base URL: {e}")))?;
        Ok(Self {
            client: Client::new(),
            base_url,
            api_token: None,
            capabilities: vec![
                StoreCapability::Ingest,
                StoreCapability::Search,
                StoreCapability::Stats,
            ],
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Override the advertised capability set, e.g. to enable deletion
    /// against a backend known to support it.
    pub fn with_capabilities(mut self, capabilities: Vec<StoreCapability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn from_config(config: &KnowledgeConfig) -> Result<Self> {
        let mut store = Self::new(&config.base_url)?;
        store.api_token = config.api_token.clone();
        Ok(store)
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::config_error(format!("invalid knowledge URL path: {e}")))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl KnowledgeStore for RestKnowledgeStore {
    fn metadata(&self) -> StoreMetadata {
        StoreMetadata::new("rest", self.capabilities.clone())
    }

    async fn ingest(&self, tutor_id: &str, file: &DocumentFile) -> Result<()> {
        let url = self.url(&format!("kb/{tutor_id}/documents"))?;

        let part = multipart::Part::bytes(file.data.clone()).file_name(file.file_name.clone());
        let form = multipart::Form::new().part("file", part);

        let response = self
            .authorize(self.client.post(url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Ingestion(format!("upload request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Ingestion(format!("backend error {status}: {body}")));
        }

        Ok(())
    }

    async fn search(&self, tutor_id: &str, query: &str, limit: usize) -> Result<Vec<RemoteChunk>> {
        let url = self.url(&format!("kb/{tutor_id}/search"))?;
        let body = SearchBody { query, limit };

        let response = self
            .authorize(self.client.post(url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::search_error(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::search_error(format!(
                "backend error {status}: {body}"
            )));
        }

        let parsed = response
            .json::<SearchResponse>()
            .await
            .map_err(|e| Error::search_error(format!("failed to decode results: {e}")))?;

        Ok(match parsed {
            SearchResponse::Bare(chunks) => chunks,
            SearchResponse::Enveloped { results } => results,
        })
    }

    async fn stats(&self, tutor_id: &str) -> Result<DocumentStats> {
        let url = self.url(&format!("kb/{tutor_id}/stats"))?;

        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| Error::Other(anyhow!("stats request failed: {e}")))?;

        // A tutor without any documents yet has no stats resource.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(DocumentStats::default());
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Other(anyhow!("backend error {status}: {body}")));
        }

        let parsed = response
            .json::<StatsResponse>()
            .await
            .map_err(|e| Error::Other(anyhow!("failed to decode stats: {e}")))?;

        Ok(DocumentStats {
            total_chunks: parsed.total_chunks,
            total_files: parsed.files.len(),
            file_names: parsed.files.into_iter().map(|f| f.file_name).collect(),
        })
    }

    async fn delete(&self, tutor_id: &str) -> Result<()> {
        let url = self.url(&format!("kb/{tutor_id}"))?;

        let response = self
            .authorize(self.client.delete(url))
            .send()
            .await
            .map_err(|e| Error::Other(anyhow!("delete request failed: {e}")))?;

        // Deleting an empty knowledge base is not an error.
        if response.status() == StatusCode::NOT_FOUND || response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::Other(anyhow!(
            "failed to delete knowledge base ({status}): {body}"
        )))
    }
}
