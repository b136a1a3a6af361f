//! REST context store implementation
//!
//! Talks to the conversation persistence backend: JSON over HTTPS, one
//! request per operation, bearer-token authenticated.

use crate::ContextStore;
use anyhow::anyhow;
use async_trait::async_trait;
use cogni_core::{ConversationContext, ConversationMessage, Error, MemoryConfig, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use url::Url;

/// REST implementation of the context store.
#[derive(Debug)]
pub struct RestContextStore {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AppendMessageBody<'a> {
    tutor_id: &'a str,
    message: &'a ConversationMessage,
}

impl RestContextStore {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::config_error(format!("invalid memory base URL: {e}")))?;
        Ok(Self {
            client: Client::new(),
            base_url,
            api_token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn from_config(config: &MemoryConfig) -> Result<Self> {
        let mut store = Self::new(&config.base_url)?;
        store.api_token = config.api_token.clone();
        Ok(store)
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::config_error(format!("invalid memory URL path: {e}")))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl ContextStore for RestContextStore {
    async fn get(&self, session_id: &str) -> Result<Option<ConversationContext>> {
        let url = self.url(&format!("memory/{session_id}"))?;

        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| Error::load_error(format!("request failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::load_error(format!("backend error {status}: {body}")));
        }

        let context = response
            .json::<ConversationContext>()
            .await
            .map_err(|e| Error::load_error(format!("failed to decode context: {e}")))?;

        Ok(Some(context))
    }

    async fn put(&self, context: &ConversationContext) -> Result<()> {
        let url = self.url(&format!("memory/{}", context.session_id))?;

        let response = self
            .authorize(self.client.put(url))
            .json(context)
            .send()
            .await
            .map_err(|e| Error::Other(anyhow!("failed to persist context: {e}")))?;

        if response.status() == StatusCode::CONFLICT {
            return Err(Error::Conflict(format!(
                "session {}: stale version {}",
                context.session_id, context.version
            )));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Other(anyhow!(
                "failed to persist context ({status}): {body}"
            )));
        }

        Ok(())
    }

    async fn append_message(
        &self,
        session_id: &str,
        tutor_id: &str,
        message: ConversationMessage,
    ) -> Result<()> {
        let url = self.url(&format!("memory/{session_id}/messages"))?;
        let body = AppendMessageBody {
            tutor_id,
            message: &message,
        };

        let response = self
            .authorize(self.client.post(url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::AddMessage(format!("request failed: {e}")))?;

        if response.status() == StatusCode::CONFLICT {
            return Err(Error::Conflict(format!(
                "session {session_id}: concurrent append rejected"
            )));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::AddMessage(format!("backend error {status}: {body}")));
        }

        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        let url = self.url(&format!("memory/{session_id}"))?;

        let response = self
            .authorize(self.client.delete(url))
            .send()
            .await
            .map_err(|e| Error::Other(anyhow!("delete request failed: {e}")))?;

        // Deleting a non-existing context is not an error.
        if response.status() == StatusCode::NOT_FOUND || response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::Other(anyhow!(
            "failed to delete context ({status}): {body}"
        )))
    }
}
