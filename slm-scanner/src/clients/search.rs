//! Google Custom Search JSON API client
//!
//! <https://developers.google.com/custom-search/v1/overview>. The free tier
//! allows 100 queries per day, which is plenty since only cache misses search.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::USER_AGENT;
use crate::types::{ClientError, SearchHit, SearchProvider};

const CUSTOM_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// Search engine credentials
#[derive(Debug, Clone)]
pub struct SearchCredentials {
    /// Custom search engine ID (`cx`)
    pub engine_id: String,
    pub api_key: String,
}

/// Search response; only the fields the resolver uses are kept and unknown
/// fields are tolerated
#[derive(Debug, Deserialize)]
struct CustomSearchResponse {
    #[serde(default)]
    items: Vec<CustomSearchItem>,
}

#[derive(Debug, Deserialize)]
struct CustomSearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
}

/// Google Custom Search client
pub struct GoogleSearchClient {
    http_client: reqwest::Client,
    credentials: Option<SearchCredentials>,
    base_url: String,
}

impl GoogleSearchClient {
    /// Without credentials every search fails with [`ClientError::NotConfigured`]
    pub fn new(credentials: Option<SearchCredentials>) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            credentials,
            base_url: CUSTOM_SEARCH_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SearchProvider for GoogleSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ClientError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            ClientError::NotConfigured(
                "GOOGLE_SEARCH_CUSTOM_SEARCH_ENGINE_ID / GOOGLE_SEARCH_API_KEY".to_string(),
            )
        })?;

        tracing::debug!(query = %query, "Querying custom search API");

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("cx", credentials.engine_id.as_str()),
                ("key", credentials.api_key.as_str()),
                ("q", query),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClientError::Api(status.as_u16(), error_text));
        }

        let body: CustomSearchResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        tracing::info!(query = %query, results = body.items.len(), "Web search complete");

        Ok(into_hits(body))
    }
}

fn into_hits(body: CustomSearchResponse) -> Vec<SearchHit> {
    body.items
        .into_iter()
        .map(|item| SearchHit {
            title: item.title,
            link: item.link,
        })
        .collect()
}
