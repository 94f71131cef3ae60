//! Scan feedback announcers
//!
//! Every scan ends with a short sentence for the person at the scanner, so they
//! know whether to rescan. Where it goes is pluggable: the log, or a speech
//! endpoint on the local network.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use super::USER_AGENT;
use crate::types::ClientError;

/// Delivers feedback sentences to the user
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, text: &str) -> Result<(), ClientError>;
}

/// Writes feedback to the log only
#[derive(Debug, Default, Clone)]
pub struct LogAnnouncer;

#[async_trait]
impl Announcer for LogAnnouncer {
    async fn announce(&self, text: &str) -> Result<(), ClientError> {
        tracing::info!(feedback = %text, "Scan feedback");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SpeakRequest<'a> {
    text: &'a str,
}

/// POSTs `{"text": ...}` to a speech endpoint
pub struct HttpAnnouncer {
    http_client: reqwest::Client,
    url: String,
}

impl HttpAnnouncer {
    pub fn new(url: String) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self { http_client, url })
    }
}

#[async_trait]
impl Announcer for HttpAnnouncer {
    async fn announce(&self, text: &str) -> Result<(), ClientError> {
        tracing::info!(feedback = %text, url = %self.url, "Announcing scan feedback");

        let response = self
            .http_client
            .post(&self.url)
            .json(&SpeakRequest { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClientError::Api(status.as_u16(), error_text));
        }
        Ok(())
    }
}
