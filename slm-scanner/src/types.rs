//! Collaborator traits and shared types
//!
//! The resolution pipeline talks to three external services through these
//! traits: a web search engine, a language model and the shopping list (task
//! list). The concrete HTTP clients live in [`crate::clients`]; tests supply
//! in-memory implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// External API client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// Credentials or endpoint missing from configuration
    #[error("Not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Parse(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}

/// One web search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
}

/// Language model answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Text(String),
    /// The model declined to answer, with its stated reason
    Refused(String),
}

/// Shopping list entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub content: String,
    /// Position within the project
    #[serde(default)]
    pub order: i64,
}

/// Shopping list entry to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    pub content: String,
    /// Markdown
    pub description: String,
    pub project_id: String,
    /// Position within the project; 0 lets the service choose
    #[serde(skip_serializing_if = "is_zero")]
    pub order: i64,
}

fn is_zero(order: &i64) -> bool {
    *order == 0
}

/// Web search collaborator
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Results in ranking order
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ClientError>;
}

/// Language model collaborator
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<Completion, ClientError>;
}

/// Task list collaborator
#[async_trait]
pub trait TaskList: Send + Sync {
    /// Tasks of a project sorted by their order
    async fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>, ClientError>;

    async fn create_task(&self, task: NewTask) -> Result<(), ClientError>;

    async fn update_task(&self, id: &str, content: &str) -> Result<(), ClientError>;
}
