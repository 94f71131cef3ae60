//! Todoist REST API client
//!
//! <https://developer.todoist.com/rest/v2/>. The shopping list is one Todoist
//! project; its tasks are the list entries.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use super::USER_AGENT;
use crate::types::{ClientError, NewTask, Task, TaskList};

const TODOIST_BASE_URL: &str = "https://api.todoist.com/rest/v2";

#[derive(Debug, Serialize)]
struct UpdateTaskRequest<'a> {
    content: &'a str,
}

/// Todoist API client
pub struct TodoistClient {
    http_client: reqwest::Client,
    token: String,
    base_url: String,
}

impl TodoistClient {
    pub fn new(token: String) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            token,
            base_url: TODOIST_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClientError::Api(status.as_u16(), error_text));
        }
        Ok(response)
    }
}

#[async_trait]
impl TaskList for TodoistClient {
    async fn list_tasks(&self, project_id: &str) -> Result<Vec<Task>, ClientError> {
        let response = self
            .http_client
            .get(format!("{}/tasks", self.base_url))
            .query(&[("project_id", project_id)])
            .bearer_auth(&self.token)
            .send()
            .await?;

        let mut tasks: Vec<Task> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        // REST API results have no ordering
        sort_by_order(&mut tasks);

        tracing::debug!(project_id = %project_id, tasks = tasks.len(), "Listed shopping list tasks");
        Ok(tasks)
    }

    async fn create_task(&self, task: NewTask) -> Result<(), ClientError> {
        let response = self
            .http_client
            .post(format!("{}/tasks", self.base_url))
            .bearer_auth(&self.token)
            .json(&task)
            .send()
            .await?;
        Self::check(response).await?;

        tracing::info!(content = %task.content, order = task.order, "Created shopping list task");
        Ok(())
    }

    async fn update_task(&self, id: &str, content: &str) -> Result<(), ClientError> {
        let response = self
            .http_client
            .post(format!("{}/tasks/{}", self.base_url, id))
            .bearer_auth(&self.token)
            .json(&UpdateTaskRequest { content })
            .send()
            .await?;
        Self::check(response).await?;

        tracing::info!(task_id = %id, content = %content, "Renamed shopping list task");
        Ok(())
    }
}

fn sort_by_order(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| t.order);
}
