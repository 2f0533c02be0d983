//! HTTP client implementation
//!
//! This module provides a client that talks to a running tasktree server.

use std::sync::Arc;

use reqwest::{Client as ReqwestClient, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::trait_def::CommandResult;
use super::{Client, ClientError};
use crate::api::server::ApiResponse;
use crate::models::{Command, Direction, TaskId};
use crate::store::TransitionLogEntry;
use crate::view::TreeView;

/// API client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
        }
    }
}

/// API client for the tasktree service
#[derive(Debug, Clone)]
pub struct HttpClientImpl {
    http_client: Arc<ReqwestClient>,
    config: ClientConfig,
}

impl HttpClientImpl {
    /// Create a new client with default configuration
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            http_client: Arc::new(ReqwestClient::new()),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http_client.get(self.url(path))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http_client.post(self.url(path))
    }

    fn post_json<B: Serialize>(&self, path: &str, body: &B) -> RequestBuilder {
        self.post(path).json(body)
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.http_client.delete(self.url(path))
    }

    /// Sends the request and unwraps the API envelope
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let api_response: ApiResponse<T> = response.json().await?;

        if api_response.success {
            return api_response.data.ok_or(ClientError::MissingData);
        }

        match (status, api_response.task_id) {
            (StatusCode::NOT_FOUND, Some(id)) => Err(ClientError::TaskNotFound(id)),
            _ => Err(ClientError::Api(api_response.error.unwrap_or_else(|| {
                format!("Unknown API error (status {})", status)
            }))),
        }
    }
}

impl Default for HttpClientImpl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Client for HttpClientImpl {
    async fn get_state(&self) -> CommandResult {
        self.send(self.get("/api/state")).await
    }

    async fn get_view(&self) -> Result<TreeView, ClientError> {
        self.send(self.get("/api/view")).await
    }

    async fn get_history(&self) -> Result<Vec<TransitionLogEntry>, ClientError> {
        self.send(self.get("/api/history")).await
    }

    async fn dispatch(&self, command: Command) -> CommandResult {
        self.send(self.post_json("/api/dispatch", &command)).await
    }

    async fn add_task(&self, title: String) -> CommandResult {
        let request = crate::api::server::AddTaskRequest { title };
        self.send(self.post_json("/api/tasks", &request)).await
    }

    async fn delete_task(&self, id: TaskId) -> CommandResult {
        self.send(self.delete(&format!("/api/tasks/{}", id))).await
    }

    async fn restore_task(&self) -> CommandResult {
        self.send(self.post("/api/restore")).await
    }

    async fn empty_completed_tasks(&self) -> CommandResult {
        self.send(self.delete("/api/completed")).await
    }

    async fn toggle_sub_tasks_open(&self, id: TaskId) -> CommandResult {
        self.send(self.post(&format!("/api/tasks/{}/toggle", id))).await
    }

    async fn toggle_log_book_open(&self, force: Option<bool>) -> CommandResult {
        let request = crate::api::server::LogBookRequest { open: force };
        self.send(self.post_json("/api/logbook", &request)).await
    }

    async fn select(&self, direction: Direction) -> CommandResult {
        self.send(self.post(&format!("/api/select/{}", direction.as_str())))
            .await
    }

    async fn select_task(&self, id: TaskId) -> CommandResult {
        let request = crate::api::server::SelectTaskRequest { id };
        self.send(self.post_json("/api/select", &request)).await
    }
}
