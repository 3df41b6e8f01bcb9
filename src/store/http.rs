use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::session::AuthSession;
use crate::types::{CurrentUser, Task, TaskDraft, TaskId, TaskPatch};

use super::{FieldErrors, StoreError, TaskStore};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// [`TaskStore`] backed by the task REST API.
#[derive(Debug, Clone)]
pub struct HttpTaskStore {
    client: Client,
    base_url: String,
    session: Arc<AuthSession>,
}

impl HttpTaskStore {
    pub fn new(config: HttpStoreConfig, session: Arc<AuthSession>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("failed to build HTTP client for task store")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.access_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, StoreError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|err| map_transport_error(what, &err))?;

        let status = response.status().as_u16();
        if response.status().is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status, what, body = %body, "task store request rejected");
        Err(classify_response(status, &body, what))
    }

    async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, StoreError> {
        response
            .json::<T>()
            .await
            .map_err(|err| StoreError::Network(format!("invalid response for {what}: {err}")))
    }
}

impl TaskStore for HttpTaskStore {
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let response = self
            .send(self.client.get(self.url("tasks/")), "task list")
            .await?;
        Self::decode(response, "task list").await
    }

    async fn create_task(&self, draft: &TaskDraft) -> Result<Task, StoreError> {
        let response = self
            .send(
                self.client.post(self.url("tasks/")).json(draft),
                "task create",
            )
            .await?;
        Self::decode(response, "task create").await
    }

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, StoreError> {
        let what = format!("task {id}");
        let response = self
            .send(
                self.client.patch(self.url(&format!("tasks/{id}/"))).json(patch),
                &what,
            )
            .await?;
        Self::decode(response, &what).await
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), StoreError> {
        let what = format!("task {id}");
        self.send(self.client.delete(self.url(&format!("tasks/{id}/"))), &what)
            .await?;
        Ok(())
    }

    async fn current_user(&self) -> Result<CurrentUser, StoreError> {
        if !self.session.is_signed_in() {
            return Err(StoreError::Auth("no access token available".to_string()));
        }
        let response = self
            .send(self.client.get(self.url("auth/me/")), "current user")
            .await?;
        Self::decode(response, "current user").await
    }
}

fn map_transport_error(what: &str, err: &reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Network(format!("request for {what} timed out"))
    } else if err.is_connect() {
        StoreError::Network(format!("could not reach task server for {what}: {err}"))
    } else {
        StoreError::Network(format!("request for {what} failed: {err}"))
    }
}

/// Maps a non-success HTTP status and its body onto the store error taxonomy.
pub(crate) fn classify_response(status: u16, body: &str, what: &str) -> StoreError {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let detail = parsed
        .as_ref()
        .and_then(|value| value.get("detail"))
        .and_then(Value::as_str)
        .map(str::to_string);

    match status {
        401 | 403 => StoreError::Auth(
            detail.unwrap_or_else(|| format!("server rejected {what} with HTTP {status}")),
        ),
        404 => StoreError::NotFound(detail.unwrap_or_else(|| format!("{what} does not exist"))),
        400 | 422 => {
            let errors = parsed
                .as_ref()
                .map(FieldErrors::from_json)
                .filter(|errors| !errors.is_empty())
                .unwrap_or_else(|| FieldErrors::detail(format!("server rejected {what}")));
            StoreError::Validation(errors)
        }
        _ => StoreError::Network(format!("server returned HTTP {status} for {what}")),
    }
}
