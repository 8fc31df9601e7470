use super::{ClientError, ClientResult};
use crate::errors::ErrorBody;
use crate::handlers::health::HealthResponse;
use crate::handlers::tasks::DeleteTaskResponse;
use crate::models::task::{NewTask, Task, TaskPatch};
use crate::models::user::{AuthResponse, LoginRequest, PublicUser, RegisterRequest};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Typed wrapper over the REST API.
///
/// Holds no credentials: every protected call takes the bearer token explicitly.
#[derive(Clone)]
pub struct TaskApiClient {
    client: Client,
    base_url: String,
}

impl TaskApiClient {
    /// `base_url` includes the API prefix, e.g. `http://localhost:5001/api`.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("todo-app/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(TaskApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> ClientResult<HealthResponse> {
        send(self.client.get(self.url("/health"))).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<AuthResponse> {
        send(self.client.post(self.url("/auth/register")).json(request)).await
    }

    pub async fn login(&self, request: &LoginRequest) -> ClientResult<AuthResponse> {
        send(self.client.post(self.url("/auth/login")).json(request)).await
    }

    pub async fn me(&self, token: &str) -> ClientResult<PublicUser> {
        send(self.client.get(self.url("/auth/me")).bearer_auth(token)).await
    }

    pub async fn list_tasks(&self, token: &str) -> ClientResult<Vec<Task>> {
        send(self.client.get(self.url("/tasks")).bearer_auth(token)).await
    }

    pub async fn create_task(&self, token: &str, task: &NewTask) -> ClientResult<Task> {
        send(
            self.client
                .post(self.url("/tasks"))
                .bearer_auth(token)
                .json(task),
        )
        .await
    }

    pub async fn update_task(&self, token: &str, id: &str, patch: &TaskPatch) -> ClientResult<Task> {
        send(
            self.client
                .put(self.url(&format!("/tasks/{}", id)))
                .bearer_auth(token)
                .json(patch),
        )
        .await
    }

    pub async fn delete_task(&self, token: &str, id: &str) -> ClientResult<DeleteTaskResponse> {
        send(
            self.client
                .delete(self.url(&format!("/tasks/{}", id)))
                .bearer_auth(token),
        )
        .await
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> ClientResult<T> {
    let response = request.send().await?;
    parse_response(response).await
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();

    if status.is_success() {
        return Ok(response.json().await?);
    }

    // Error bodies from proxies may not be ours; fall back to the status line.
    let body = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => (parsed.error, parsed.message),
        Err(_) => (
            "UNKNOWN".to_string(),
            status.canonical_reason().unwrap_or("request failed").to_string(),
        ),
    };

    Err(ClientError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}
