//! REST implementation of the session backend.
//!
//! Thin HTTP client over the provider's session API. Bearer auth on every
//! request; path segments are percent-encoded because session and workspace
//! names come from user input. Budgets are enforced by the callers' guards,
//! so only the connect phase carries its own timeout here.

use std::time::Duration;

use async_trait::async_trait;
use rcx_common::util::STDERR_CAP;
use rcx_common::{SessionApi, SessionError, SessionId, SessionName, truncate_output};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Default API endpoint; override with `RCX_API_URL`.
pub const DEFAULT_API_URL: &str = "https://api.studio-cloud.dev/v1";

/// Env var overriding the API endpoint.
pub const API_URL_ENV_VAR: &str = "RCX_API_URL";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SessionResource {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ExecResponse {
    #[serde(default)]
    output: String,
    #[serde(rename = "exitCode")]
    exit_code: i32,
}

impl RestClient {
    pub fn new(api_key: &str) -> Result<Self, SessionError> {
        let base_url = std::env::var(API_URL_ENV_VAR)
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|err| SessionError::Transport(err.to_string()))?;
        debug!(%base_url, "session API client initialized");
        Ok(Self {
            http,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, SessionError> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|err| SessionError::Transport(err.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            Err(SessionError::NotFound(message))
        } else {
            Err(SessionError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn session_from(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<SessionId, SessionError> {
        let resource: SessionResource = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|err| SessionError::Transport(err.to_string()))?;
        Ok(SessionId::new(resource.id))
    }
}

fn workspace_session_path(workspace: &str, name: &SessionName) -> String {
    format!(
        "/workspaces/{}/sessions/{}",
        urlencoding::encode(workspace),
        urlencoding::encode(name.as_str())
    )
}

#[async_trait]
impl SessionApi for RestClient {
    async fn connect(
        &self,
        name: &SessionName,
        workspace: &str,
    ) -> Result<SessionId, SessionError> {
        let url = self.url(&workspace_session_path(workspace, name));
        self.session_from(self.http.get(url)).await
    }

    async fn create(
        &self,
        name: &SessionName,
        workspace: &str,
        user: &str,
    ) -> Result<SessionId, SessionError> {
        let url = self.url(&format!(
            "/workspaces/{}/sessions",
            urlencoding::encode(workspace)
        ));
        let body = json!({ "name": name.as_str(), "user": user });
        self.session_from(self.http.post(url).json(&body)).await
    }

    async fn create_personal(
        &self,
        name: &SessionName,
        user: &str,
    ) -> Result<SessionId, SessionError> {
        let url = self.url(&format!("/users/{}/sessions", urlencoding::encode(user)));
        let body = json!({ "name": name.as_str() });
        self.session_from(self.http.post(url).json(&body)).await
    }

    async fn start(&self, id: &SessionId) -> Result<(), SessionError> {
        let url = self.url(&format!("/sessions/{}/start", urlencoding::encode(id.as_str())));
        self.send(self.http.post(url)).await?;
        Ok(())
    }

    async fn run(&self, id: &SessionId, command: &str) -> Result<String, SessionError> {
        let url = self.url(&format!("/sessions/{}/exec", urlencoding::encode(id.as_str())));
        let body = json!({ "command": command });
        let response: ExecResponse = self
            .send(self.http.post(url).json(&body))
            .await?
            .json()
            .await
            .map_err(|err| SessionError::Transport(err.to_string()))?;
        if response.exit_code == 0 {
            Ok(response.output)
        } else {
            Err(SessionError::CommandFailed(format!(
                "exit {}: {}",
                response.exit_code,
                truncate_output(&response.output, STDERR_CAP)
            )))
        }
    }

    async fn stop(&self, id: &SessionId) -> Result<(), SessionError> {
        let url = self.url(&format!("/sessions/{}/stop", urlencoding::encode(id.as_str())));
        self.send(self.http.post(url)).await?;
        Ok(())
    }
}
