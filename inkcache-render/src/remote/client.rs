//! Remote browser renderer implementation
//!
//! Each render opens a browser session, evaluates the diagram and closes
//! the session. The three calls run in a spawned task, so the session is
//! closed even when the caller stops waiting (render timeout, client
//! disconnect).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use inkcache_core::{RenderError, Theme};
use reqwest::{Client, RequestBuilder};

use super::types::{RenderRequest, RenderResponse, SessionResponse};
use crate::Renderer;

/// Default per-request HTTP timeout for the browser service.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Renderer backed by a remote headless-browser service.
pub struct RemoteBrowserRenderer {
    session: Arc<BrowserSession>,
}

/// HTTP side of the session protocol. Shared with in-flight render tasks.
#[derive(Clone)]
struct BrowserSession {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl RemoteBrowserRenderer {
    /// Create a renderer for the service at `endpoint`.
    ///
    /// # Arguments
    /// * `endpoint` - Browser service base URL (e.g., "http://127.0.0.1:9222")
    pub fn new(endpoint: impl Into<String>) -> Result<Self, RenderError> {
        Self::with_http_timeout(endpoint, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a renderer whose HTTP client gives up after `http_timeout`.
    pub fn with_http_timeout(
        endpoint: impl Into<String>,
        http_timeout: Duration,
    ) -> Result<Self, RenderError> {
        let client = Client::builder()
            .timeout(http_timeout)
            .build()
            .map_err(|e| RenderError::LaunchFailure {
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            session: Arc::new(BrowserSession {
                client,
                endpoint: endpoint.into().trim_end_matches('/').to_string(),
                token: None,
            }),
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.session).token = Some(token.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.session.endpoint
    }
}

impl BrowserSession {
    /// Open, evaluate, close. The close runs whatever evaluate returned.
    async fn run(&self, source: &str, theme: Theme) -> Result<String, RenderError> {
        let session_id = self.open_session().await?;
        let result = self.evaluate(&session_id, source, theme).await;
        self.close_session(&session_id).await;
        result
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn open_session(&self) -> Result<String, RenderError> {
        let url = format!("{}/sessions", self.endpoint);
        let response = self
            .authorize(self.client.post(&url))
            .send()
            .await
            .map_err(|e| RenderError::LaunchFailure {
                reason: format!("Failed to connect to browser service: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RenderError::LaunchFailure {
                reason: format!("Session request returned {}: {}", status.as_u16(), error_text),
            });
        }

        let session: SessionResponse =
            response.json().await.map_err(|e| RenderError::LaunchFailure {
                reason: format!("Failed to parse session response: {}", e),
            })?;
        Ok(session.session_id)
    }

    async fn evaluate(&self, session_id: &str, source: &str, theme: Theme) -> Result<String, RenderError> {
        let url = format!("{}/sessions/{}/render", self.endpoint, session_id);
        let request = RenderRequest {
            diagram: source,
            theme: theme.as_str(),
        };

        let response = self
            .authorize(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .map_err(|e| RenderError::EvaluationFailure {
                reason: format!("HTTP request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RenderError::EvaluationFailure {
                reason: format!("Render request returned {}: {}", status.as_u16(), error_text),
            });
        }

        let rendered: RenderResponse =
            response.json().await.map_err(|e| RenderError::EvaluationFailure {
                reason: format!("Failed to parse render response: {}", e),
            })?;
        Ok(rendered.markup)
    }

    async fn close_session(&self, session_id: &str) {
        let url = format!("{}/sessions/{}", self.endpoint, session_id);
        match self.authorize(self.client.delete(&url)).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(
                    session_id,
                    status = response.status().as_u16(),
                    "Browser session close rejected"
                );
            }
            Err(e) => {
                tracing::warn!(session_id, error = %e, "Browser session close failed");
            }
        }
    }
}

#[async_trait]
impl Renderer for RemoteBrowserRenderer {
    async fn render(&self, source: &str, theme: Theme) -> Result<String, RenderError> {
        let session = Arc::clone(&self.session);
        let source = source.to_string();
        // Dropping the handle detaches the task; it still closes its session.
        let task = tokio::spawn(async move { session.run(&source, theme).await });
        task.await.map_err(|e| RenderError::EvaluationFailure {
            reason: format!("Render task failed: {}", e),
        })?
    }

    fn name(&self) -> &str {
        "remote-browser"
    }
}

impl std::fmt::Debug for RemoteBrowserRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBrowserRenderer")
            .field("endpoint", &self.session.endpoint)
            .field("token", &self.session.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
