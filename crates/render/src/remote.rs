//! Remote rendering service client.
//!
//! The plan is POSTed as JSON with a bearer token; the response body is the
//! finished video. Without an endpoint or a token the backend reports itself
//! unavailable rather than pretending to render.

use std::path::PathBuf;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use scriptreel_common::config::{BackendKind, RemoteSettings};

use crate::backend::{RenderBackend, RenderError, RenderRequest, Unavailable};

/// HTTP client for a remote render endpoint.
#[derive(Debug, Clone)]
pub struct RemoteApiBackend {
    settings: RemoteSettings,
    client: Client,
}

impl RemoteApiBackend {
    pub fn new(settings: RemoteSettings) -> Self {
        Self {
            settings,
            client: Client::new(),
        }
    }

    fn credentials(&self) -> Result<(&str, String), Unavailable> {
        let endpoint = self
            .settings
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| Unavailable::new("no remote endpoint configured"))?;
        let token = std::env::var(&self.settings.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Unavailable::new(format!("{} is not set", self.settings.token_env)))?;
        Ok((endpoint, token))
    }
}

#[async_trait::async_trait]
impl RenderBackend for RemoteApiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::RemoteApi
    }

    async fn check_available(&self) -> Result<(), Unavailable> {
        self.credentials().map(|_| ())
    }

    async fn render(&self, request: &RenderRequest<'_>) -> Result<PathBuf, RenderError> {
        let (endpoint, token) = self.credentials()?;
        let body = serde_json::json!({
            "quality": request.quality.as_str(),
            "timelinePlan": request.plan,
        });

        tracing::info!(endpoint, "Submitting timeline plan to remote renderer");
        let resp = self
            .client
            .post(endpoint)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RenderError::failed(format!("Remote render request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(RenderError::failed(format!(
                "Remote renderer returned {status}: {}",
                text.chars().take(500).collect::<String>()
            )));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| RenderError::failed(format!("Failed to download rendered video: {e}")))?;
        if bytes.is_empty() {
            return Err(RenderError::failed("Remote renderer returned an empty body"));
        }

        let output_path = request.output_dir.join(&self.settings.output_file_name);
        tokio::fs::create_dir_all(request.output_dir)
            .await
            .map_err(|e| RenderError::failed(format!("Failed to create output directory: {e}")))?;
        tokio::fs::write(&output_path, &bytes).await.map_err(|e| {
            RenderError::failed(format!("Failed to write {}: {e}", output_path.display()))
        })?;
        tracing::info!(
            output = %output_path.display(),
            bytes = bytes.len(),
            "Downloaded remote render"
        );
        Ok(output_path)
    }
}
