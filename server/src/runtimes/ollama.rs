//! Ollama daemon client
//!
//! Covers the handful of daemon endpoints the dashboard uses: model listing
//! (tags + ps), details, deletion, load/unload via keep_alive, a streaming
//! chat proxy, and a liveness probe.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::errors::DashboardError;
use crate::models::catalog::{ChatMessage, ModelDetails, ModelSummary, ServiceHealth};
use crate::utils::format_size;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
const LIST_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a local Ollama daemon
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<RawModel>,
}

#[derive(Debug, Deserialize)]
struct RawModel {
    name: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    modified_at: Option<String>,
    #[serde(default)]
    digest: Option<String>,
    #[serde(default)]
    details: Option<RawModelDetails>,
}

#[derive(Debug, Deserialize)]
struct RawModelDetails {
    #[serde(default)]
    family: Option<String>,
    #[serde(default)]
    parameter_size: Option<String>,
    #[serde(default)]
    quantization_level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShowResponse {
    #[serde(default)]
    details: Option<RawModelDetails>,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DashboardError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(DashboardError::HttpError)?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat_api_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }

    fn openai_api_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn port(&self) -> u16 {
        self.base_url
            .rsplit(':')
            .next()
            .and_then(|p| p.parse().ok())
            .unwrap_or(11434)
    }

    /// List installed models, tagging the ones currently loaded.
    ///
    /// A daemon that is down yields an empty list rather than an error;
    /// the dashboard treats that the same as "no models".
    pub async fn list_models(&self) -> Vec<ModelSummary> {
        let tags = match self.fetch_tags().await {
            Ok(tags) => tags,
            Err(e) => {
                debug!("Ollama tags unavailable: {}", e);
                return Vec::new();
            }
        };

        let running = self.fetch_running().await.unwrap_or_default();

        tags.models
            .into_iter()
            .map(|m| {
                let is_running = running.iter().any(|r| {
                    r == &m.name
                        || r.split(':')
                            .next()
                            .map(|base| m.name.starts_with(base))
                            .unwrap_or(false)
                });
                let display_name = m.name.split(':').next().unwrap_or(&m.name).to_string();
                ModelSummary {
                    display_name,
                    model_type: "cpu".to_string(),
                    status: if is_running { "running" } else { "stopped" }.to_string(),
                    size: m.size.map(format_size),
                    quantization: m.details.and_then(|d| d.quantization_level),
                    port: self.port(),
                    api_url: self.chat_api_url(),
                    api_url_openai: self.openai_api_url(),
                    modified_at: m.modified_at,
                    digest: m.digest,
                    name: m.name,
                }
            })
            .collect()
    }

    async fn fetch_tags(&self) -> Result<TagsResponse, DashboardError> {
        let response = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .timeout(LIST_TIMEOUT)
            .send()
            .await?;
        Ok(response.error_for_status()?.json().await?)
    }

    async fn fetch_running(&self) -> Result<Vec<String>, DashboardError> {
        let response = self
            .http
            .get(format!("{}/api/ps", self.base_url))
            .timeout(LIST_TIMEOUT)
            .send()
            .await?;
        let tags: TagsResponse = response.error_for_status()?.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Fetch details for one installed model.
    pub async fn show_model(&self, name: &str) -> Result<ModelDetails, DashboardError> {
        let response = self
            .http
            .post(format!("{}/api/show", self.base_url))
            .timeout(LIST_TIMEOUT)
            .json(&json!({ "name": name }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DashboardError::Upstream {
                status: 404,
                message: format!("Model \"{}\" not found", name),
            });
        }

        let show: ShowResponse = response.json().await?;
        let details = show.details.unwrap_or(RawModelDetails {
            family: None,
            parameter_size: None,
            quantization_level: None,
        });

        Ok(ModelDetails {
            name: name.to_string(),
            model_type: "cpu".to_string(),
            // The show endpoint does not report load state
            status: "stopped".to_string(),
            port: self.port(),
            api_url: self.chat_api_url(),
            api_url_openai: self.openai_api_url(),
            family: details.family,
            parameter_size: details.parameter_size,
            quantization: details.quantization_level,
        })
    }

    /// Delete an installed model.
    pub async fn delete_model(&self, name: &str) -> Result<(), DashboardError> {
        let response = self
            .http
            .delete(format!("{}/api/delete", self.base_url))
            .json(&json!({ "name": name }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DashboardError::Upstream {
                status,
                message: format!("Failed to delete model: {}", text),
            });
        }
        Ok(())
    }

    /// Load a model into memory by issuing an empty chat with a keep-alive.
    pub async fn start_model(&self, name: &str) -> Result<(), DashboardError> {
        self.keep_alive(name, json!("10m"), "start").await
    }

    /// Unload a model by setting its keep-alive to zero.
    pub async fn stop_model(&self, name: &str) -> Result<(), DashboardError> {
        self.keep_alive(name, json!(0), "stop").await
    }

    async fn keep_alive(
        &self,
        name: &str,
        keep_alive: serde_json::Value,
        action: &str,
    ) -> Result<(), DashboardError> {
        let response = self
            .http
            .post(self.chat_api_url())
            .json(&json!({
                "model": name,
                "messages": [],
                "keep_alive": keep_alive,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DashboardError::Upstream {
                status,
                message: format!("Failed to {} model: {}", action, text),
            });
        }
        Ok(())
    }

    /// Open a streaming chat with the daemon; the caller consumes the
    /// NDJSON body.
    pub async fn chat_stream(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<reqwest::Response, DashboardError> {
        let response = self
            .http
            .post(self.chat_api_url())
            .json(&json!({
                "model": model,
                "messages": messages,
                "stream": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DashboardError::Upstream {
                status,
                message: format!("Ollama error: {}", text),
            });
        }
        Ok(response)
    }

    /// Probe the daemon root for liveness.
    pub async fn probe(&self) -> ServiceHealth {
        match self
            .http
            .get(&self.base_url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                let version = response
                    .text()
                    .await
                    .ok()
                    .filter(|t| t.contains("Ollama"))
                    .map(|t| t.trim().to_string());
                ServiceHealth {
                    status: "healthy".to_string(),
                    version,
                    message: Some("Ollama is running".to_string()),
                    url: self.base_url.clone(),
                }
            }
            Ok(response) => ServiceHealth {
                status: "unhealthy".to_string(),
                version: None,
                message: Some(format!("Ollama returned {}", response.status().as_u16())),
                url: self.base_url.clone(),
            },
            Err(e) => {
                let message = if e.is_timeout() {
                    "Ollama connection timed out".to_string()
                } else {
                    "Ollama is not running".to_string()
                };
                ServiceHealth {
                    status: "unhealthy".to_string(),
                    version: None,
                    message: Some(message),
                    url: self.base_url.clone(),
                }
            }
        }
    }
}
