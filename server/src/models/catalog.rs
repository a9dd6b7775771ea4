//! Model catalog, runtime health, and system info models

use serde::{Deserialize, Serialize};

/// A locally installed model, as shown in the dashboard list
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub name: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub model_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantization: Option<String>,
    pub port: u16,
    pub api_url: String,
    #[serde(rename = "apiUrlOpenAI")]
    pub api_url_openai: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Details for a single installed model
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDetails {
    pub name: String,
    #[serde(rename = "type")]
    pub model_type: String,
    pub status: String,
    pub port: u16,
    pub api_url: String,
    #[serde(rename = "apiUrlOpenAI")]
    pub api_url_openai: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantization: Option<String>,
}

/// Health probe result for one runtime service
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub url: String,
}

/// Combined health report across both runtimes
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub ollama: ServiceHealth,
    pub vllm: ServiceHealth,
}

/// NVIDIA GPU facts from nvidia-smi
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuInfo {
    pub name: String,
    #[serde(rename = "vramTotalMB")]
    pub vram_total_mb: f64,
    #[serde(rename = "vramUsedMB")]
    pub vram_used_mb: f64,
    #[serde(rename = "vramFreeMB")]
    pub vram_free_mb: f64,
    pub utilization: f64,
    pub temperature: f64,
}

/// Host system facts for the dashboard system page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub cpu: String,
    pub cpu_cores: usize,
    pub cpu_load: u32,
    pub ram_total: String,
    pub ram_total_bytes: u64,
    pub ram_available: String,
    pub ram_available_bytes: u64,
    pub ram_used: String,
    pub ram_used_bytes: u64,
    pub hostname: String,
    pub gpu: Option<GpuInfo>,
    pub vllm_kv_cache_percent: Option<f64>,
}

/// One GGUF file in a HuggingFace repository
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GgufFile {
    pub filename: String,
    pub quantization: String,
    pub size_bytes: u64,
    pub bits: u32,
}

/// Remote model metadata resolved from HuggingFace
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelLookup {
    pub id: String,
    pub author: String,
    pub pipeline: String,
    pub architecture: Option<String>,
    pub parameters: Option<u64>,
    pub parameters_formatted: Option<String>,
    pub context_length: Option<u64>,
    pub license: Option<String>,
    pub downloads: u64,
    pub likes: u64,
    pub last_modified: Option<String>,
    pub tags: Vec<String>,
    pub has_gguf: bool,
    pub gguf_files: Vec<GgufFile>,
}

/// One turn of a chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Raw chat request body, validated before proxying
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub model: Option<String>,
    pub mode: Option<String>,
    pub api_url: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
}

/// One chunk of the proxied chat stream
#[derive(Debug, Clone, Serialize)]
pub struct ChatChunk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatChunk {
    pub fn content(content: String, done: bool) -> Self {
        Self {
            content: Some(content),
            done,
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            content: None,
            done: true,
            error: Some(message),
        }
    }
}
