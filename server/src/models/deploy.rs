//! Deployment models

use serde::{Deserialize, Serialize};

/// Which runtime a deployment targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployBackend {
    Cpu,
    Gpu,
}

impl DeployBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployBackend::Cpu => "cpu",
            DeployBackend::Gpu => "gpu",
        }
    }
}

/// Run mode for CPU deployments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Background,
    Foreground,
}

impl RunMode {
    /// The flag form passed to the deployment script
    pub fn flag(&self) -> &'static str {
        match self {
            RunMode::Background => "--background",
            RunMode::Foreground => "--foreground",
        }
    }
}

/// Known GGUF quantization tags accepted for CPU deployments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantization {
    #[serde(rename = "Q2_K")]
    Q2K,
    #[serde(rename = "Q3_K_M")]
    Q3KM,
    #[serde(rename = "Q4_0")]
    Q40,
    #[serde(rename = "Q4_K_M")]
    Q4KM,
    #[serde(rename = "Q5_K_M")]
    Q5KM,
    #[serde(rename = "Q6_K")]
    Q6K,
    #[serde(rename = "Q8_0")]
    Q80,
}

impl Quantization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quantization::Q2K => "Q2_K",
            Quantization::Q3KM => "Q3_K_M",
            Quantization::Q40 => "Q4_0",
            Quantization::Q4KM => "Q4_K_M",
            Quantization::Q5KM => "Q5_K_M",
            Quantization::Q6K => "Q6_K",
            Quantization::Q80 => "Q8_0",
        }
    }
}

impl std::str::FromStr for Quantization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Q2_K" => Ok(Quantization::Q2K),
            "Q3_K_M" => Ok(Quantization::Q3KM),
            "Q4_0" => Ok(Quantization::Q40),
            "Q4_K_M" => Ok(Quantization::Q4KM),
            "Q5_K_M" => Ok(Quantization::Q5KM),
            "Q6_K" => Ok(Quantization::Q6K),
            "Q8_0" => Ok(Quantization::Q80),
            _ => Err(format!("Unknown quantization tag: {}", s)),
        }
    }
}

/// Deployment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployStatus {
    Running,
    Completed,
    Failed,
}

impl DeployStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeployStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStatus::Running => "running",
            DeployStatus::Completed => "completed",
            DeployStatus::Failed => "failed",
        }
    }
}

/// Which stream a captured log line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    Stdout,
    Stderr,
    /// Synthetic lines appended by the registry (summary, spawn errors)
    System,
}

/// One captured line of deployment output
#[derive(Debug, Clone)]
pub struct LogLine {
    pub text: String,
    pub source: LogSource,
}

/// Raw deploy request body, validated into [`DeployParams`]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    pub mode: Option<String>,
    pub model: Option<String>,
    pub quantization: Option<String>,
    pub run_mode: Option<String>,
    pub gpu_slot: Option<i64>,
}

/// A fully validated deploy request
#[derive(Debug, Clone)]
pub struct DeployParams {
    pub backend: DeployBackend,
    pub model: String,
    pub quantization: Option<Quantization>,
    pub run_mode: RunMode,
    pub gpu_slot: Option<u8>,
}

/// Response body for an accepted deploy request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployStarted {
    pub deploy_id: String,
    pub status: String,
    pub message: String,
}

/// Request body for relaying input to a deployment's stdin
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StdinRequest {
    pub deploy_id: Option<String>,
    pub input: Option<String>,
}

/// Event kind on the deployment event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployEventKind {
    Status,
    Output,
    Error,
    Complete,
}

/// One event on the deployment event stream
#[derive(Debug, Clone, Serialize)]
pub struct DeployEvent {
    #[serde(rename = "type")]
    pub kind: DeployEventKind,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl DeployEvent {
    pub fn status(data: impl Into<String>) -> Self {
        Self {
            kind: DeployEventKind::Status,
            data: data.into(),
            timestamp: None,
        }
    }

    pub fn line(kind: DeployEventKind, data: String, timestamp: i64) -> Self {
        Self {
            kind,
            data,
            timestamp: Some(timestamp),
        }
    }

    pub fn complete(status: DeployStatus, timestamp: i64) -> Self {
        Self {
            kind: DeployEventKind::Complete,
            data: status.as_str().to_string(),
            timestamp: Some(timestamp),
        }
    }
}
