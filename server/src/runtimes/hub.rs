//! HuggingFace model lookup
//!
//! Resolves repository metadata (GGUF files, parameter count, architecture)
//! from the public HuggingFace API, with a short-lived in-memory cache so
//! repeated lookups while filling in a deploy form stay cheap.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::debug;

use crate::errors::DashboardError;
use crate::models::catalog::{GgufFile, ModelLookup};
use crate::utils::format_params;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(8);

/// Known quantization bit widths by tag prefix
const QUANT_BITS: &[(&str, u32)] = &[
    ("IQ1", 1),
    ("IQ2", 2),
    ("IQ3", 3),
    ("IQ4", 4),
    ("Q2", 2),
    ("Q3", 3),
    ("Q4", 4),
    ("Q5", 5),
    ("Q6", 6),
    ("Q8", 8),
    ("F16", 16),
    ("F32", 32),
];

struct CacheEntry {
    data: ModelLookup,
    cached_at: Instant,
}

/// Client for the HuggingFace model API with a TTL cache
pub struct HubClient {
    http: reqwest::Client,
    base_url: String,
    cache: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

#[derive(Debug, Deserialize)]
struct RawRepo {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    pipeline_tag: Option<String>,
    #[serde(default)]
    siblings: Vec<RawSibling>,
    #[serde(default)]
    safetensors: Option<RawSafetensors>,
    #[serde(default)]
    gguf: Option<RawGguf>,
    #[serde(default)]
    config: Option<RawConfig>,
    #[serde(default, rename = "cardData")]
    card_data: Option<RawCardData>,
    #[serde(default)]
    downloads: u64,
    #[serde(default)]
    likes: u64,
    #[serde(default, rename = "lastModified")]
    last_modified: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawSibling {
    rfilename: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    lfs: Option<RawLfs>,
}

#[derive(Debug, Deserialize)]
struct RawLfs {
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawSafetensors {
    #[serde(default)]
    parameters: Option<HashMap<String, u64>>,
}

#[derive(Debug, Deserialize)]
struct RawGguf {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    architecture: Option<String>,
    #[serde(default)]
    context_length: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    architectures: Option<Vec<String>>,
    #[serde(default)]
    model_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCardData {
    #[serde(default)]
    license: Option<serde_json::Value>,
}

impl HubClient {
    pub fn new(base_url: impl Into<String>, ttl: Duration) -> Result<Self, DashboardError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(DashboardError::HttpError)?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            cache: RwLock::new(HashMap::new()),
            ttl,
        })
    }

    /// Look up repository metadata, serving from cache within the TTL.
    pub async fn lookup(&self, repo: &str) -> Result<ModelLookup, DashboardError> {
        if let Some(data) = self.cached(repo) {
            debug!("Lookup cache hit for {}", repo);
            return Ok(data);
        }

        let response = self
            .http
            .get(format!("{}/api/models/{}", self.base_url, repo))
            .timeout(LOOKUP_TIMEOUT)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = if status == 404 {
                format!("Model \"{}\" not found on HuggingFace", repo)
            } else {
                format!("HuggingFace API error ({})", status)
            };
            return Err(DashboardError::Upstream { status, message });
        }

        let raw: RawRepo = response.json().await?;
        let data = build_lookup(repo, raw);

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        cache.insert(
            repo.to_string(),
            CacheEntry {
                data: data.clone(),
                cached_at: Instant::now(),
            },
        );

        Ok(data)
    }

    fn cached(&self, repo: &str) -> Option<ModelLookup> {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        let entry = cache.get(repo)?;
        if entry.cached_at.elapsed() < self.ttl {
            Some(entry.data.clone())
        } else {
            None
        }
    }
}

fn build_lookup(repo: &str, raw: RawRepo) -> ModelLookup {
    let mut gguf_files: Vec<GgufFile> = raw
        .siblings
        .iter()
        .filter(|s| s.rfilename.to_ascii_lowercase().ends_with(".gguf"))
        .map(|s| {
            let quant = parse_quant_from_filename(&s.rfilename);
            let bits = quant.as_deref().map(parse_bits).unwrap_or(0);
            GgufFile {
                filename: s.rfilename.clone(),
                quantization: quant.unwrap_or_else(|| s.rfilename.clone()),
                size_bytes: s.lfs.as_ref().and_then(|l| l.size).or(s.size).unwrap_or(0),
                bits,
            }
        })
        .collect();
    gguf_files.sort_by(|a, b| a.bits.cmp(&b.bits).then(a.size_bytes.cmp(&b.size_bytes)));

    let parameters = raw
        .safetensors
        .as_ref()
        .and_then(|s| s.parameters.as_ref())
        .and_then(|params| {
            params
                .get("F16")
                .or_else(|| params.get("BF16"))
                .or_else(|| params.values().next())
                .copied()
        })
        .or_else(|| raw.gguf.as_ref().and_then(|g| g.total));

    let architecture = raw
        .config
        .as_ref()
        .and_then(|c| c.architectures.as_ref().and_then(|a| a.first().cloned()))
        .or_else(|| raw.config.as_ref().and_then(|c| c.model_type.clone()))
        .or_else(|| raw.gguf.as_ref().and_then(|g| g.architecture.clone()));

    let license = raw
        .card_data
        .as_ref()
        .and_then(|c| c.license.as_ref())
        .and_then(|v| v.as_str().map(str::to_string));

    ModelLookup {
        id: raw.id.unwrap_or_else(|| repo.to_string()),
        author: raw
            .author
            .unwrap_or_else(|| repo.split('/').next().unwrap_or(repo).to_string()),
        pipeline: raw.pipeline_tag.unwrap_or_else(|| "unknown".to_string()),
        architecture,
        parameters_formatted: parameters.map(format_params),
        parameters,
        context_length: raw.gguf.as_ref().and_then(|g| g.context_length),
        license,
        downloads: raw.downloads,
        likes: raw.likes,
        last_modified: raw.last_modified,
        tags: raw.tags,
        has_gguf: !gguf_files.is_empty(),
        gguf_files,
    }
}

/// Extract the quantization tag from a GGUF filename, e.g.
/// `model.Q4_K_M.gguf` or `model-IQ2_XS.gguf`.
pub fn parse_quant_from_filename(filename: &str) -> Option<String> {
    if !filename.to_ascii_lowercase().ends_with(".gguf") {
        return None;
    }
    let stem = &filename[..filename.len() - ".gguf".len()];
    let sep = stem.rfind(['.', '-'])?;
    let token = &stem[sep + 1..];

    let upper = token.to_ascii_uppercase();
    let body = upper
        .strip_prefix("IQ")
        .or_else(|| upper.strip_prefix('Q'))
        .or_else(|| upper.strip_prefix('F'))?;
    let mut chars = body.chars();
    if !chars.next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some(token.to_string())
}

/// Bit width for a quantization tag, 0 when unknown.
pub fn parse_bits(quant: &str) -> u32 {
    let prefix = quant.split('_').next().unwrap_or(quant).to_ascii_uppercase();
    QUANT_BITS
        .iter()
        .find(|(tag, _)| *tag == prefix)
        .map(|(_, bits)| *bits)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quant_from_filename() {
        assert_eq!(
            parse_quant_from_filename("tinyllama-1.1b.Q4_K_M.gguf"),
            Some("Q4_K_M".to_string())
        );
        assert_eq!(
            parse_quant_from_filename("mistral-7b-Q8_0.gguf"),
            Some("Q8_0".to_string())
        );
        assert_eq!(
            parse_quant_from_filename("model-IQ2_XS.gguf"),
            Some("IQ2_XS".to_string())
        );
        assert_eq!(
            parse_quant_from_filename("model.F16.gguf"),
            Some("F16".to_string())
        );
        assert_eq!(
            parse_quant_from_filename("model.q5_k_m.GGUF"),
            Some("q5_k_m".to_string())
        );
    }

    #[test]
    fn test_parse_quant_rejects_non_quant_names() {
        assert_eq!(parse_quant_from_filename("model.gguf"), None);
        assert_eq!(parse_quant_from_filename("readme.md"), None);
        assert_eq!(parse_quant_from_filename("model-chat.gguf"), None);
        assert_eq!(parse_quant_from_filename("model.v2.gguf"), None);
    }

    #[test]
    fn test_parse_bits() {
        assert_eq!(parse_bits("Q4_K_M"), 4);
        assert_eq!(parse_bits("Q8_0"), 8);
        assert_eq!(parse_bits("IQ2_XS"), 2);
        assert_eq!(parse_bits("F16"), 16);
        assert_eq!(parse_bits("Z9"), 0);
    }

    #[test]
    fn test_build_lookup_sorts_and_formats() {
        let raw: RawRepo = serde_json::from_value(serde_json::json!({
            "id": "org/model",
            "author": "org",
            "pipeline_tag": "text-generation",
            "siblings": [
                { "rfilename": "model.Q8_0.gguf", "lfs": { "size": 8_000_000_000u64 } },
                { "rfilename": "model.Q4_K_M.gguf", "size": 4_000_000_000u64 },
                { "rfilename": "config.json" }
            ],
            "gguf": { "total": 7_000_000_000u64, "architecture": "llama", "context_length": 4096 },
            "downloads": 10, "likes": 2, "tags": ["gguf"]
        }))
        .unwrap();

        let lookup = build_lookup("org/model", raw);
        assert!(lookup.has_gguf);
        assert_eq!(lookup.gguf_files.len(), 2);
        assert_eq!(lookup.gguf_files[0].quantization, "Q4_K_M");
        assert_eq!(lookup.gguf_files[1].quantization, "Q8_0");
        assert_eq!(lookup.parameters, Some(7_000_000_000));
        assert_eq!(lookup.parameters_formatted.as_deref(), Some("7.0B"));
        assert_eq!(lookup.architecture.as_deref(), Some("llama"));
        assert_eq!(lookup.context_length, Some(4096));
    }

    #[test]
    fn test_build_lookup_prefers_safetensors_f16() {
        let raw: RawRepo = serde_json::from_value(serde_json::json!({
            "safetensors": { "parameters": { "F16": 1_100_000_000u64, "I8": 5u64 } },
            "gguf": { "total": 9u64 }
        }))
        .unwrap();
        let lookup = build_lookup("org/model", raw);
        assert_eq!(lookup.parameters, Some(1_100_000_000));
        assert_eq!(lookup.author, "org");
        assert_eq!(lookup.id, "org/model");
        assert_eq!(lookup.pipeline, "unknown");
    }
}
