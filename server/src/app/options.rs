//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

/// Main application options
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Server configuration
    pub server: ServerOptions,

    /// Deployment pipeline configuration
    pub deploy: DeployOptions,

    /// Runtime endpoints configuration
    pub runtimes: RuntimeOptions,
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8103,
        }
    }
}

/// Deployment pipeline options
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Directory containing the deployment scripts; also the working
    /// directory the scripts run in
    pub script_root: PathBuf,

    /// How long a finished deployment stays queryable before removal
    pub cleanup_grace: Duration,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            script_root: PathBuf::from(".."),
            cleanup_grace: Duration::from_secs(60),
        }
    }
}

/// Endpoints of the runtimes and registries the dashboard talks to
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// Ollama daemon base URL
    pub ollama_base_url: String,

    /// vLLM ports, one per GPU slot
    pub vllm_ports: [u16; 2],

    /// HuggingFace API base URL
    pub hub_base_url: String,

    /// TTL for cached model lookups
    pub lookup_cache_ttl: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            ollama_base_url: "http://localhost:11434".to_string(),
            vllm_ports: [8104, 8105],
            hub_base_url: "https://huggingface.co".to_string(),
            lookup_cache_ttl: Duration::from_secs(300), // 5 minutes
        }
    }
}
