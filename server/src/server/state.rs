//! Server state

use std::path::PathBuf;
use std::sync::Arc;

use crate::deploy::registry::DeployRegistry;
use crate::runtimes::hub::HubClient;
use crate::runtimes::ollama::OllamaClient;
use crate::runtimes::vllm::VllmClient;

/// Server state shared across handlers
pub struct ServerState {
    pub registry: Arc<DeployRegistry>,
    pub script_root: PathBuf,
    pub ollama: Arc<OllamaClient>,
    pub vllm: Arc<VllmClient>,
    pub hub: Arc<HubClient>,
}

impl ServerState {
    pub fn new(
        registry: Arc<DeployRegistry>,
        script_root: PathBuf,
        ollama: Arc<OllamaClient>,
        vllm: Arc<VllmClient>,
        hub: Arc<HubClient>,
    ) -> Self {
        Self {
            registry,
            script_root,
            ollama,
            vllm,
            hub,
        }
    }
}
