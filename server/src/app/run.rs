//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::deploy::registry::{DeployRegistry, RegistryOptions};
use crate::errors::DashboardError;
use crate::runtimes::hub::HubClient;
use crate::runtimes::ollama::OllamaClient;
use crate::runtimes::vllm::VllmClient;
use crate::server::serve::serve;
use crate::server::state::ServerState;

/// Run the dashboard backend until the shutdown signal resolves
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DashboardError> {
    info!("Initializing dashboard backend...");

    let state = init_state(&options)?;
    let handle = serve(&options.server, state, shutdown_signal).await?;

    match handle.await {
        Ok(result) => result,
        Err(e) => Err(DashboardError::ServerError(e.to_string())),
    }
}

fn init_state(options: &AppOptions) -> Result<Arc<ServerState>, DashboardError> {
    let registry = Arc::new(DeployRegistry::new(RegistryOptions {
        cleanup_grace: options.deploy.cleanup_grace,
    }));
    let ollama = Arc::new(OllamaClient::new(options.runtimes.ollama_base_url.clone())?);
    let vllm = Arc::new(VllmClient::new(options.runtimes.vllm_ports)?);
    let hub = Arc::new(HubClient::new(
        options.runtimes.hub_base_url.clone(),
        options.runtimes.lookup_cache_ttl,
    )?);

    Ok(Arc::new(ServerState::new(
        registry,
        options.deploy.script_root.clone(),
        ollama,
        vllm,
        hub,
    )))
}
