//! Modelboard - Entry Point
//!
//! Local HTTP backend for the self-hosted LLM dashboard. Manages CPU
//! deployments through an Ollama daemon and GPU deployments through vLLM.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use modelboard::app::options::AppOptions;
use modelboard::app::run::run;
use modelboard::logs::{init_logging, LogOptions};
use modelboard::utils::version_info;

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(_) => println!("{}", version.version),
        }
        return;
    }

    // Initialize logging
    let log_options = LogOptions {
        log_level: cli_args
            .get("log-level")
            .and_then(|l| l.parse().ok())
            .unwrap_or_default(),
        ..Default::default()
    };
    if let Err(e) = init_logging(log_options) {
        println!("Failed to initialize logging: {e}");
    }

    // Build options from CLI overrides
    let mut options = AppOptions::default();
    if let Some(host) = cli_args.get("host") {
        options.server.host = host.clone();
    }
    if let Some(port) = cli_args.get("port").and_then(|p| p.parse().ok()) {
        options.server.port = port;
    }
    if let Some(root) = cli_args.get("script-root") {
        options.deploy.script_root = PathBuf::from(root);
    }
    if let Some(grace) = cli_args.get("cleanup-grace").and_then(|g| g.parse().ok()) {
        options.deploy.cleanup_grace = Duration::from_secs(grace);
    }
    if let Some(url) = cli_args.get("ollama-url") {
        options.runtimes.ollama_base_url = url.clone();
    }

    info!("Running Modelboard {} with options: {:?}", version.version, options);
    let result = run(options, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Failed to run the server: {e}");
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to register SIGTERM handler: {e}");
                return;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to register SIGINT handler: {e}");
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, shutting down...");
        }
    }
}
