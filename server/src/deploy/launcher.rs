//! Deployment script invocation
//!
//! Translates a validated deploy request into the exact command line for the
//! CPU or GPU deployment script, and spawns it with piped stdio.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::errors::DashboardError;
use crate::models::deploy::{DeployBackend, DeployParams};

/// CPU deployment script, relative to the script root
const CPU_SCRIPT: &str = "deploy_cpu.sh";

/// GPU deployment script, relative to the script root
const GPU_SCRIPT: &str = "deploy_model.sh";

/// A fully resolved command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

/// Build the command line for a validated deploy request.
///
/// The cpu path passes the model, a run-mode flag, and a `--quant <TAG>`
/// pair only when quantization was requested. The gpu path passes the model
/// and the slot index positionally.
pub fn build_launch_spec(script_root: &Path, params: &DeployParams) -> LaunchSpec {
    let mut args = Vec::new();

    match params.backend {
        DeployBackend::Cpu => {
            args.push(script_root.join(CPU_SCRIPT).display().to_string());
            args.push(params.model.clone());
            args.push(params.run_mode.flag().to_string());
            if let Some(quant) = params.quantization {
                args.push("--quant".to_string());
                args.push(quant.as_str().to_string());
            }
        }
        DeployBackend::Gpu => {
            args.push(script_root.join(GPU_SCRIPT).display().to_string());
            args.push(params.model.clone());
            args.push(params.gpu_slot.unwrap_or(0).to_string());
        }
    }

    LaunchSpec {
        program: "bash".to_string(),
        args,
        cwd: script_root.to_path_buf(),
    }
}

/// Spawn the deployment process with stdin/stdout/stderr piped.
///
/// Does not block; the caller owns the returned child and its streams.
pub fn spawn(spec: &LaunchSpec) -> Result<Child, DashboardError> {
    Command::new(&spec.program)
        .args(&spec.args)
        .current_dir(&spec.cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| DashboardError::SpawnError(e.to_string()))
}
