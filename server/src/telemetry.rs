//! Host telemetry collection
//!
//! CPU, memory, and host facts come from sysinfo; GPU facts come from an
//! nvidia-smi CSV query so the dashboard works on hosts without the NVIDIA
//! userspace libraries loaded into this process.

use std::time::Duration;

use sysinfo::System;
use tokio::process::Command;
use tracing::debug;

use crate::models::catalog::{GpuInfo, SystemInfo};
use crate::utils::format_gb;

const NVIDIA_SMI_TIMEOUT: Duration = Duration::from_secs(5);

/// Collect host facts for the system page. GPU detection runs a child
/// process and is therefore async.
pub async fn collect_system_info() -> SystemInfo {
    let mut sys = System::new_all();
    sys.refresh_all();

    let cpu_cores = sys.cpus().len().max(1);
    let cpu = sys
        .cpus()
        .first()
        .map(|c| c.brand().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    // 1-minute load average scaled by core count into a percentage
    let load = System::load_average().one;
    let cpu_load = ((load / cpu_cores as f64) * 100.0).round().clamp(0.0, 100.0) as u32;

    let ram_total_bytes = sys.total_memory();
    let ram_available_bytes = sys.available_memory();
    let ram_used_bytes = ram_total_bytes.saturating_sub(ram_available_bytes);

    let os = System::long_os_version()
        .or_else(System::name)
        .unwrap_or_else(|| std::env::consts::OS.to_string());

    let gpu = detect_gpu().await;

    SystemInfo {
        os,
        arch: std::env::consts::ARCH.to_string(),
        cpu,
        cpu_cores,
        cpu_load,
        ram_total: format_gb(ram_total_bytes),
        ram_total_bytes,
        ram_available: format_gb(ram_available_bytes),
        ram_available_bytes,
        ram_used: format_gb(ram_used_bytes),
        ram_used_bytes,
        hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
        gpu,
        vllm_kv_cache_percent: None,
    }
}

/// Query nvidia-smi for the first GPU's facts; `None` when the tool is
/// missing, times out, or reports nothing.
pub async fn detect_gpu() -> Option<GpuInfo> {
    let output = tokio::time::timeout(
        NVIDIA_SMI_TIMEOUT,
        Command::new("nvidia-smi")
            .args([
                "--query-gpu=name,memory.total,memory.used,memory.free,utilization.gpu,temperature.gpu",
                "--format=csv,noheader,nounits",
            ])
            .output(),
    )
    .await
    .ok()?
    .ok()?;

    if !output.status.success() {
        debug!("nvidia-smi exited with {}", output.status);
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_gpu_csv(&stdout)
}

fn parse_gpu_csv(csv: &str) -> Option<GpuInfo> {
    let line = csv.lines().next()?.trim();
    if line.is_empty() {
        return None;
    }
    let parts: Vec<&str> = line.split(',').map(str::trim).collect();
    if parts.len() < 6 {
        return None;
    }

    let num = |s: &str| s.parse::<f64>().unwrap_or(0.0);
    Some(GpuInfo {
        name: parts[0].to_string(),
        vram_total_mb: num(parts[1]),
        vram_used_mb: num(parts[2]),
        vram_free_mb: num(parts[3]),
        utilization: num(parts[4]),
        temperature: num(parts[5]),
    })
}
