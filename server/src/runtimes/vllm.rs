//! vLLM daemon client
//!
//! The dashboard runs up to two vLLM instances, one per GPU slot, on fixed
//! local ports. This client probes their health endpoints and scrapes the
//! KV-cache gauge from the Prometheus metrics page.

use std::time::Duration;

use tracing::debug;

use crate::errors::DashboardError;
use crate::models::catalog::ServiceHealth;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
const METRICS_TIMEOUT: Duration = Duration::from_secs(2);

/// Prometheus gauge name for KV cache usage (0..1)
const KV_CACHE_METRIC: &str = "vllm:kv_cache_usage_perc";

/// Client for the per-slot vLLM daemons
pub struct VllmClient {
    http: reqwest::Client,
    ports: [u16; 2],
}

impl VllmClient {
    pub fn new(ports: [u16; 2]) -> Result<Self, DashboardError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(DashboardError::HttpError)?;
        Ok(Self { http, ports })
    }

    pub fn base_url(&self, slot: usize) -> String {
        let port = self.ports.get(slot).copied().unwrap_or(self.ports[0]);
        format!("http://localhost:{}", port)
    }

    pub fn slots(&self) -> usize {
        self.ports.len()
    }

    /// Probe one slot's /health endpoint.
    pub async fn probe(&self, slot: usize) -> ServiceHealth {
        let base = self.base_url(slot);
        let url = format!("{}/health", base);
        let name = format!("vLLM GPU {}", slot);

        match self.http.get(&url).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) if response.status().is_success() => ServiceHealth {
                status: "healthy".to_string(),
                version: None,
                message: Some(format!("{} is running", name)),
                url,
            },
            Ok(response) => ServiceHealth {
                status: "unhealthy".to_string(),
                version: None,
                message: Some(format!("{} returned {}", name, response.status().as_u16())),
                url,
            },
            Err(e) => {
                let message = if e.is_timeout() {
                    format!("{} connection timed out", name)
                } else {
                    format!("{} is not running", name)
                };
                ServiceHealth {
                    status: "unhealthy".to_string(),
                    version: None,
                    message: Some(message),
                    url,
                }
            }
        }
    }

    /// Probe every slot and report the first healthy one, or a summary
    /// failure when none responds.
    pub async fn probe_any(&self) -> ServiceHealth {
        for slot in 0..self.slots() {
            let health = self.probe(slot).await;
            if health.status == "healthy" {
                return health;
            }
        }
        ServiceHealth {
            status: "unhealthy".to_string(),
            version: None,
            message: Some("No vLLM instances running".to_string()),
            url: self.base_url(0),
        }
    }

    /// Scrape the KV cache usage gauge from slot 0's metrics page.
    pub async fn kv_cache_usage(&self) -> Option<f64> {
        let url = format!("{}/metrics", self.base_url(0));
        let response = self
            .http
            .get(&url)
            .timeout(METRICS_TIMEOUT)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let body = response.text().await.ok()?;
        let value = parse_metric(&body, KV_CACHE_METRIC);
        if value.is_none() {
            debug!("Metric {} not found in vLLM metrics page", KV_CACHE_METRIC);
        }
        value
    }
}

/// Extract a plain gauge value from Prometheus exposition text.
fn parse_metric(body: &str, name: &str) -> Option<f64> {
    for line in body.lines() {
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix(name) {
            let rest = rest.trim_start();
            // Skip labeled series; the gauge is exported bare
            if rest.starts_with('{') {
                continue;
            }
            if let Ok(value) = rest.split_whitespace().next().unwrap_or("").parse::<f64>() {
                return Some(value);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metric() {
        let body = "\
# HELP vllm:kv_cache_usage_perc KV cache usage\n\
# TYPE vllm:kv_cache_usage_perc gauge\n\
vllm:num_requests_running 2\n\
vllm:kv_cache_usage_perc 0.42\n";
        assert_eq!(parse_metric(body, KV_CACHE_METRIC), Some(0.42));
    }

    #[test]
    fn test_parse_metric_missing() {
        assert_eq!(parse_metric("up 1\n", KV_CACHE_METRIC), None);
        assert_eq!(parse_metric("", KV_CACHE_METRIC), None);
    }

    #[test]
    fn test_base_url_slots() {
        let client = VllmClient::new([8104, 8105]).unwrap();
        assert_eq!(client.base_url(0), "http://localhost:8104");
        assert_eq!(client.base_url(1), "http://localhost:8105");
        // Out-of-range slots fall back to slot 0
        assert_eq!(client.base_url(9), "http://localhost:8104");
    }
}
