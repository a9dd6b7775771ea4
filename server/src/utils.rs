//! Utility functions

use serde::{Deserialize, Serialize};

/// Version information for the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Generate a random UUID v4
pub fn generate_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current wall-clock time as milliseconds since the Unix epoch
pub fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Format a byte count as gigabytes, e.g. "15.9 GB"
pub fn format_gb(bytes: u64) -> String {
    let gb = bytes as f64 / (1024.0 * 1024.0 * 1024.0);
    format!("{:.1} GB", gb)
}

/// Format a model blob size: gigabytes when >= 1 GB, megabytes otherwise
pub fn format_size(bytes: u64) -> String {
    let gb = bytes as f64 / (1024.0 * 1024.0 * 1024.0);
    if gb >= 1.0 {
        return format!("{:.1} GB", gb);
    }
    let mb = bytes as f64 / (1024.0 * 1024.0);
    format!("{:.0} MB", mb)
}

/// Format a parameter count, e.g. 7_000_000_000 -> "7.0B"
pub fn format_params(params: u64) -> String {
    if params >= 1_000_000_000_000 {
        format!("{:.1}T", params as f64 / 1e12)
    } else if params >= 1_000_000_000 {
        format!("{:.1}B", params as f64 / 1e9)
    } else if params >= 1_000_000 {
        format!("{:.0}M", params as f64 / 1e6)
    } else {
        params.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_gb() {
        assert_eq!(format_gb(17_179_869_184), "16.0 GB");
        assert_eq!(format_gb(0), "0.0 GB");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(4_831_838_208), "4.5 GB");
        assert_eq!(format_size(536_870_912), "512 MB");
    }

    #[test]
    fn test_format_params() {
        assert_eq!(format_params(7_000_000_000), "7.0B");
        assert_eq!(format_params(1_100_000_000), "1.1B");
        assert_eq!(format_params(1_500_000_000_000), "1.5T");
        assert_eq!(format_params(350_000_000), "350M");
        assert_eq!(format_params(1234), "1234");
    }

    #[test]
    fn test_generate_uuid_is_unique() {
        assert_ne!(generate_uuid(), generate_uuid());
    }
}
