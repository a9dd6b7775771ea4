//! Data models for the dashboard backend

pub mod catalog;
pub mod deploy;

use serde::Serialize;

/// Standard JSON envelope for API responses
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            details: None,
        }
    }

    pub fn success() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            details: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            details: None,
        }
    }

    pub fn error_with_details(message: impl Into<String>, details: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            details: Some(details),
        }
    }
}
