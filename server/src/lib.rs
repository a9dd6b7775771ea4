//! Modelboard Library
//!
//! Core modules for the local LLM deployment dashboard backend.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod logs;
pub mod models;
pub mod runtimes;
pub mod server;
pub mod telemetry;
pub mod utils;
pub mod validators;
