//! Clients for the runtimes and registries the dashboard talks to

pub mod hub;
pub mod ollama;
pub mod vllm;
