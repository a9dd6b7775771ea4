//! Deployment pipeline: script launching, log capture, prompt detection,
//! and live event streaming.

pub mod launcher;
pub mod prompts;
pub mod registry;
pub mod stream;
