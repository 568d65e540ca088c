//! Three-stage vibe coding coach: explain → design → implement, each stage a
//! prompt against a hosted text-generation model, each feeding the next.

pub mod artifact;
pub mod cli;
pub mod config;
pub mod errors;
pub mod log;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod stage;
pub mod ux;
pub mod wire;

pub use pipeline::{CoachTeam, PipelineRun, UpstreamPolicy};
pub use wire::{Category, PipelineResult, Request};
