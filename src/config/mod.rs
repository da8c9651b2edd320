// src/config/mod.rs
pub mod ai;
pub mod scoring;

pub use ai::AiConfig;
pub use scoring::{RecencyConfig, ScoringConfig, SourceWeights};
