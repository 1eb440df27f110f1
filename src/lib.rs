//! Batch pipeline turning raw consumer complaints into escalation-risk
//! features: chunked bronze → silver ingestion, silver → gold labeling,
//! and multimodal feature fusion.

pub mod common;
pub mod config;
pub mod data;
pub mod embedder;
pub mod features;
pub mod observability;
pub mod pipeline;
pub mod schema;

pub use common::error::{PipelineError, Result};
