//! Drone Stability - deterministic flight stability scoring for pose telemetry
//!
//! The engine turns a time-ordered sequence of pose samples (position and
//! attitude) into a stability verdict through a fixed pipeline: metric
//! extraction → single-subject analysis → team aggregation → result mapping.
//!
//! ## Modules
//!
//! - **Metric Extractors** (`features`): variance, z-score spikes, oscillation, jerk smoothness
//! - **Analyzer** (`analyzer`): issues, composite score, and classification for one drone
//! - **Aggregation** (`aggregate`): per-team analysis and averages
//! - **Result Mapper** (`encoder`): reward tier and response payloads

pub mod aggregate;
pub mod analyzer;
pub mod config;
pub mod encoder;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod schema;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use analyzer::StabilityAnalyzer;
pub use config::AnalyzerConfig;
pub use error::ComputeError;
pub use pipeline::{analyze_stability, batch_analyze, health, StabilityEngine};

// Schema exports
pub use schema::{BatchRequest, BatchResponse, StabilityRequest, StabilityResponse};

// Domain exports
pub use types::{AnalysisResult, Axis, Classification, FlightIssue, Identifier, Sample};

/// Engine version reported by health checks
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service name reported by health checks
pub const SERVICE_NAME: &str = "Drone Stability Analysis Service";
