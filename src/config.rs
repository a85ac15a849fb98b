//! Analyzer configuration
//!
//! Thresholds the metric extractors take as parameters. Every field defaults to
//! the tuned value, so a partial JSON document only overrides what it names.
//! Scoring weights and caps are fixed and live in [`crate::analyzer`].

use serde::{Deserialize, Serialize};

/// Minimum sequence length for a full analysis
pub const DEFAULT_MIN_SAMPLES: usize = 10;

/// Absolute z-score above which a sample counts as a spike
pub const DEFAULT_SPIKE_THRESHOLD: f64 = 2.0;

/// Spike count above which an axis is reported as an issue
pub const DEFAULT_SPIKE_ISSUE_LIMIT: usize = 5;

/// Sign-change ratio above which an axis is flagged as oscillating
pub const DEFAULT_OSCILLATION_RATIO: f64 = 0.4;

/// Tunable thresholds passed to a [`crate::StabilityEngine`] at construction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Sequences shorter than this short-circuit to Insufficient Data
    pub min_samples: usize,
    pub spike_threshold: f64,
    pub spike_issue_limit: usize,
    pub oscillation_ratio: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_samples: DEFAULT_MIN_SAMPLES,
            spike_threshold: DEFAULT_SPIKE_THRESHOLD,
            spike_issue_limit: DEFAULT_SPIKE_ISSUE_LIMIT,
            oscillation_ratio: DEFAULT_OSCILLATION_RATIO,
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
