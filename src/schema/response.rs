//! Analysis response payloads
//!
//! Every entry point answers with either a report or a structured failure;
//! both carry the transport status the caller should use.

use crate::error::ComputeError;
use crate::types::Identifier;
use crate::types::{
    serialize_or_empty, AnalysisResult, AxisVariance, FlightIssue, SmoothnessScores, SpikeCounts,
};
use serde::Serialize;

/// Audit details attached to a single-analysis report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDetails {
    pub issues: Vec<FlightIssue>,
    #[serde(serialize_with = "serialize_or_empty")]
    pub variance: Option<AxisVariance>,
    #[serde(serialize_with = "serialize_or_empty")]
    pub smoothness: Option<SmoothnessScores>,
    #[serde(serialize_with = "serialize_or_empty")]
    pub spikes: Option<SpikeCounts>,
    pub data_points: usize,
}

/// Successful single-analysis payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilityReport {
    pub success: bool,
    pub match_id: Option<Identifier>,
    pub round_number: Option<u32>,
    pub stability_score: f64,
    pub bonus_points: u32,
    /// Lower-cased classification label
    pub flight_quality: String,
    pub details: ReportDetails,
}

/// Structured failure payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stability_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bonus_points: Option<u32>,
    #[serde(skip)]
    pub status: u16,
}

impl FailureResponse {
    /// Failure carrying only a message
    pub fn new(error: &ComputeError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            stability_score: None,
            bonus_points: None,
            status: error.status_code(),
        }
    }

    /// Failure carrying zeroed score fields, as single analysis reports them
    pub fn zeroed(error: &ComputeError) -> Self {
        Self {
            stability_score: Some(0.0),
            bonus_points: Some(0),
            ..Self::new(error)
        }
    }

    /// Prefix the message with the operation that failed
    pub fn with_context(mut self, context: &str) -> Self {
        if self.status >= 500 {
            self.message = format!("{context}: {}", self.message);
        }
        self
    }
}

/// Answer to a single-analysis request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StabilityResponse {
    Report(StabilityReport),
    Failure(FailureResponse),
}

impl StabilityResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, StabilityResponse::Report(_))
    }

    pub fn status_code(&self) -> u16 {
        match self {
            StabilityResponse::Report(_) => 200,
            StabilityResponse::Failure(failure) => failure.status,
        }
    }
}

/// Per-team batch entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamResult {
    pub team_id: Option<Identifier>,
    pub drones: Vec<AnalysisResult>,
    /// Mean drone score, 0 for a team without drones
    pub team_avg_stability: f64,
}

/// Successful batch payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub success: bool,
    pub match_id: Option<Identifier>,
    pub results: Vec<TeamResult>,
}

/// Answer to a batch request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchResponse {
    Report(BatchReport),
    Failure(FailureResponse),
}

impl BatchResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchResponse::Report(_))
    }

    pub fn status_code(&self) -> u16 {
        match self {
            BatchResponse::Report(_) => 200,
            BatchResponse::Failure(failure) => failure.status,
        }
    }
}

/// Liveness payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
}
