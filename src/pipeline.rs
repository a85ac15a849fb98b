//! Pipeline orchestration
//!
//! This module provides the public API of the stability engine. Each call is a
//! self-contained batch: decode the request, analyze, map the result, and fold
//! any error into a structured failure payload. Nothing is retained between calls.

use crate::aggregate::TeamAggregator;
use crate::analyzer::StabilityAnalyzer;
use crate::config::AnalyzerConfig;
use crate::encoder::{reward_tier, ReportEncoder};
use crate::error::ComputeError;
use crate::schema::{
    timestamps_ordered, BatchReport, BatchRequest, BatchResponse, FailureResponse, HealthStatus,
    StabilityRequest, StabilityResponse,
};
use crate::{ENGINE_VERSION, SERVICE_NAME};

/// Analyze one subject's telemetry from a JSON request body (stateless, default config).
///
/// # Arguments
/// * `request_json` - `{ matchId, roundNumber, telemetry: [Sample...] }`
///
/// # Returns
/// The response JSON: a report, or a failure payload with `success: false`.
/// Only fails if the response itself cannot be encoded.
///
/// # Example
/// ```ignore
/// let response_json = analyze_stability(body)?;
/// ```
pub fn analyze_stability(request_json: String) -> Result<String, ComputeError> {
    let response = StabilityEngine::new().analyze_json(&request_json);
    ReportEncoder::encode_to_json(&response)
}

/// Analyze several teams of drones from a JSON request body (stateless, default config).
///
/// # Arguments
/// * `request_json` - `{ match_id, teams: [{ team_id, drones: [{ drone_id, logs }] }] }`
///
/// # Returns
/// The response JSON: per-team results, or a failure payload with `success: false`.
pub fn batch_analyze(request_json: String) -> Result<String, ComputeError> {
    let response = StabilityEngine::new().batch_analyze_json(&request_json);
    ReportEncoder::encode_to_json(&response)
}

/// Liveness payload for the transport layer
pub fn health() -> HealthStatus {
    HealthStatus {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
    }
}

/// Reusable engine holding explicit configuration.
///
/// Holds no per-call state, so one engine can serve concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct StabilityEngine {
    analyzer: StabilityAnalyzer,
}

impl StabilityEngine {
    /// Create an engine with the default thresholds
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with specific thresholds
    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self {
            analyzer: StabilityAnalyzer::new(config),
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        self.analyzer.config()
    }

    /// Single analysis over a decoded request
    pub fn analyze(&self, request: &StabilityRequest) -> StabilityResponse {
        match self.try_analyze(request) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "stability analysis rejected");
                ReportEncoder::failure(&e)
            }
        }
    }

    /// Single analysis over a raw JSON body
    pub fn analyze_json(&self, request_json: &str) -> StabilityResponse {
        match StabilityRequest::from_json(request_json) {
            Ok(request) => self.analyze(&request),
            Err(e) => {
                tracing::warn!(error = %e, "unreadable stability request");
                ReportEncoder::failure(&e)
            }
        }
    }

    /// Batch analysis over a decoded request
    pub fn batch_analyze(&self, request: &BatchRequest) -> BatchResponse {
        match self.try_batch_analyze(request) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "batch analysis rejected");
                batch_failure(&e)
            }
        }
    }

    /// Batch analysis over a raw JSON body
    pub fn batch_analyze_json(&self, request_json: &str) -> BatchResponse {
        match BatchRequest::from_json(request_json) {
            Ok(request) => self.batch_analyze(&request),
            Err(e) => {
                tracing::warn!(error = %e, "unreadable batch request");
                batch_failure(&e)
            }
        }
    }

    fn try_analyze(&self, request: &StabilityRequest) -> Result<StabilityResponse, ComputeError> {
        let samples = request.samples()?;
        let drone_id = request.drone_id();
        let drone_id = drone_id.as_str();

        tracing::debug!(
            match_id = ?request.match_id,
            round = ?request.round_number,
            drone_id,
            samples = samples.len(),
            "analyzing stability"
        );

        if !timestamps_ordered(samples) {
            tracing::warn!(drone_id, "telemetry timestamps out of order; analyzing as given");
        }

        let result = self.analyzer.analyze(drone_id, samples);

        tracing::info!(
            drone_id,
            score = result.stability_score,
            classification = %result.classification,
            bonus = reward_tier(result.stability_score),
            "stability analysis complete"
        );

        Ok(StabilityResponse::Report(ReportEncoder::encode(
            request.match_id.clone(),
            request.round_number,
            &result,
        )))
    }

    fn try_batch_analyze(&self, request: &BatchRequest) -> Result<BatchResponse, ComputeError> {
        let teams = request.teams()?;

        tracing::debug!(match_id = ?request.match_id, teams = teams.len(), "analyzing batch");

        let results = TeamAggregator::new(&self.analyzer).aggregate(teams);

        for team in &results {
            tracing::info!(
                team_id = ?team.team_id,
                drones = team.drones.len(),
                average = team.team_avg_stability,
                "team analysis complete"
            );
        }

        Ok(BatchResponse::Report(BatchReport {
            success: true,
            match_id: request.match_id.clone(),
            results,
        }))
    }
}

fn batch_failure(error: &ComputeError) -> BatchResponse {
    BatchResponse::Failure(FailureResponse::new(error).with_context("Batch analysis failed"))
}
