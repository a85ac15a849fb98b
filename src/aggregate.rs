//! Team aggregation
//!
//! Runs the single-subject analyzer independently over every drone of every
//! team and averages each team's scores. Drones are never normalized against
//! each other, and a drone with short or malformed telemetry contributes an
//! Insufficient Data result (score 0) instead of failing the batch.

use crate::analyzer::{round2, StabilityAnalyzer};
use crate::schema::{timestamps_ordered, DroneInput, TeamInput, TeamResult};
use crate::types::{AnalysisResult, FlightIssue};

/// Aggregator over teams of drones
pub struct TeamAggregator<'a> {
    analyzer: &'a StabilityAnalyzer,
}

impl<'a> TeamAggregator<'a> {
    pub fn new(analyzer: &'a StabilityAnalyzer) -> Self {
        Self { analyzer }
    }

    /// Analyze every team, preserving input order
    pub fn aggregate(&self, teams: &[TeamInput]) -> Vec<TeamResult> {
        teams.iter().map(|team| self.analyze_team(team)).collect()
    }

    /// Analyze one team's drones and average their scores
    pub fn analyze_team(&self, team: &TeamInput) -> TeamResult {
        let drones: Vec<AnalysisResult> = team
            .drones
            .iter()
            .map(|drone| self.analyze_drone(drone))
            .collect();

        TeamResult {
            team_id: team.team_id.clone(),
            team_avg_stability: team_average(&drones),
            drones,
        }
    }

    fn analyze_drone(&self, drone: &DroneInput) -> AnalysisResult {
        let drone_id = drone.drone_id();
        let drone_id = drone_id.as_str();

        match drone.samples() {
            Ok(samples) => {
                if !timestamps_ordered(&samples) {
                    tracing::warn!(
                        drone_id,
                        "telemetry timestamps out of order; analyzing as given"
                    );
                }
                self.analyzer.analyze(drone_id, &samples)
            }
            Err(e) => {
                tracing::warn!(
                    drone_id,
                    error = %e,
                    "malformed telemetry, scoring as insufficient"
                );
                AnalysisResult::insufficient_with(
                    drone_id,
                    drone.log_count(),
                    FlightIssue::MalformedTelemetry(e.to_string()),
                )
            }
        }
    }
}

/// Mean published score of a team's drones, rounded to 2 decimals; 0 when empty
pub fn team_average(drones: &[AnalysisResult]) -> f64 {
    if drones.is_empty() {
        return 0.0;
    }
    let total: f64 = drones.iter().map(|d| d.stability_score).sum();
    round2(total / drones.len() as f64)
}
