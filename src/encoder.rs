//! Result mapping
//!
//! This module maps analysis results onto the externally visible payloads:
//! the reward tier derived from the composite score, the lower-cased quality
//! label, and the audit details surfaced verbatim.

use crate::error::ComputeError;
use crate::schema::{
    FailureResponse, Identifier, ReportDetails, StabilityReport, StabilityResponse,
};
use crate::types::AnalysisResult;
use serde::Serialize;

// Reward floors (inclusive) and their bonus points
pub const TOP_REWARD_THRESHOLD: f64 = 90.0;
pub const TOP_REWARD_POINTS: u32 = 15;
pub const HIGH_REWARD_THRESHOLD: f64 = 80.0;
pub const HIGH_REWARD_POINTS: u32 = 10;
pub const BASE_REWARD_THRESHOLD: f64 = 70.0;
pub const BASE_REWARD_POINTS: u32 = 5;

/// Bonus points for a composite score. Coarser than classification.
pub fn reward_tier(score: f64) -> u32 {
    if score >= TOP_REWARD_THRESHOLD {
        TOP_REWARD_POINTS
    } else if score >= HIGH_REWARD_THRESHOLD {
        HIGH_REWARD_POINTS
    } else if score >= BASE_REWARD_THRESHOLD {
        BASE_REWARD_POINTS
    } else {
        0
    }
}

/// Encoder for analysis response payloads
pub struct ReportEncoder;

impl ReportEncoder {
    /// Shape one subject's result as a single-analysis report
    pub fn encode(
        match_id: Option<Identifier>,
        round_number: Option<u32>,
        result: &AnalysisResult,
    ) -> StabilityReport {
        StabilityReport {
            success: true,
            match_id,
            round_number,
            stability_score: result.stability_score,
            bonus_points: reward_tier(result.stability_score),
            flight_quality: result.classification.label().to_string(),
            details: ReportDetails {
                issues: result.issues_detected.clone(),
                variance: result.variance_data,
                smoothness: result.smoothness_scores,
                spikes: result.spike_counts,
                data_points: result.data_points,
            },
        }
    }

    /// Single-analysis failure with zeroed score fields
    pub fn failure(error: &ComputeError) -> StabilityResponse {
        StabilityResponse::Failure(FailureResponse::zeroed(error).with_context("Analysis failed"))
    }

    /// Encode any payload to a JSON string
    pub fn encode_to_json<T: Serialize>(payload: &T) -> Result<String, ComputeError> {
        serde_json::to_string(payload).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Encode any payload to an indented JSON string
    pub fn encode_to_json_pretty<T: Serialize>(payload: &T) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(payload)
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::StabilityAnalyzer;
    use crate::types::Sample;

    #[test]
    fn test_reward_tier_boundaries() {
        assert_eq!(reward_tier(100.0), 15);
        assert_eq!(reward_tier(90.0), 15);
        assert_eq!(reward_tier(89.99), 10);
        assert_eq!(reward_tier(80.0), 10);
        assert_eq!(reward_tier(79.99), 5);
        assert_eq!(reward_tier(70.0), 5);
        assert_eq!(reward_tier(69.99), 0);
        assert_eq!(reward_tier(0.0), 0);
    }

    #[test]
    fn test_reward_tier_is_non_decreasing() {
        let mut previous = 0;
        for step in 0..=10_000 {
            let tier = reward_tier(step as f64 / 100.0);
            assert!(tier >= previous);
            previous = tier;
        }
        assert_eq!(previous, TOP_REWARD_POINTS);
    }

    #[test]
    fn test_reward_tier_differs_from_classification() {
        // 85 is Good, same label as 75, but earns a higher tier
        assert_eq!(
            crate::analyzer::classify(85.0),
            crate::analyzer::classify(75.0)
        );
        assert!(reward_tier(85.0) > reward_tier(75.0));
    }

    #[test]
    fn test_encode_report() {
        let samples = vec![Sample::new(0.0, 0.0, 1.0, 0.0, 0.0, 0.0); 12];
        let result = StabilityAnalyzer::default().analyze("D1", &samples);

        let report = ReportEncoder::encode(Some(Identifier::from("m1")), Some(3), &result);

        assert!(report.success);
        assert_eq!(report.stability_score, 100.0);
        assert_eq!(report.bonus_points, 15);
        assert_eq!(report.flight_quality, "excellent");
        assert_eq!(report.details.data_points, 12);

        let json: serde_json::Value =
            serde_json::from_str(&ReportEncoder::encode_to_json(&report).unwrap()).unwrap();
        assert_eq!(json["matchId"], "m1");
        assert_eq!(json["roundNumber"], 3);
        assert_eq!(json["details"]["issues"][0], "No major issues detected");
        assert_eq!(json["details"]["variance"]["z_variance"], 0.0);
        assert_eq!(json["details"]["smoothness"]["average"], 100.0);
        assert_eq!(json["details"]["spikes"]["x"], 0);
        assert_eq!(json["details"]["dataPoints"], 12);
    }

    #[test]
    fn test_encode_insufficient_report() {
        let result = AnalysisResult::insufficient("D1", 5);
        let report = ReportEncoder::encode(None, None, &result);

        assert_eq!(report.bonus_points, 0);
        assert_eq!(report.flight_quality, "insufficient data");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["matchId"], serde_json::Value::Null);
        assert_eq!(json["details"]["variance"], serde_json::json!({}));
    }
}
