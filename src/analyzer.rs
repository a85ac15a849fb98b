//! Single-subject stability analysis
//!
//! Composes the metric extractors over one subject's sample sequence into an
//! issue list, a composite score, and a classification.
//!
//! Score = 100
//!       - capped per-axis variance penalty (at most 82 in total)
//!       - 0.5 per position spike
//!       - 5 per issue mentioning an oscillation
//!       + (average smoothness - 50) * 0.2
//! clamped to 0-100.

use crate::config::AnalyzerConfig;
use crate::features::{compute_smoothness, compute_variance, detect_spikes, is_oscillating};
use crate::types::{
    AnalysisResult, Axis, AxisVariance, Classification, FlightIssue, Sample, SmoothnessScores,
    SpikeCounts,
};

/// Score before any penalty or bonus
pub const BASE_SCORE: f64 = 100.0;

// Issue thresholds on axis variance
pub const YAW_DRIFT_VARIANCE: f64 = 0.5;
pub const ALTITUDE_INSTABILITY_VARIANCE: f64 = 1.0;
pub const PITCH_OSCILLATION_VARIANCE: f64 = 0.3;
pub const ROLL_OSCILLATION_VARIANCE: f64 = 0.3;

// Variance penalty: scale then cap, per axis
pub const X_VARIANCE_PENALTY_SCALE: f64 = 0.5;
pub const X_VARIANCE_PENALTY_CAP: f64 = 15.0;
pub const Y_VARIANCE_PENALTY_SCALE: f64 = 0.5;
pub const Y_VARIANCE_PENALTY_CAP: f64 = 15.0;
pub const Z_VARIANCE_PENALTY_SCALE: f64 = 3.0;
pub const Z_VARIANCE_PENALTY_CAP: f64 = 10.0;
pub const PITCH_VARIANCE_PENALTY_SCALE: f64 = 10.0;
pub const PITCH_VARIANCE_PENALTY_CAP: f64 = 15.0;
pub const ROLL_VARIANCE_PENALTY_SCALE: f64 = 10.0;
pub const ROLL_VARIANCE_PENALTY_CAP: f64 = 15.0;
pub const YAW_VARIANCE_PENALTY_SCALE: f64 = 8.0;
pub const YAW_VARIANCE_PENALTY_CAP: f64 = 12.0;

/// Sum of all per-axis caps
pub const MAX_VARIANCE_PENALTY: f64 = X_VARIANCE_PENALTY_CAP
    + Y_VARIANCE_PENALTY_CAP
    + Z_VARIANCE_PENALTY_CAP
    + PITCH_VARIANCE_PENALTY_CAP
    + ROLL_VARIANCE_PENALTY_CAP
    + YAW_VARIANCE_PENALTY_CAP;

/// Penalty per spike index across x, y and z (uncapped)
pub const SPIKE_PENALTY: f64 = 0.5;

/// Penalty per issue whose text mentions an oscillation
pub const OSCILLATION_PENALTY: f64 = 5.0;

/// Smoothness that neither adds nor subtracts
pub const SMOOTHNESS_NEUTRAL: f64 = 50.0;
pub const SMOOTHNESS_WEIGHT: f64 = 0.2;

// Classification floors (inclusive)
pub const EXCELLENT_THRESHOLD: f64 = 90.0;
pub const GOOD_THRESHOLD: f64 = 70.0;
pub const MODERATE_THRESHOLD: f64 = 50.0;

/// Analyzer for one subject's sample sequence
#[derive(Debug, Clone, Default)]
pub struct StabilityAnalyzer {
    config: AnalyzerConfig,
}

impl StabilityAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze one subject. Samples are taken in capture order as given.
    pub fn analyze(&self, drone_id: &str, samples: &[Sample]) -> AnalysisResult {
        if samples.len() < self.config.min_samples {
            return AnalysisResult::insufficient(drone_id, samples.len());
        }

        let variance = compute_variance(samples);

        let mut issues = variance_issues(&variance);

        let counts = Axis::POSITION
            .map(|axis| detect_spikes(&axis.series(samples), self.config.spike_threshold).len());
        for (axis, count) in Axis::POSITION.into_iter().zip(counts) {
            if count > self.config.spike_issue_limit {
                issues.push(FlightIssue::PositionSpikes(axis));
            }
        }
        let [x, y, z] = counts;
        let spikes = SpikeCounts { x, y, z };

        // May repeat a variance-based oscillation issue for the same axis; both are penalized
        for axis in Axis::ATTITUDE {
            if is_oscillating(&axis.series(samples), self.config.oscillation_ratio) {
                issues.push(FlightIssue::OscillationPattern(axis));
            }
        }

        let smoothness = smoothness_scores(samples);

        let score = composite_score(&variance, &spikes, &issues, smoothness.average);
        let classification = classify(score);

        if issues.is_empty() {
            issues.push(FlightIssue::NoMajorIssues);
        }

        AnalysisResult {
            drone_id: drone_id.to_string(),
            stability_score: round2(score),
            classification,
            issues_detected: issues,
            variance_data: Some(variance),
            smoothness_scores: Some(SmoothnessScores {
                x: round2(smoothness.x),
                y: round2(smoothness.y),
                z: round2(smoothness.z),
                average: round2(smoothness.average),
            }),
            spike_counts: Some(spikes),
            data_points: samples.len(),
        }
    }
}

/// Issues raised directly by variance thresholds
fn variance_issues(variance: &AxisVariance) -> Vec<FlightIssue> {
    let mut issues = Vec::new();

    if variance.yaw_variance > YAW_DRIFT_VARIANCE {
        issues.push(FlightIssue::YawDrift);
    }
    if variance.z_variance > ALTITUDE_INSTABILITY_VARIANCE {
        issues.push(FlightIssue::AltitudeInstability);
    }
    if variance.pitch_variance > PITCH_OSCILLATION_VARIANCE {
        issues.push(FlightIssue::PitchOscillation);
    }
    if variance.roll_variance > ROLL_OSCILLATION_VARIANCE {
        issues.push(FlightIssue::RollOscillation);
    }

    issues
}

/// Unrounded smoothness of x, y, z and their mean
fn smoothness_scores(samples: &[Sample]) -> SmoothnessScores {
    let [x, y, z] = Axis::POSITION.map(|axis| compute_smoothness(&axis.series(samples)));

    SmoothnessScores {
        x,
        y,
        z,
        average: (x + y + z) / 3.0,
    }
}

/// Capped variance penalty; never exceeds [`MAX_VARIANCE_PENALTY`]
pub fn variance_penalty(variance: &AxisVariance) -> f64 {
    // f64::min returns the cap when the scaled value is NaN
    (variance.x_variance * X_VARIANCE_PENALTY_SCALE).min(X_VARIANCE_PENALTY_CAP)
        + (variance.y_variance * Y_VARIANCE_PENALTY_SCALE).min(Y_VARIANCE_PENALTY_CAP)
        + (variance.z_variance * Z_VARIANCE_PENALTY_SCALE).min(Z_VARIANCE_PENALTY_CAP)
        + (variance.pitch_variance * PITCH_VARIANCE_PENALTY_SCALE).min(PITCH_VARIANCE_PENALTY_CAP)
        + (variance.roll_variance * ROLL_VARIANCE_PENALTY_SCALE).min(ROLL_VARIANCE_PENALTY_CAP)
        + (variance.yaw_variance * YAW_VARIANCE_PENALTY_SCALE).min(YAW_VARIANCE_PENALTY_CAP)
}

/// Composite stability score, clamped to 0-100 (unrounded)
pub fn composite_score(
    variance: &AxisVariance,
    spikes: &SpikeCounts,
    issues: &[FlightIssue],
    average_smoothness: f64,
) -> f64 {
    let spike_penalty = spikes.total() as f64 * SPIKE_PENALTY;
    let oscillation_penalty =
        issues.iter().filter(|i| i.mentions_oscillation()).count() as f64 * OSCILLATION_PENALTY;
    let smoothness_bonus = (average_smoothness - SMOOTHNESS_NEUTRAL) * SMOOTHNESS_WEIGHT;

    let score = BASE_SCORE - variance_penalty(variance) - spike_penalty - oscillation_penalty
        + smoothness_bonus;

    // max before min so a NaN score lands on 0
    score.max(0.0).min(100.0)
}

/// Classification of a clamped score; each floor is inclusive
pub fn classify(score: f64) -> Classification {
    if score >= EXCELLENT_THRESHOLD {
        Classification::Excellent
    } else if score >= GOOD_THRESHOLD {
        Classification::Good
    } else if score >= MODERATE_THRESHOLD {
        Classification::Moderate
    } else {
        Classification::Poor
    }
}

/// Round half away from zero to 2 decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hover(n: usize) -> Vec<Sample> {
        (0..n).map(|_| Sample::new(1.0, 2.0, 5.0, 0.0, 0.0, 90.0)).collect()
    }

    /// Deterministic pseudo-random values in [-1, 1)
    fn noise(seed: u64, n: usize) -> Vec<f64> {
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        (0..n)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
            })
            .collect()
    }

    #[test]
    fn test_insufficient_data_short_circuits() {
        let analyzer = StabilityAnalyzer::default();

        for n in 0..10 {
            let result = analyzer.analyze("D1", &hover(n));
            assert_eq!(result.classification, Classification::InsufficientData);
            assert_eq!(result.stability_score, 0.0);
            assert_eq!(result.issues_detected, vec![FlightIssue::NotEnoughData]);
            assert!(result.variance_data.is_none());
            assert!(result.smoothness_scores.is_none());
            assert!(result.spike_counts.is_none());
            assert_eq!(result.data_points, n);
        }
    }

    #[test]
    fn test_identical_samples_score_perfect() {
        let result = StabilityAnalyzer::default().analyze("D1", &hover(12));

        // 100 + (100 - 50) * 0.2 = 110, clamped
        assert_eq!(result.stability_score, 100.0);
        assert_eq!(result.classification, Classification::Excellent);
        assert_eq!(result.issues_detected, vec![FlightIssue::NoMajorIssues]);
        assert_eq!(result.variance_data, Some(AxisVariance::default()));
        assert_eq!(result.spike_counts, Some(SpikeCounts::default()));
        assert_eq!(result.smoothness_scores.map(|s| s.average), Some(100.0));
        assert_eq!(result.data_points, 12);
    }

    #[test]
    fn test_alternating_yaw_drifts_and_oscillates() {
        let samples: Vec<Sample> = (0..15)
            .map(|i| Sample::new(0.0, 0.0, 0.0, 0.0, 0.0, if i % 2 == 0 { 0.0 } else { 50.0 }))
            .collect();

        let result = StabilityAnalyzer::default().analyze("D2", &samples);

        assert_eq!(
            result.issues_detected,
            vec![
                FlightIssue::YawDrift,
                FlightIssue::OscillationPattern(Axis::Yaw)
            ]
        );
        // 100 - 12 (yaw cap) - 5 (one oscillation issue) + 10 (smoothness bonus)
        assert!((result.stability_score - 93.0).abs() < 1e-9);
        assert_eq!(result.classification, Classification::Excellent);
    }

    #[test]
    fn test_oscillation_penalty_stacks_for_same_axis() {
        // Pitch alternating +-1: variance 1 > 0.3 and sign changes on every step
        let samples: Vec<Sample> = (0..20)
            .map(|i| Sample::new(0.0, 0.0, 0.0, if i % 2 == 0 { -1.0 } else { 1.0 }, 0.0, 0.0))
            .collect();

        let result = StabilityAnalyzer::default().analyze("D3", &samples);

        assert!(result.issues_detected.contains(&FlightIssue::PitchOscillation));
        assert!(result
            .issues_detected
            .contains(&FlightIssue::OscillationPattern(Axis::Pitch)));
        // 100 - min(1 * 10, 15) - 2 * 5 + 10
        assert!((result.stability_score - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_spike_issues() {
        // Flat z with six isolated outliers among 60 samples
        let samples: Vec<Sample> = (0..60)
            .map(|i| {
                let z = if i % 10 == 5 { 10.0 } else { 0.0 };
                Sample::new(0.0, 0.0, z, 0.0, 0.0, 0.0)
            })
            .collect();

        let result = StabilityAnalyzer::default().analyze("D4", &samples);

        assert_eq!(result.spike_counts.map(|s| s.z), Some(6));
        assert!(result
            .issues_detected
            .contains(&FlightIssue::PositionSpikes(Axis::Z)));
        assert!(result
            .issues_detected
            .contains(&FlightIssue::AltitudeInstability));
    }

    #[test]
    fn test_roll_oscillation_stacks_like_pitch() {
        let samples: Vec<Sample> = (0..20)
            .map(|i| Sample::new(0.0, 0.0, 0.0, 0.0, if i % 2 == 0 { -1.0 } else { 1.0 }, 0.0))
            .collect();

        let result = StabilityAnalyzer::default().analyze("D5", &samples);

        assert_eq!(
            result.issues_detected,
            vec![
                FlightIssue::RollOscillation,
                FlightIssue::OscillationPattern(Axis::Roll)
            ]
        );
        assert!((result.stability_score - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_variance_issues_are_strictly_above_threshold() {
        let at_threshold = AxisVariance {
            yaw_variance: YAW_DRIFT_VARIANCE,
            z_variance: ALTITUDE_INSTABILITY_VARIANCE,
            pitch_variance: PITCH_OSCILLATION_VARIANCE,
            roll_variance: ROLL_OSCILLATION_VARIANCE,
            ..Default::default()
        };
        assert!(variance_issues(&at_threshold).is_empty());

        let above = AxisVariance {
            yaw_variance: 0.5001,
            z_variance: 1.0001,
            pitch_variance: 0.3001,
            roll_variance: 0.3001,
            ..Default::default()
        };
        assert_eq!(
            variance_issues(&above),
            vec![
                FlightIssue::YawDrift,
                FlightIssue::AltitudeInstability,
                FlightIssue::PitchOscillation,
                FlightIssue::RollOscillation
            ]
        );
    }

    #[test]
    fn test_sequence_at_yaw_and_altitude_thresholds() {
        // yaw cycles -1, 0, 1, 0 (variance exactly 0.5); z alternates -1, 1 (variance exactly 1)
        let samples: Vec<Sample> = (0..12)
            .map(|i| {
                let yaw = [-1.0, 0.0, 1.0, 0.0][i % 4];
                let z = if i % 2 == 0 { -1.0 } else { 1.0 };
                Sample::new(0.0, 0.0, z, 0.0, 0.0, yaw)
            })
            .collect();

        let result = StabilityAnalyzer::default().analyze("D6", &samples);
        let variance = result.variance_data.unwrap();

        assert_eq!(variance.yaw_variance, 0.5);
        assert_eq!(variance.z_variance, 1.0);
        assert!(!result.issues_detected.contains(&FlightIssue::YawDrift));
        assert!(!result
            .issues_detected
            .contains(&FlightIssue::AltitudeInstability));
    }

    #[test]
    fn test_exactly_spike_limit_raises_no_issue() {
        // Five outliers of 6 among 30 samples: z-score sqrt(5) each, the rest stay under 1
        let samples: Vec<Sample> = (0..30)
            .map(|i| {
                let x = if i % 6 == 0 { 6.0 } else { 0.0 };
                Sample::new(x, 0.0, 0.0, 0.0, 0.0, 0.0)
            })
            .collect();

        let result = StabilityAnalyzer::default().analyze("D7", &samples);

        assert_eq!(result.spike_counts.map(|s| s.x), Some(5));
        assert!(!result
            .issues_detected
            .contains(&FlightIssue::PositionSpikes(Axis::X)));
    }

    #[test]
    fn test_horizontal_spike_issues() {
        // Six outliers per axis among 40 samples: z-score sqrt(0.85 / 0.15) ~ 2.38
        let samples: Vec<Sample> = (0..40)
            .map(|i| {
                let x = if i % 7 == 0 { 20.0 } else { 0.0 };
                let y = if i % 7 == 3 { 20.0 } else { 0.0 };
                Sample::new(x, y, 0.0, 0.0, 0.0, 0.0)
            })
            .collect();

        let result = StabilityAnalyzer::default().analyze("D8", &samples);

        assert_eq!(
            result.spike_counts,
            Some(SpikeCounts { x: 6, y: 6, z: 0 })
        );
        let messages: Vec<String> = result.issues_detected.iter().map(|i| i.message()).collect();
        assert_eq!(
            messages,
            vec![
                "Horizontal position spikes (X-axis)".to_string(),
                "Horizontal position spikes (Y-axis)".to_string()
            ]
        );
    }

    #[test]
    fn test_variance_penalty_caps() {
        let extreme = AxisVariance {
            x_variance: 1e12,
            y_variance: 1e12,
            z_variance: 1e12,
            pitch_variance: 1e12,
            roll_variance: 1e12,
            yaw_variance: f64::INFINITY,
        };
        assert_eq!(variance_penalty(&extreme), 82.0);
        assert_eq!(MAX_VARIANCE_PENALTY, 82.0);
        assert_eq!(variance_penalty(&AxisVariance::default()), 0.0);
    }

    #[test]
    fn test_variance_penalty_never_exceeds_cap() {
        for seed in 0..200 {
            let v = noise(seed, 6);
            let scale = 10f64.powi((seed % 12) as i32 - 4);
            let variance = AxisVariance {
                x_variance: v[0].abs() * scale,
                y_variance: v[1].abs() * scale,
                z_variance: v[2].abs() * scale,
                pitch_variance: v[3].abs() * scale,
                roll_variance: v[4].abs() * scale,
                yaw_variance: v[5].abs() * scale,
            };
            let penalty = variance_penalty(&variance);
            assert!(penalty >= 0.0 && penalty <= MAX_VARIANCE_PENALTY);
        }
    }

    #[test]
    fn test_score_always_clamped() {
        let analyzer = StabilityAnalyzer::default();

        for seed in 0..100 {
            let scale = 10f64.powi((seed % 10) as i32 * 2);
            let axes: Vec<Vec<f64>> = (0..6).map(|a| noise(seed * 6 + a, 40)).collect();
            let samples: Vec<Sample> = (0..40)
                .map(|i| {
                    Sample::new(
                        axes[0][i] * scale,
                        axes[1][i] * scale,
                        axes[2][i] * scale,
                        axes[3][i] * scale,
                        axes[4][i] * scale,
                        axes[5][i] * scale,
                    )
                })
                .collect();

            let result = analyzer.analyze("fuzz", &samples);
            assert!((0.0..=100.0).contains(&result.stability_score));
            assert!(!result.issues_detected.is_empty());
        }
    }

    #[test]
    fn test_composite_score_clamps_low_and_nan() {
        let spikes = SpikeCounts {
            x: 400,
            y: 0,
            z: 0,
        };
        assert_eq!(
            composite_score(&AxisVariance::default(), &spikes, &[], 0.0),
            0.0
        );
        assert_eq!(
            composite_score(&AxisVariance::default(), &SpikeCounts::default(), &[], f64::NAN),
            0.0
        );
    }

    #[test]
    fn test_classification_boundaries() {
        assert_eq!(classify(100.0), Classification::Excellent);
        assert_eq!(classify(90.0), Classification::Excellent);
        assert_eq!(classify(89.99), Classification::Good);
        assert_eq!(classify(70.0), Classification::Good);
        assert_eq!(classify(69.99), Classification::Moderate);
        assert_eq!(classify(50.0), Classification::Moderate);
        assert_eq!(classify(49.99), Classification::Poor);
        assert_eq!(classify(0.0), Classification::Poor);
    }

    #[test]
    fn test_custom_min_samples() {
        let analyzer = StabilityAnalyzer::new(AnalyzerConfig {
            min_samples: 20,
            ..Default::default()
        });
        assert!(analyzer.analyze("D1", &hover(15)).is_insufficient());
        assert!(!analyzer.analyze("D1", &hover(20)).is_insufficient());
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(93.456), 93.46);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(100.0), 100.0);
    }
}
