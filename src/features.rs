//! Metric extraction
//!
//! Pure per-axis signal metrics over a sample sequence:
//! - Population variance of every axis
//! - Z-score spike indices
//! - Sign-change oscillation detection
//! - Jerk-based smoothness
//!
//! Each extractor resolves its degenerate inputs (too few points, zero variance)
//! to a documented default instead of failing.

use crate::types::{Axis, AxisVariance, Sample};

/// Spike detection needs at least this many points
pub const MIN_SPIKE_SAMPLES: usize = 3;

/// Oscillation detection needs at least this many points
pub const MIN_OSCILLATION_SAMPLES: usize = 10;

/// Smoothness needs at least this many points (three differences deep)
pub const MIN_SMOOTHNESS_SAMPLES: usize = 4;

/// Smoothness of a sequence too short to show any jerk
pub const PERFECT_SMOOTHNESS: f64 = 100.0;

/// Smoothness points lost per unit of mean absolute jerk
const JERK_PENALTY_SCALE: f64 = 10.0;

/// Population variance of each of the six axes.
///
/// Fewer than 2 samples yields all zeros.
pub fn compute_variance(samples: &[Sample]) -> AxisVariance {
    if samples.len() < 2 {
        return AxisVariance::default();
    }

    let var = |axis: Axis| population_variance(&axis.series(samples));

    AxisVariance {
        x_variance: var(Axis::X),
        y_variance: var(Axis::Y),
        z_variance: var(Axis::Z),
        pitch_variance: var(Axis::Pitch),
        roll_variance: var(Axis::Roll),
        yaw_variance: var(Axis::Yaw),
    }
}

/// Arithmetic mean, 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by n, not n - 1)
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Indices whose absolute z-score exceeds `threshold`.
///
/// Returns no spikes for fewer than 3 points or a flat (zero variance) series.
pub fn detect_spikes(values: &[f64], threshold: f64) -> Vec<usize> {
    if values.len() < MIN_SPIKE_SAMPLES {
        return Vec::new();
    }

    let m = mean(values);
    let std_dev = population_variance(values).sqrt();
    if std_dev.is_nan() || std_dev <= 0.0 {
        return Vec::new();
    }

    values
        .iter()
        .enumerate()
        .filter(|(_, v)| ((*v - m) / std_dev).abs() > threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Fraction of consecutive first differences whose sign changes.
///
/// A move to or from a flat step counts as a change. `None` below the
/// oscillation sample floor.
pub fn oscillation_ratio(values: &[f64]) -> Option<f64> {
    if values.len() < MIN_OSCILLATION_SAMPLES {
        return None;
    }

    let signs: Vec<i8> = differences(values).into_iter().map(sign).collect();
    let sign_changes = signs.windows(2).filter(|w| w[0] != w[1]).count();

    Some(sign_changes as f64 / signs.len() as f64)
}

/// Whether the series flips direction more often than `max_ratio` allows
pub fn is_oscillating(values: &[f64], max_ratio: f64) -> bool {
    oscillation_ratio(values).is_some_and(|ratio| ratio > max_ratio)
}

/// Smoothness score: `max(0, 100 - 10 * mean |jerk|)`
///
/// Jerk is the third finite difference. Fewer than 4 points scores a perfect 100.
pub fn compute_smoothness(values: &[f64]) -> f64 {
    if values.len() < MIN_SMOOTHNESS_SAMPLES {
        return PERFECT_SMOOTHNESS;
    }

    let velocity = differences(values);
    let acceleration = differences(&velocity);
    let jerk = differences(&acceleration);

    let abs_jerk: Vec<f64> = jerk.iter().map(|j| j.abs()).collect();
    let mean_abs_jerk = mean(&abs_jerk);

    // f64::max drops NaN, so a non-finite jerk lands on 0
    (PERFECT_SMOOTHNESS - mean_abs_jerk * JERK_PENALTY_SCALE).max(0.0)
}

/// First finite difference
fn differences(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}
