//! Core types for the stability engine
//!
//! This module defines the data structures that flow through the analysis:
//! pose samples in, per-axis metric records and the analysis result out.

use chrono::{DateTime, TimeZone, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// One pose observation as reported by a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
    /// Reporting drone, when the transport tags samples individually
    #[serde(
        rename = "droneId",
        alias = "drone_id",
        default,
        deserialize_with = "lenient_identifier",
        skip_serializing_if = "Option::is_none"
    )]
    pub drone_id: Option<Identifier>,
    /// Capture time (UTC); epoch milliseconds or RFC 3339 on the wire
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Sample {
    /// Untagged sample at the given pose
    pub fn new(x: f64, y: f64, z: f64, pitch: f64, roll: f64, yaw: f64) -> Self {
        Self {
            x,
            y,
            z,
            pitch,
            roll,
            yaw,
            drone_id: None,
            timestamp: None,
        }
    }

    /// Value of one axis
    pub fn axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
            Axis::Pitch => self.pitch,
            Axis::Roll => self.roll,
            Axis::Yaw => self.yaw,
        }
    }
}

/// Match, team or drone identifier, echoed back verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Number(i64),
    Text(String),
}

impl Identifier {
    /// Identifier for any JSON scalar; `None` for null
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(Identifier::Text(s)),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => Identifier::Number(i),
                None => Identifier::Text(n.to_string()),
            }),
            other => Some(Identifier::Text(other.to_string())),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Number(n) => write!(f, "{n}"),
            Identifier::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Identifier::Text(s.to_string())
    }
}

/// Accept any JSON value as an optional identifier
pub(crate) fn lenient_identifier<'de, D>(
    deserializer: D,
) -> Result<Option<Identifier>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(Identifier::from_value))
}

/// Accept epoch milliseconds (number or numeric string) or RFC 3339.
///
/// Anything else decodes as no timestamp rather than rejecting the sample.
pub(crate) fn lenient_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_timestamp))
}

/// Parse a wire timestamp, `None` when it is not a recognizable time
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(millis) => from_millis(millis),
            None => n
                .as_f64()
                .filter(|millis| millis.is_finite())
                .and_then(|millis| from_millis(millis as i64)),
        },
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(millis) => from_millis(millis),
            Err(_) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|t| t.with_timezone(&Utc)),
        },
        _ => None,
    }
}

fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// One of the six tracked fields of a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
    Pitch,
    Roll,
    Yaw,
}

impl Axis {
    /// Position axes, the ones spike and smoothness metrics run on
    pub const POSITION: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Attitude axes, the ones the oscillation detector runs on
    pub const ATTITUDE: [Axis; 3] = [Axis::Pitch, Axis::Roll, Axis::Yaw];

    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
            Axis::Pitch => "pitch",
            Axis::Roll => "roll",
            Axis::Yaw => "yaw",
        }
    }

    /// Collect this axis across a sample sequence, in capture order
    pub fn series(&self, samples: &[Sample]) -> Vec<f64> {
        samples.iter().map(|s| s.axis(*self)).collect()
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Population variance of every axis over one sequence
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisVariance {
    pub x_variance: f64,
    pub y_variance: f64,
    pub z_variance: f64,
    pub pitch_variance: f64,
    pub roll_variance: f64,
    pub yaw_variance: f64,
}

impl AxisVariance {
    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x_variance,
            Axis::Y => self.y_variance,
            Axis::Z => self.z_variance,
            Axis::Pitch => self.pitch_variance,
            Axis::Roll => self.roll_variance,
            Axis::Yaw => self.yaw_variance,
        }
    }
}

/// Jerk-based smoothness of the position axes (0-100, higher = smoother)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothnessScores {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub average: f64,
}

/// Number of z-score spikes on each position axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpikeCounts {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl SpikeCounts {
    pub fn total(&self) -> usize {
        self.x + self.y + self.z
    }
}

/// Qualitative verdict on a subject's flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Excellent,
    Good,
    Moderate,
    Poor,
    #[serde(rename = "Insufficient Data")]
    InsufficientData,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Excellent => "Excellent",
            Classification::Good => "Good",
            Classification::Moderate => "Moderate",
            Classification::Poor => "Poor",
            Classification::InsufficientData => "Insufficient Data",
        }
    }

    /// Lower-cased label used for external presentation
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Excellent => "excellent",
            Classification::Good => "good",
            Classification::Moderate => "moderate",
            Classification::Poor => "poor",
            Classification::InsufficientData => "insufficient data",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected flight issue, serialized as its human-readable message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlightIssue {
    YawDrift,
    AltitudeInstability,
    PitchOscillation,
    RollOscillation,
    PositionSpikes(Axis),
    OscillationPattern(Axis),
    NoMajorIssues,
    NotEnoughData,
    MalformedTelemetry(String),
}

impl FlightIssue {
    pub fn message(&self) -> String {
        match self {
            FlightIssue::YawDrift => "Yaw drift detected".to_string(),
            FlightIssue::AltitudeInstability => "Altitude instability".to_string(),
            FlightIssue::PitchOscillation => "Pitch oscillation".to_string(),
            FlightIssue::RollOscillation => "Roll oscillation".to_string(),
            FlightIssue::PositionSpikes(Axis::X) => {
                "Horizontal position spikes (X-axis)".to_string()
            }
            FlightIssue::PositionSpikes(Axis::Y) => {
                "Horizontal position spikes (Y-axis)".to_string()
            }
            FlightIssue::PositionSpikes(Axis::Z) => "Vertical position spikes".to_string(),
            FlightIssue::PositionSpikes(axis) => format!("Position spikes ({axis})"),
            FlightIssue::OscillationPattern(axis) => {
                format!("{} oscillation pattern detected", capitalize(axis.as_str()))
            }
            FlightIssue::NoMajorIssues => "No major issues detected".to_string(),
            FlightIssue::NotEnoughData => "Not enough data points".to_string(),
            FlightIssue::MalformedTelemetry(reason) => format!("Malformed telemetry: {reason}"),
        }
    }

    /// Whether the issue text names an oscillation (case-insensitive)
    pub fn mentions_oscillation(&self) -> bool {
        self.message().to_lowercase().contains("oscillation")
    }
}

impl fmt::Display for FlightIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl Serialize for FlightIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.message())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Stability verdict for one subject
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub drone_id: String,
    /// Composite score (0-100, rounded to 2 decimals)
    pub stability_score: f64,
    pub classification: Classification,
    /// Never empty
    pub issues_detected: Vec<FlightIssue>,
    /// `None` only for insufficient data, serialized as `{}`
    #[serde(serialize_with = "serialize_or_empty")]
    pub variance_data: Option<AxisVariance>,
    #[serde(serialize_with = "serialize_or_empty")]
    pub smoothness_scores: Option<SmoothnessScores>,
    #[serde(serialize_with = "serialize_or_empty")]
    pub spike_counts: Option<SpikeCounts>,
    pub data_points: usize,
}

impl AnalysisResult {
    /// Short-circuit result for a sequence below the sufficiency floor
    pub fn insufficient(drone_id: impl Into<String>, data_points: usize) -> Self {
        Self::insufficient_with(drone_id, data_points, FlightIssue::NotEnoughData)
    }

    /// Insufficient-data result carrying a specific reason
    pub fn insufficient_with(
        drone_id: impl Into<String>,
        data_points: usize,
        issue: FlightIssue,
    ) -> Self {
        Self {
            drone_id: drone_id.into(),
            stability_score: 0.0,
            classification: Classification::InsufficientData,
            issues_detected: vec![issue],
            variance_data: None,
            smoothness_scores: None,
            spike_counts: None,
            data_points,
        }
    }

    pub fn is_insufficient(&self) -> bool {
        self.classification == Classification::InsufficientData
    }
}

pub(crate) fn serialize_or_empty<T, S>(
    value: &Option<T>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    match value {
        Some(inner) => inner.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_deserializes_wire_shape() {
        let sample: Sample = serde_json::from_str(
            r#"{"x": 1.0, "y": 2.0, "z": 3.5, "pitch": 0.1, "roll": -0.2, "yaw": 90,
                "droneId": "D1", "timestamp": "2024-03-01T10:00:00Z", "battery": 87}"#,
        )
        .unwrap();

        assert_eq!(sample.z, 3.5);
        assert_eq!(sample.axis(Axis::Yaw), 90.0);
        assert_eq!(sample.drone_id, Some(Identifier::from("D1")));
        assert!(sample.timestamp.is_some());
    }

    #[test]
    fn test_sample_accepts_epoch_millis_timestamp() {
        let sample: Sample = serde_json::from_str(
            r#"{"x": 0, "y": 0, "z": 1, "pitch": 0, "roll": 0, "yaw": 0,
                "droneId": 7, "timestamp": 1700000000100}"#,
        )
        .unwrap();

        assert_eq!(sample.drone_id, Some(Identifier::Number(7)));
        assert_eq!(
            sample.timestamp.map(|t| t.timestamp_millis()),
            Some(1_700_000_000_100)
        );
    }

    #[test]
    fn test_unreadable_timestamp_is_dropped_not_rejected() {
        for stamp in [r#""yesterday""#, "true", "{}", "null", "1.5e300"] {
            let json = format!(
                r#"{{"x": 0, "y": 0, "z": 0, "pitch": 0, "roll": 0, "yaw": 0, "timestamp": {stamp}}}"#
            );
            let sample: Sample = serde_json::from_str(&json).unwrap();
            assert_eq!(sample.timestamp, None, "timestamp {stamp}");
        }
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = Some(1_700_000_000_000);

        assert_eq!(
            parse_timestamp(&serde_json::json!(1_700_000_000_000i64)).map(|t| t.timestamp_millis()),
            expected
        );
        assert_eq!(
            parse_timestamp(&serde_json::json!(1_700_000_000_000.0)).map(|t| t.timestamp_millis()),
            expected
        );
        assert_eq!(
            parse_timestamp(&serde_json::json!("1700000000000")).map(|t| t.timestamp_millis()),
            expected
        );
        assert_eq!(
            parse_timestamp(&serde_json::json!("2023-11-14T22:13:20Z"))
                .map(|t| t.timestamp_millis()),
            expected
        );
    }

    #[test]
    fn test_identifier_from_any_scalar() {
        assert_eq!(Identifier::from_value(serde_json::json!(null)), None);
        assert_eq!(
            Identifier::from_value(serde_json::json!(12)),
            Some(Identifier::Number(12))
        );
        assert_eq!(
            Identifier::from_value(serde_json::json!(1.5)),
            Some(Identifier::Text("1.5".to_string()))
        );
        assert_eq!(
            Identifier::from_value(serde_json::json!(true)),
            Some(Identifier::Text("true".to_string()))
        );
    }

    #[test]
    fn test_sample_requires_all_axes() {
        let result: Result<Sample, _> =
            serde_json::from_str(r#"{"x": 1.0, "y": 2.0, "z": 3.5, "pitch": 0.1, "roll": 0.2}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_issue_messages() {
        assert_eq!(FlightIssue::YawDrift.message(), "Yaw drift detected");
        assert_eq!(
            FlightIssue::OscillationPattern(Axis::Roll).message(),
            "Roll oscillation pattern detected"
        );
        assert_eq!(
            FlightIssue::PositionSpikes(Axis::Z).message(),
            "Vertical position spikes"
        );
        assert!(FlightIssue::PitchOscillation.mentions_oscillation());
        assert!(FlightIssue::OscillationPattern(Axis::Yaw).mentions_oscillation());
        assert!(!FlightIssue::AltitudeInstability.mentions_oscillation());
    }

    #[test]
    fn test_classification_labels() {
        assert_eq!(Classification::Excellent.label(), "excellent");
        assert_eq!(
            serde_json::to_value(Classification::InsufficientData).unwrap(),
            "Insufficient Data"
        );
    }

    #[test]
    fn test_insufficient_result_serializes_empty_maps() {
        let result = AnalysisResult::insufficient("D7", 4);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["stability_score"], 0.0);
        assert_eq!(json["classification"], "Insufficient Data");
        assert_eq!(json["issues_detected"][0], "Not enough data points");
        assert_eq!(json["variance_data"], serde_json::json!({}));
        assert_eq!(json["smoothness_scores"], serde_json::json!({}));
        assert_eq!(json["spike_counts"], serde_json::json!({}));
        assert_eq!(json["data_points"], 4);
    }
}
