//! Analysis request shapes
//!
//! Single analysis uses camelCase keys (`matchId`, `roundNumber`, `telemetry`),
//! batch analysis uses snake_case keys (`match_id`, `teams`, `drone_id`, `logs`).
//! Batch telemetry is decoded per drone so one malformed drone cannot sink the batch.

use crate::error::ComputeError;
use crate::types::{lenient_identifier, Sample};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use crate::types::Identifier;

/// Subject id used when the request does not name one
pub const UNKNOWN_DRONE_ID: &str = "unknown";

/// Single-subject analysis request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilityRequest {
    #[serde(default, deserialize_with = "lenient_identifier")]
    pub match_id: Option<Identifier>,
    #[serde(default)]
    pub round_number: Option<u32>,
    /// One subject's samples in capture order
    #[serde(default)]
    pub telemetry: Option<Vec<Sample>>,
}

impl StabilityRequest {
    pub fn new(
        match_id: Option<Identifier>,
        round_number: Option<u32>,
        telemetry: Vec<Sample>,
    ) -> Self {
        Self {
            match_id,
            round_number,
            telemetry: Some(telemetry),
        }
    }

    /// Parse a request body
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        parse_body(json)
    }

    /// Samples to analyze; missing and empty telemetry are both rejected
    pub fn samples(&self) -> Result<&[Sample], ComputeError> {
        match self.telemetry.as_deref() {
            Some(samples) if !samples.is_empty() => Ok(samples),
            _ => Err(ComputeError::NoTelemetry),
        }
    }

    /// Subject id, taken from the first sample
    pub fn drone_id(&self) -> String {
        self.telemetry
            .as_ref()
            .and_then(|t| t.first())
            .and_then(|s| s.drone_id.as_ref())
            .map_or_else(|| UNKNOWN_DRONE_ID.to_string(), ToString::to_string)
    }
}

/// Multi-team analysis request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchRequest {
    #[serde(default, deserialize_with = "lenient_identifier")]
    pub match_id: Option<Identifier>,
    #[serde(default)]
    pub teams: Option<Vec<TeamInput>>,
}

impl BatchRequest {
    /// Parse a request body
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        parse_body(json)
    }

    /// Teams to analyze; missing and empty lists are both rejected
    pub fn teams(&self) -> Result<&[TeamInput], ComputeError> {
        match self.teams.as_deref() {
            Some(teams) if !teams.is_empty() => Ok(teams),
            _ => Err(ComputeError::NoTeams),
        }
    }
}

/// One team's drones
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamInput {
    #[serde(default, deserialize_with = "lenient_identifier")]
    pub team_id: Option<Identifier>,
    #[serde(default)]
    pub drones: Vec<DroneInput>,
}

/// One drone's raw telemetry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DroneInput {
    #[serde(default, deserialize_with = "lenient_identifier")]
    pub drone_id: Option<Identifier>,
    /// Raw sample array, decoded lazily by [`DroneInput::samples`]
    #[serde(default)]
    pub logs: Value,
}

impl DroneInput {
    /// Build a drone entry from already-decoded samples
    pub fn from_samples(
        drone_id: impl Into<String>,
        samples: &[Sample],
    ) -> Result<Self, ComputeError> {
        Ok(Self {
            drone_id: Some(Identifier::Text(drone_id.into())),
            logs: serde_json::to_value(samples)?,
        })
    }

    pub fn drone_id(&self) -> String {
        self.drone_id
            .as_ref()
            .map_or_else(|| UNKNOWN_DRONE_ID.to_string(), ToString::to_string)
    }

    /// Number of raw log entries; 0 when logs are absent or not an array
    pub fn log_count(&self) -> usize {
        self.logs.as_array().map_or(0, Vec::len)
    }

    /// Decode the raw logs, reporting the first malformed sample.
    ///
    /// Absent or null logs decode as no samples; any other non-array is malformed.
    pub fn samples(&self) -> Result<Vec<Sample>, ComputeError> {
        match &self.logs {
            Value::Array(raw) => decode_samples(raw),
            Value::Null => Ok(Vec::new()),
            other => Err(ComputeError::InvalidLogs(json_kind(other))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decode raw JSON samples, preserving order
pub fn decode_samples(raw: &[Value]) -> Result<Vec<Sample>, ComputeError> {
    raw.iter()
        .enumerate()
        .map(|(index, value)| {
            Sample::deserialize(value).map_err(|e| ComputeError::InvalidSample {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Whether the timestamped samples are in non-decreasing capture order.
///
/// Samples without a timestamp are skipped.
pub fn timestamps_ordered(samples: &[Sample]) -> bool {
    let stamps: Vec<_> = samples.iter().filter_map(|s| s.timestamp).collect();
    stamps.windows(2).all(|w| w[0] <= w[1])
}

/// Parse a body that must be a non-empty JSON object
fn parse_body<T: serde::de::DeserializeOwned>(json: &str) -> Result<T, ComputeError> {
    let value: Value = serde_json::from_str(json)?;

    if !matches!(&value, Value::Object(map) if !map.is_empty()) {
        return Err(ComputeError::NoData);
    }

    Ok(serde_json::from_value(value)?)
}
