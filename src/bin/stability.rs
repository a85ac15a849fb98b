//! Stability CLI - Command-line interface for the drone stability engine
//!
//! Commands:
//! - analyze: Score one drone's telemetry (single-analysis request)
//! - batch: Score every drone of every team (batch request)
//! - health: Print the service health payload
//! - schema: Print request/response schema information

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use drone_stability::encoder::ReportEncoder;
use drone_stability::{health, AnalyzerConfig, ComputeError, StabilityEngine, ENGINE_VERSION};
use tracing_subscriber::{fmt, EnvFilter};

/// Stability - deterministic flight stability scoring for drone telemetry
#[derive(Parser)]
#[command(name = "stability")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Score drone flight stability from pose telemetry", long_about = None)]
struct Cli {
    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one drone's telemetry ({ matchId, roundNumber, telemetry })
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,

        /// Analyzer configuration file (JSON, absent fields use defaults)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Analyze teams of drones ({ match_id, teams })
    Batch {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,

        /// Analyzer configuration file (JSON, absent fields use defaults)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the service health payload
    Health {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Describe the batch request/response instead of the single analysis
        #[arg(long)]
        batch: bool,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Request schema
    Input,
    /// Response schema
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn run(cli: Cli) -> Result<(), StabilityCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            output_format,
            config,
        } => cmd_analyze(&input, &output, output_format, config.as_deref()),

        Commands::Batch {
            input,
            output,
            output_format,
            config,
        } => cmd_batch(&input, &output, output_format, config.as_deref()),

        Commands::Health { json } => cmd_health(json),

        Commands::Schema {
            schema_type,
            batch,
            json_schema,
        } => cmd_schema(schema_type, batch, json_schema),
    }
}

fn cmd_analyze(
    input: &Path,
    output: &Path,
    output_format: OutputFormat,
    config: Option<&Path>,
) -> Result<(), StabilityCliError> {
    let engine = load_engine(config)?;
    let request_json = read_input(input)?;

    let response = engine.analyze_json(&request_json);

    write_output(output, &format_output(&response, &output_format)?)?;

    if response.is_success() {
        Ok(())
    } else {
        Err(StabilityCliError::AnalysisFailed {
            status: response.status_code(),
            batch: false,
        })
    }
}

fn cmd_batch(
    input: &Path,
    output: &Path,
    output_format: OutputFormat,
    config: Option<&Path>,
) -> Result<(), StabilityCliError> {
    let engine = load_engine(config)?;
    let request_json = read_input(input)?;

    let response = engine.batch_analyze_json(&request_json);

    write_output(output, &format_output(&response, &output_format)?)?;

    if response.is_success() {
        Ok(())
    } else {
        Err(StabilityCliError::AnalysisFailed {
            status: response.status_code(),
            batch: true,
        })
    }
}

fn cmd_health(json: bool) -> Result<(), StabilityCliError> {
    let status = health();

    if json {
        println!("{}", ReportEncoder::encode_to_json_pretty(&status)?);
    } else {
        println!("Service: {}", status.service);
        println!("Version: {}", status.version);
        println!("Status:  {}", status.status);
    }

    Ok(())
}

fn cmd_schema(
    schema_type: SchemaType,
    batch: bool,
    json_schema: bool,
) -> Result<(), StabilityCliError> {
    match (schema_type, batch) {
        (SchemaType::Input, false) => {
            if json_schema {
                println!("{}", single_input_json_schema());
            } else {
                println!("Input: single analysis request");
                println!();
                println!("- matchId: match identifier (string or integer, optional)");
                println!("- roundNumber: round number (integer, optional)");
                println!("- telemetry: array of pose samples, time-ordered");
                println!("  - x, y, z: position (numbers)");
                println!("  - pitch, roll, yaw: attitude in degrees (numbers)");
                println!("  - droneId: subject id, read from the first sample (optional)");
                println!("  - timestamp: epoch milliseconds or RFC 3339 time (optional)");
                println!();
                println!("Fewer than 10 samples yields an 'insufficient data' report.");
            }
        }
        (SchemaType::Input, true) => {
            if json_schema {
                println!("{}", batch_input_json_schema());
            } else {
                println!("Input: batch request");
                println!();
                println!("- match_id: match identifier (optional)");
                println!("- teams: array of teams");
                println!("  - team_id: team identifier");
                println!("  - drones: array of {{ drone_id, logs: [pose samples] }}");
            }
        }
        (SchemaType::Output, false) => {
            if json_schema {
                println!("{}", single_output_json_schema());
            } else {
                println!("Output: single analysis response");
                println!();
                println!("- success: true");
                println!("- matchId, roundNumber: echoed from the request");
                println!("- stabilityScore: 0-100, 2 decimals");
                println!("- bonusPoints: 15 (>=90), 10 (>=80), 5 (>=70), else 0");
                println!("- flightQuality: excellent | good | moderate | poor | insufficient data");
                println!("- details: {{ issues, variance, smoothness, spikes, dataPoints }}");
                println!();
                println!("On failure: {{ success: false, message, stabilityScore: 0, bonusPoints: 0 }}");
            }
        }
        (SchemaType::Output, true) => {
            if json_schema {
                println!("{}", batch_output_json_schema());
            } else {
                println!("Output: batch response");
                println!();
                println!("- success: true");
                println!("- match_id: echoed from the request");
                println!("- results: array of {{ team_id, drones, team_avg_stability }}");
                println!("  - drones: per-drone results {{ drone_id, stability_score, classification,");
                println!("    issues_detected, variance_data, smoothness_scores, spike_counts,");
                println!("    data_points }}");
                println!();
                println!("On failure: {{ success: false, message }}");
            }
        }
    }

    Ok(())
}

// Helper functions

fn load_engine(config: Option<&Path>) -> Result<StabilityEngine, StabilityCliError> {
    let config = match config {
        Some(path) => AnalyzerConfig::from_json(&fs::read_to_string(path)?)
            .map_err(StabilityCliError::Config)?,
        None => AnalyzerConfig::default(),
    };
    tracing::debug!(?config, "analyzer configuration");
    Ok(StabilityEngine::with_config(config))
}

fn read_input(input: &Path) -> Result<String, StabilityCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), StabilityCliError> {
    if output.to_string_lossy() == "-" {
        println!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn format_output<T: Serialize>(
    payload: &T,
    format: &OutputFormat,
) -> Result<String, StabilityCliError> {
    let data = match format {
        OutputFormat::Json => ReportEncoder::encode_to_json(payload)?,
        OutputFormat::JsonPretty => ReportEncoder::encode_to_json_pretty(payload)?,
    };
    Ok(data)
}

fn sample_json_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "required": ["x", "y", "z", "pitch", "roll", "yaw"],
        "properties": {
            "x": { "type": "number" },
            "y": { "type": "number" },
            "z": { "type": "number" },
            "pitch": { "type": "number" },
            "roll": { "type": "number" },
            "yaw": { "type": "number" },
            "droneId": { "type": ["string", "integer"] },
            "timestamp": {
                "oneOf": [
                    { "type": "integer", "description": "epoch milliseconds" },
                    { "type": "string", "format": "date-time" }
                ]
            }
        }
    })
}

fn drone_result_json_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "required": ["drone_id", "stability_score", "classification", "issues_detected", "data_points"],
        "properties": {
            "drone_id": { "type": "string" },
            "stability_score": { "type": "number", "minimum": 0, "maximum": 100 },
            "classification": {
                "type": "string",
                "enum": ["Excellent", "Good", "Moderate", "Poor", "Insufficient Data"]
            },
            "issues_detected": { "type": "array", "items": { "type": "string" } },
            "variance_data": { "type": "object" },
            "smoothness_scores": { "type": "object" },
            "spike_counts": { "type": "object" },
            "data_points": { "type": "integer", "minimum": 0 }
        }
    })
}

fn single_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "stability.request",
        "description": "Single drone stability analysis request",
        "type": "object",
        "required": ["telemetry"],
        "properties": {
            "matchId": { "type": ["string", "integer"] },
            "roundNumber": { "type": "integer", "minimum": 0 },
            "telemetry": { "type": "array", "minItems": 1, "items": sample_json_schema() }
        }
    })
    .to_string()
}

fn batch_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "stability.batch_request",
        "description": "Team batch stability analysis request",
        "type": "object",
        "required": ["teams"],
        "properties": {
            "match_id": { "type": ["string", "integer"] },
            "teams": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "properties": {
                        "team_id": { "type": ["string", "integer"] },
                        "drones": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "drone_id": { "type": ["string", "integer"] },
                                    "logs": { "type": "array", "items": sample_json_schema() }
                                }
                            }
                        }
                    }
                }
            }
        }
    })
    .to_string()
}

fn single_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "stability.response",
        "description": "Single drone stability analysis response",
        "type": "object",
        "required": ["success"],
        "properties": {
            "success": { "type": "boolean" },
            "message": { "type": "string" },
            "matchId": { "type": ["string", "integer", "null"] },
            "roundNumber": { "type": ["integer", "null"] },
            "stabilityScore": { "type": "number", "minimum": 0, "maximum": 100 },
            "bonusPoints": { "type": "integer", "enum": [0, 5, 10, 15] },
            "flightQuality": {
                "type": "string",
                "enum": ["excellent", "good", "moderate", "poor", "insufficient data"]
            },
            "details": {
                "type": "object",
                "properties": {
                    "issues": { "type": "array", "items": { "type": "string" } },
                    "variance": { "type": "object" },
                    "smoothness": { "type": "object" },
                    "spikes": { "type": "object" },
                    "dataPoints": { "type": "integer" }
                }
            }
        }
    })
    .to_string()
}

fn batch_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "stability.batch_response",
        "description": "Team batch stability analysis response",
        "type": "object",
        "required": ["success"],
        "properties": {
            "success": { "type": "boolean" },
            "message": { "type": "string" },
            "match_id": { "type": ["string", "integer", "null"] },
            "results": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "team_id": { "type": ["string", "integer", "null"] },
                        "drones": { "type": "array", "items": drone_result_json_schema() },
                        "team_avg_stability": { "type": "number" }
                    }
                }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum StabilityCliError {
    Io(io::Error),
    Encode(ComputeError),
    Config(serde_json::Error),
    AnalysisFailed { status: u16, batch: bool },
}

impl From<io::Error> for StabilityCliError {
    fn from(e: io::Error) -> Self {
        StabilityCliError::Io(e)
    }
}

impl From<ComputeError> for StabilityCliError {
    fn from(e: ComputeError) -> Self {
        StabilityCliError::Encode(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<StabilityCliError> for CliError {
    fn from(e: StabilityCliError) -> Self {
        match e {
            StabilityCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            StabilityCliError::Encode(e) => CliError {
                code: "ENCODING_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            StabilityCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(
                    "Expected { min_samples, spike_threshold, spike_issue_limit, oscillation_ratio }"
                        .to_string(),
                ),
            },
            StabilityCliError::AnalysisFailed { status, batch } => CliError {
                code: "ANALYSIS_FAILED".to_string(),
                message: format!("Analysis returned a failure response (status {})", status),
                hint: Some(schema_hint(batch)),
            },
        }
    }
}

/// Command that describes the request shape a failed command expected
fn schema_hint(batch: bool) -> String {
    if batch {
        "Run 'stability schema input --batch' to check the request shape".to_string()
    } else {
        "Run 'stability schema input' to check the request shape".to_string()
    }
}
