//! ETL CLI - Command-line interface for the ETL recorder
//!
//! Commands:
//! - replay: Replay a captured input event stream into a session payload
//! - validate: Validate an input event stream
//! - doctor: Diagnose configuration and runtime health
//! - schema: Print input or output schema information

use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use etl_recorder::schema::{validate_events, InputEvent, InputEventAdapter, Replayer};
use etl_recorder::types::PAYLOAD_VERSION;
use etl_recorder::{
    LiveSession, RecorderConfig, RecorderError, SessionLogEncoder, PRODUCER_NAME,
    RECORDER_VERSION,
};

/// ETL - Keystroke, pause and gaze session recorder
#[derive(Parser)]
#[command(name = "etl")]
#[command(version = RECORDER_VERSION)]
#[command(about = "Replay and inspect writing-session telemetry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a captured event stream into a session payload
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,

        /// Recorder configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Inactivity threshold for pauses, in milliseconds
        #[arg(long)]
        pause_threshold_ms: Option<f64>,

        /// Minimum dwell segment duration, in milliseconds
        #[arg(long)]
        min_dwell_ms: Option<f64>,

        /// Gaze sampling interval recorded in the payload metadata
        #[arg(long)]
        gaze_sample_interval_ms: Option<u64>,
    },

    /// Validate an input event stream
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and runtime health
    Doctor {
        /// Check a recorder configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
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
    /// Input event stream schema
    Input,
    /// Session payload schema (etl-1.0)
    Output,
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

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

fn run(cli: Cli) -> Result<(), EtlCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            input_format,
            output_format,
            config,
            pause_threshold_ms,
            min_dwell_ms,
            gaze_sample_interval_ms,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(ms) = pause_threshold_ms {
                config = config.with_pause_threshold_ms(ms);
            }
            if let Some(ms) = min_dwell_ms {
                config = config.with_min_dwell_ms(ms);
            }
            if let Some(ms) = gaze_sample_interval_ms {
                config = config.with_gaze_sample_interval_ms(ms);
            }
            cmd_replay(&input, &output, input_format, output_format, config)
        }
        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),
        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn cmd_replay(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: RecorderConfig,
) -> Result<(), EtlCliError> {
    let events = read_events(input, &input_format)?;
    if events.is_empty() {
        return Err(EtlCliError::NoEvents);
    }

    let replayer = Replayer::new(config)?;
    let log = replayer.replay(&events)?;
    info!(
        "replayed {} events into {} records over {:.0}ms",
        events.len(),
        log.record_count(),
        log.duration_ms()
    );

    let encoder = match output_format {
        OutputFormat::Json => SessionLogEncoder::new(),
        OutputFormat::JsonPretty => SessionLogEncoder::pretty(),
    };
    let output_data = encoder.encode_to_json(&log)? + "\n";

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), EtlCliError> {
    let events = read_events(input, &input_format)?;

    let results = validate_events(&events);

    // An event can fail more than one check
    let mut invalid_indices: Vec<usize> = results.iter().map(|r| r.index).collect();
    invalid_indices.dedup();

    let report = ValidationReport {
        total_events: events.len(),
        valid_events: events.len() - invalid_indices.len(),
        invalid_events: invalid_indices.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                kind: r.kind.to_string(),
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total events:   {}", report.total_events);
        println!("Valid events:   {}", report.valid_events);
        println!("Invalid events: {}", report.invalid_events);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - {} event (index {}): {}", err.kind, err.index, err.error);
            }
        }
    }

    if report.invalid_events > 0 {
        Err(EtlCliError::ValidationFailed(report.invalid_events))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), EtlCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "recorder_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Recorder version {}", RECORDER_VERSION),
    });

    checks.push(DoctorCheck {
        name: "payload_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Output payload: {}", PAYLOAD_VERSION),
    });

    let mut recorder_config = RecorderConfig::default();
    if let Some(config_path) = config {
        if config_path.exists() {
            match load_config(Some(config_path)) {
                Ok(loaded) => {
                    checks.push(DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Config valid (pause threshold {}ms, min dwell {}ms)",
                            loaded.pause_threshold_ms, loaded.min_dwell_ms
                        ),
                    });
                    recorder_config = loaded;
                }
                Err(e) => {
                    checks.push(DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: CliError::from(e).message,
                    });
                }
            }
        } else {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist; defaults apply".to_string(),
            });
        }
    }

    checks.push(check_live_driver(recorder_config));

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (replay from stdin ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: RECORDER_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("ETL Doctor Report");
        println!("=================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(EtlCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

/// Run a short live session on a local runtime to confirm timers and tasks work
fn check_live_driver(config: RecorderConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            return DoctorCheck {
                name: "live_driver".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot build async runtime: {}", e),
            }
        }
    };

    let result = runtime.block_on(async move {
        let session = LiveSession::new(config)?;
        session.start().await;
        session.record_text("ok", Some(2)).await;
        Ok::<_, RecorderError>(session.stop().await)
    });

    match result {
        Ok(Some(log)) if log.text_changes.len() == 1 => DoctorCheck {
            name: "live_driver".to_string(),
            status: CheckStatus::Ok,
            message: "Live session started and stopped cleanly".to_string(),
        },
        Ok(_) => DoctorCheck {
            name: "live_driver".to_string(),
            status: CheckStatus::Error,
            message: "Live session returned an incomplete log".to_string(),
        },
        Err(e) => DoctorCheck {
            name: "live_driver".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        },
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), EtlCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", serde_json::to_string_pretty(&input_json_schema())?);
            } else {
                println!("Input Schema: captured input events (NDJSON, tagged by \"kind\")");
                println!();
                println!("1. start   - {{ time, text?, layout? }}");
                println!("   - text seeds the diff baseline");
                println!("   - layout: {{ graph?, writer?, viewportWidth }} classifies gaze");
                println!();
                println!("2. keydown - {{ time, key, code, selectionStart, selectionEnd, textLen }}");
                println!();
                println!("3. input   - {{ time, text, selectionStart? }}");
                println!("   - full text after the input notification");
                println!();
                println!("4. gaze    - {{ time, x, y, side? }}");
                println!("   - side is left, right or unknown; classified from layout when absent");
                println!();
                println!("5. stop    - {{ time }}");
                println!("   - optional; streams without stop end at the last event");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", serde_json::to_string_pretty(&output_json_schema())?);
            } else {
                println!("Output Schema: {}", PAYLOAD_VERSION);
                println!();
                println!("- meta: {{ version, startedAt, endedAt, pauseThresholdMs, gazeSampleEveryMs, minDwellMs }}");
                println!("- keystrokes: [{{ time, key, code, selectionStart, selectionEnd, textLen }}]");
                println!("- textchanges: [{{ time, type, start, end, ..., cursorAfter }}]");
                println!("  - insert/delete: nChars, text");
                println!("  - replace: nCharsDel, nCharsIns, delText, insText");
                println!("- pauses: [{{ startTime, endTime, duration, cursorIndexAtPause }}]");
                println!("- gaze_raw: [{{ time, x, y, side }}]");
                println!("- gaze_states: [{{ side, startTime, endTime, duration }}]");
            }
        }
    }

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, EtlCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_events(input: &Path, format: &InputFormat) -> Result<Vec<InputEvent>, EtlCliError> {
    let input_data = read_input(input)?;
    let events = match format {
        InputFormat::Ndjson => InputEventAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => InputEventAdapter::parse_array(&input_data)?,
    };
    Ok(events)
}

fn load_config(path: Option<&Path>) -> Result<RecorderConfig, EtlCliError> {
    match path {
        Some(path) => Ok(RecorderConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(RecorderConfig::default()),
    }
}

fn input_json_schema() -> serde_json::Value {
    let time = serde_json::json!({ "type": "number" });
    let index = serde_json::json!({ "type": "integer", "minimum": 0 });

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "etl input event",
        "oneOf": [
            {
                "type": "object",
                "required": ["kind", "time"],
                "properties": {
                    "kind": { "const": "start" },
                    "time": time,
                    "text": { "type": "string" },
                    "layout": {
                        "type": "object",
                        "required": ["viewportWidth"],
                        "properties": {
                            "viewportWidth": { "type": "number" },
                            "graph": { "$ref": "#/$defs/rect" },
                            "writer": { "$ref": "#/$defs/rect" }
                        }
                    }
                }
            },
            {
                "type": "object",
                "required": ["kind", "time", "key", "code", "selectionStart", "selectionEnd", "textLen"],
                "properties": {
                    "kind": { "const": "keydown" },
                    "time": time,
                    "key": { "type": "string" },
                    "code": { "type": "string" },
                    "selectionStart": index,
                    "selectionEnd": index,
                    "textLen": index
                }
            },
            {
                "type": "object",
                "required": ["kind", "time", "text"],
                "properties": {
                    "kind": { "const": "input" },
                    "time": time,
                    "text": { "type": "string" },
                    "selectionStart": index
                }
            },
            {
                "type": "object",
                "required": ["kind", "time", "x", "y"],
                "properties": {
                    "kind": { "const": "gaze" },
                    "time": time,
                    "x": { "type": "number" },
                    "y": { "type": "number" },
                    "side": { "enum": ["left", "right", "unknown"] }
                }
            },
            {
                "type": "object",
                "required": ["kind", "time"],
                "properties": {
                    "kind": { "const": "stop" },
                    "time": time
                }
            }
        ],
        "$defs": {
            "rect": {
                "type": "object",
                "required": ["left", "top", "right", "bottom"],
                "properties": {
                    "left": { "type": "number" },
                    "top": { "type": "number" },
                    "right": { "type": "number" },
                    "bottom": { "type": "number" }
                }
            }
        }
    })
}

fn output_json_schema() -> serde_json::Value {
    let interval = serde_json::json!({
        "type": "object",
        "required": ["startTime", "endTime", "duration"],
        "properties": {
            "startTime": { "type": "number" },
            "endTime": { "type": "number" },
            "duration": { "type": "number", "minimum": 0 }
        }
    });

    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": PAYLOAD_VERSION,
        "type": "object",
        "required": ["meta", "keystrokes", "textchanges", "pauses", "gaze_raw", "gaze_states"],
        "properties": {
            "meta": {
                "type": "object",
                "required": ["version", "startedAt", "endedAt", "pauseThresholdMs", "gazeSampleEveryMs"],
                "properties": {
                    "version": { "const": PAYLOAD_VERSION },
                    "startedAt": { "type": "number" },
                    "endedAt": { "type": "number" },
                    "pauseThresholdMs": { "type": "number" },
                    "gazeSampleEveryMs": { "type": "integer" },
                    "minDwellMs": { "type": "number" }
                }
            },
            "keystrokes": { "type": "array" },
            "textchanges": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["time", "type", "start", "end"],
                    "properties": {
                        "type": { "enum": ["insert", "delete", "replace"] },
                        "cursorAfter": { "type": ["integer", "null"] }
                    }
                }
            },
            "pauses": { "type": "array", "items": interval },
            "gaze_raw": { "type": "array" },
            "gaze_states": { "type": "array", "items": interval }
        }
    })
}

// Error types

#[derive(Debug)]
enum EtlCliError {
    Io(io::Error),
    Recorder(RecorderError),
    Json(serde_json::Error),
    NoEvents,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for EtlCliError {
    fn from(e: io::Error) -> Self {
        EtlCliError::Io(e)
    }
}

impl From<RecorderError> for EtlCliError {
    fn from(e: RecorderError) -> Self {
        EtlCliError::Recorder(e)
    }
}

impl From<serde_json::Error> for EtlCliError {
    fn from(e: serde_json::Error) -> Self {
        EtlCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<EtlCliError> for CliError {
    fn from(e: EtlCliError) -> Self {
        match e {
            EtlCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            EtlCliError::Recorder(e) => {
                let (code, hint) = match &e {
                    RecorderError::ParseError(_) | RecorderError::JsonError(_) => (
                        "PARSE_ERROR",
                        "Ensure input matches the event schema ('etl schema input')",
                    ),
                    RecorderError::InvalidConfig(_) => {
                        ("CONFIG_ERROR", "Run 'etl doctor --config <file>' for details")
                    }
                    RecorderError::InvalidEventStream(_) => {
                        ("VALIDATION_ERROR", "Run 'etl validate' for details")
                    }
                    RecorderError::EncodingError(_) | RecorderError::SensorError(_) => {
                        ("RECORDER_ERROR", "Re-run with RUST_LOG=debug for details")
                    }
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            EtlCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            EtlCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            EtlCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} events failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            EtlCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_events: usize,
    valid_events: usize,
    invalid_events: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    kind: String,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
