//! Blink Morse CLI - Command-line interface for the blink decoder
//!
//! Commands:
//! - decode: Decode a recorded observation stream (batch mode)
//! - run: Decode observations from stdin as they arrive (streaming mode)
//! - translate / encode: Message-level Morse conversion
//! - table: Print the Morse table
//! - doctor: Check configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use blink_morse::schema::{OutputRecord, StreamAdapter, StreamRecord, SCHEMA_VERSION};
use blink_morse::{
    decode_message, encode_message, BlinkDecoder, DecodeError, DecoderConfig, MorseTable,
    ToggleFlush, BLINK_MORSE_VERSION, PRODUCER_NAME,
};

/// Blink Morse - decode eye blinks into Morse code and text
#[derive(Parser)]
#[command(name = "blinkmorse")]
#[command(version = BLINK_MORSE_VERSION)]
#[command(about = "Decode eye-closed signals into Morse code and text", long_about = None)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Decoder settings shared by `decode` and `run`
#[derive(clap::Args, Clone)]
struct DecoderArgs {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Longest blink counted as a dot (ms)
    #[arg(long)]
    dot_max_ms: Option<f64>,

    /// Shortest blink that starts or stops a word (ms)
    #[arg(long)]
    word_toggle_ms: Option<f64>,

    /// Open-eye gap that closes a letter (ms)
    #[arg(long)]
    letter_gap_ms: Option<f64>,

    /// Decode a partial letter into the word on toggle instead of dropping it
    #[arg(long)]
    flush_on_toggle: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a recorded observation stream (batch mode)
    Decode {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        #[command(flatten)]
        decoder: DecoderArgs,

        /// Print decoder counters to stderr when done
        #[arg(long)]
        stats: bool,
    },

    /// Decode observations from stdin as they arrive (streaming mode)
    Run {
        #[command(flatten)]
        decoder: DecoderArgs,

        /// Flush output after each record
        #[arg(long, default_value = "true")]
        flush: bool,
    },

    /// Translate a Morse message to text
    Translate {
        /// Morse message, letters separated by spaces and words by " / "
        morse: String,
    },

    /// Encode text as a Morse message
    Encode {
        /// Text to encode
        text: String,
    },

    /// Print the Morse table
    Table {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check configuration and environment
    Doctor {
        /// Configuration file to check
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), BmCliError> {
    match cli.command {
        Commands::Decode {
            input,
            input_format,
            output_format,
            decoder,
            stats,
        } => cmd_decode(&input, input_format, output_format, &decoder, stats),

        Commands::Run { decoder, flush } => cmd_run(&decoder, flush),

        Commands::Translate { morse } => {
            println!("{}", decode_message(&morse));
            Ok(())
        }

        Commands::Encode { text } => {
            println!("{}", encode_message(&text));
            Ok(())
        }

        Commands::Table { json } => cmd_table(json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_decode(
    input: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    args: &DecoderArgs,
    print_stats: bool,
) -> Result<(), BmCliError> {
    let config = build_config(args)?;

    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let records = match input_format {
        InputFormat::Ndjson => StreamAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => StreamAdapter::parse_array(&input_data)?,
    };

    if records.is_empty() {
        return Err(BmCliError::NoRecords);
    }

    let failures = StreamAdapter::validate_records(&records);
    if let Some(first) = failures.first() {
        return Err(BmCliError::InvalidRecord {
            index: first.index,
            message: first.error.to_string(),
        });
    }

    let mut decoder = BlinkDecoder::new(config)?;
    let mut outputs = Vec::new();
    for record in &records {
        for event in decoder.apply(record)? {
            outputs.push(OutputRecord::new(event));
        }
    }

    print!("{}", format_output(&outputs, &output_format)?);

    let stats = decoder.finish();
    if print_stats {
        eprintln!("{}", serde_json::to_string_pretty(&stats)?);
    }

    Ok(())
}

fn cmd_run(args: &DecoderArgs, flush: bool) -> Result<(), BmCliError> {
    let config = build_config(args)?;
    let mut decoder = BlinkDecoder::new(config)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut skipped = 0usize;

    for (line_num, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let record: StreamRecord = serde_json::from_str(trimmed).map_err(|e| {
            BmCliError::ParseError(format!("Failed to parse line {}: {}", line_num + 1, e))
        })?;

        // A bad sample is dropped; decoding continues with the next one
        let events = match decoder.apply(&record) {
            Ok(events) => events,
            Err(e @ DecodeError::InvalidTimestamp { .. }) | Err(e @ DecodeError::ParseError(_)) => {
                warn!("Skipping line {}: {}", line_num + 1, e);
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        for event in events {
            writeln!(stdout, "{}", serde_json::to_string(&OutputRecord::stamped(event))?)?;
        }
        if flush {
            stdout.flush()?;
        }
    }

    stdout.flush()?;
    let stats = decoder.finish();
    debug!("Stream ended: {:?}, {} lines skipped", stats, skipped);

    Ok(())
}

fn cmd_table(json: bool) -> Result<(), BmCliError> {
    let table = MorseTable::standard();

    if json {
        let entries: Vec<TableEntry> = table
            .iter()
            .map(|(character, code)| TableEntry {
                character: character.to_string(),
                code: code.to_string(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for (character, code) in table.iter() {
            let shown = if character == ' ' {
                "SPACE".to_string()
            } else {
                character.to_string()
            };
            println!("{:<6} {}", shown, code);
        }
    }

    Ok(())
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), BmCliError> {
    let mut checks = Vec::new();

    match config_path {
        Some(path) if path.exists() => match fs::read_to_string(path) {
            Ok(content) => match DecoderConfig::from_json(&content) {
                Ok(config) => checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "dot <= {}ms, toggle >= {}ms, letter gap {}ms",
                        config.dot_max_ms, config.word_toggle_min_ms, config.letter_gap_ms
                    ),
                }),
                Err(e) => checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                }),
            },
            Err(e) => checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot read config file: {}", e),
            }),
        },
        Some(_) => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "Config file does not exist".to_string(),
        }),
        None => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "Using built-in defaults".to_string(),
        }),
    }

    let table = MorseTable::standard();
    checks.push(DoctorCheck {
        name: "morse_table".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} entries", table.len()),
    });

    // Check stdin is available (for streaming mode)
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
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: BLINK_MORSE_VERSION.to_string(),
        schema: SCHEMA_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Blink Morse Doctor Report");
        println!("=========================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("Schema:   {}", report.schema);
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

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(BmCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

/// Config file (or defaults) with command-line overrides applied
fn build_config(args: &DecoderArgs) -> Result<DecoderConfig, BmCliError> {
    let mut config = match &args.config {
        Some(path) => DecoderConfig::from_json(&fs::read_to_string(path)?)?,
        None => DecoderConfig::default(),
    };

    if let Some(dot_max_ms) = args.dot_max_ms {
        config.dot_max_ms = dot_max_ms;
    }
    if let Some(word_toggle_ms) = args.word_toggle_ms {
        config.word_toggle_min_ms = word_toggle_ms;
    }
    if let Some(letter_gap_ms) = args.letter_gap_ms {
        config.letter_gap_ms = letter_gap_ms;
    }
    if args.flush_on_toggle {
        config.toggle_flush = ToggleFlush::Flush;
    }

    config.validate()?;
    Ok(config)
}

fn format_output(outputs: &[OutputRecord], format: &OutputFormat) -> Result<String, BmCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut out = String::new();
            for record in outputs {
                out.push_str(&serde_json::to_string(record)?);
                out.push('\n');
            }
            Ok(out)
        }
        OutputFormat::Json => Ok(serde_json::to_string(outputs)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(outputs)? + "\n"),
    }
}

#[derive(serde::Serialize)]
struct TableEntry {
    character: String,
    code: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    schema: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

// Error types

#[derive(Debug)]
enum BmCliError {
    Io(io::Error),
    Decode(DecodeError),
    Json(serde_json::Error),
    NoRecords,
    InvalidRecord { index: usize, message: String },
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for BmCliError {
    fn from(e: io::Error) -> Self {
        BmCliError::Io(e)
    }
}

impl From<DecodeError> for BmCliError {
    fn from(e: DecodeError) -> Self {
        BmCliError::Decode(e)
    }
}

impl From<serde_json::Error> for BmCliError {
    fn from(e: serde_json::Error) -> Self {
        BmCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<BmCliError> for CliError {
    fn from(e: BmCliError) -> Self {
        match e {
            BmCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            BmCliError::Decode(e) => {
                let hint = match &e {
                    DecodeError::InvalidConfig(_) => {
                        "Thresholds must be positive with dot_max_ms < word_toggle_min_ms"
                    }
                    DecodeError::InvalidTimestamp { .. } => {
                        "Record times must be non-decreasing on a single clock"
                    }
                    _ => "Ensure input matches the blink.stream.v1 schema",
                };
                CliError {
                    code: "DECODE_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            BmCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            BmCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "Input contained no records".to_string(),
                hint: Some("Provide at least one observation".to_string()),
            },
            BmCliError::InvalidRecord { index, message } => CliError {
                code: "INVALID_RECORD".to_string(),
                message: format!("Record {}: {}", index, message),
                hint: Some(format!(
                    "t_ms must be finite; schema_version, if set, must be {}",
                    SCHEMA_VERSION
                )),
            },
            BmCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more checks failed".to_string(),
                hint: None,
            },
            BmCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Each line must be a blink.stream.v1 record".to_string()),
            },
        }
    }
}
