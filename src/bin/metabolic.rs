//! Metabolic CLI - Command-line interface for the adaptive metabolism engine
//!
//! Commands:
//! - estimate: Run one estimation cycle on a request document
//! - coach: Produce weekly coaching for a stored estimate
//! - run: Estimate and coach in one pass
//! - validate: Check a request's samples against the input contract
//! - doctor: Diagnose configuration and stored state

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use tracing_subscriber::EnvFilter;

use adaptive_metabolism::pipeline::{coach_with_config, estimate_request};
use adaptive_metabolism::request::SampleIssue;
use adaptive_metabolism::{
    EngineConfig, EngineError, EstimationRequest, MetabolicEstimate, UserProfile, WeeklyCoaching,
    ENGINE_VERSION, PRODUCER_NAME,
};

/// Metabolic - adaptive TDEE estimation and weekly nutrition coaching
#[derive(Parser)]
#[command(name = "metabolic")]
#[command(author = "Synheart AI Inc")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Estimate TDEE from weigh-ins and food logs", long_about = None)]
struct Cli {
    /// Log pipeline stages to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one estimation cycle on a request document
    Estimate {
        /// Request file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Engine configuration JSON (defaults when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Previous estimate, overriding any embedded in the request
        #[arg(long)]
        previous: Option<PathBuf>,

        /// Save the new estimate to file
        #[arg(long)]
        save_estimate: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Produce weekly coaching for a stored estimate
    Coach {
        /// Estimate file path
        #[arg(short, long)]
        estimate: PathBuf,

        /// User profile file path
        #[arg(short, long)]
        profile: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Engine configuration JSON (defaults when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Estimate and coach in one pass
    Run {
        /// Request file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Engine configuration JSON (defaults when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Previous estimate, overriding any embedded in the request
        #[arg(long)]
        previous: Option<PathBuf>,

        /// Save the new estimate to file
        #[arg(long)]
        save_estimate: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Check a request's samples against the input contract
    Validate {
        /// Request file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and stored state
    Doctor {
        /// Check a configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Check a stored estimate file
        #[arg(long)]
        estimate: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact single-line JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

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

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), MetabolicCliError> {
    match cli.command {
        Commands::Estimate {
            input,
            output,
            config,
            previous,
            save_estimate,
            output_format,
        } => {
            let config = load_config(config.as_deref())?;
            let estimate = run_estimate(&input, &config, previous.as_deref())?;
            if let Some(path) = save_estimate {
                fs::write(path, estimate.to_json()?)?;
            }
            write_output(&output, &format_output(&estimate, &output_format)?)
        }

        Commands::Coach {
            estimate,
            profile,
            output,
            config,
            output_format,
        } => {
            let config = load_config(config.as_deref())?;
            let estimate = MetabolicEstimate::from_json(&fs::read_to_string(estimate)?)?;
            let profile: UserProfile = serde_json::from_str(&fs::read_to_string(profile)?)?;
            let coaching = coach_with_config(&estimate, &profile, &config)?;
            write_output(&output, &format_output(&coaching, &output_format)?)
        }

        Commands::Run {
            input,
            output,
            config,
            previous,
            save_estimate,
            output_format,
        } => {
            let config = load_config(config.as_deref())?;
            let request = read_request(&input, previous.as_deref())?;
            let estimate = estimate_request(&request, &config, Utc::now())?;
            let coaching = coach_with_config(&estimate, &request.profile, &config)?;
            if let Some(path) = save_estimate {
                fs::write(path, estimate.to_json()?)?;
            }
            let cycle = CycleOutput { estimate, coaching };
            write_output(&output, &format_output(&cycle, &output_format)?)
        }

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Doctor {
            config,
            estimate,
            json,
        } => cmd_doctor(config.as_deref(), estimate.as_deref(), json),
    }
}

fn run_estimate(
    input: &Path,
    config: &EngineConfig,
    previous: Option<&Path>,
) -> Result<MetabolicEstimate, MetabolicCliError> {
    let request = read_request(input, previous)?;
    Ok(estimate_request(&request, config, Utc::now())?)
}

fn read_request(
    input: &Path,
    previous: Option<&Path>,
) -> Result<EstimationRequest, MetabolicCliError> {
    let mut request = EstimationRequest::from_json(&read_input(input)?)?;
    if let Some(path) = previous {
        request.previous = Some(MetabolicEstimate::from_json(&fs::read_to_string(path)?)?);
    }
    Ok(request)
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), MetabolicCliError> {
    let request = EstimationRequest::from_json(&read_input(input)?)?;
    let issues = request.validate();

    let report = ValidationReport {
        weight_samples: request.weights.len(),
        intake_samples: request.intakes.len(),
        issue_count: issues.len(),
        issues,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Weight samples: {}", report.weight_samples);
        println!("Intake samples: {}", report.intake_samples);
        println!("Issues:         {}", report.issue_count);

        if !report.issues.is_empty() {
            println!("\nIssues:");
            for issue in &report.issues {
                println!(
                    "  - {:?} #{} ({}): {}",
                    issue.series, issue.index, issue.date, issue.message
                );
            }
        }
    }

    if report.issue_count > 0 {
        Err(MetabolicCliError::ValidationFailed(report.issue_count))
    } else {
        Ok(())
    }
}

fn cmd_doctor(
    config: Option<&Path>,
    estimate: Option<&Path>,
    json: bool,
) -> Result<(), MetabolicCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Engine version {}", ENGINE_VERSION),
    });

    match config {
        Some(path) => checks.push(file_check("config", path, |content| {
            EngineConfig::from_json(content).map(|_| "Configuration valid".to_string())
        })),
        None => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "Using default configuration".to_string(),
        }),
    }

    if let Some(path) = estimate {
        checks.push(file_check("estimate", path, |content| {
            MetabolicEstimate::from_json(content).map(|e| {
                format!(
                    "Estimate valid (TDEE {:.0} kcal, confidence {:.2}, calculated {})",
                    e.current_tdee, e.confidence, e.last_calculated
                )
            })
        }));
    }

    // Check stdin is available (for piped requests)
    let stdin_message = if atty::is(atty::Stream::Stdin) {
        "stdin is a TTY (interactive mode)"
    } else {
        "stdin is a pipe (ready for --input -)"
    };
    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: stdin_message.to_string(),
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Metabolic Doctor Report");
        println!("=======================");
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

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(MetabolicCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn file_check(
    name: &str,
    path: &Path,
    parse: impl Fn(&str) -> Result<String, EngineError>,
) -> DoctorCheck {
    if !path.exists() {
        return DoctorCheck {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: format!("{} does not exist", path.display()),
        };
    }
    let (status, message) = match fs::read_to_string(path) {
        Ok(content) => match parse(&content) {
            Ok(message) => (CheckStatus::Ok, message),
            Err(e) => (CheckStatus::Error, e.to_string()),
        },
        Err(e) => (CheckStatus::Error, format!("Cannot read file: {}", e)),
    };
    DoctorCheck {
        name: name.to_string(),
        status,
        message,
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, MetabolicCliError> {
    match path {
        Some(path) => Ok(EngineConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(EngineConfig::default()),
    }
}

fn read_input(input: &Path) -> Result<String, MetabolicCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), MetabolicCliError> {
    if output.to_string_lossy() == "-" {
        println!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn format_output<T: Serialize>(value: &T, format: &OutputFormat) -> Result<String, MetabolicCliError> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(value)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
    }
}

#[derive(Debug)]
enum MetabolicCliError {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for MetabolicCliError {
    fn from(e: io::Error) -> Self {
        MetabolicCliError::Io(e)
    }
}

impl From<EngineError> for MetabolicCliError {
    fn from(e: EngineError) -> Self {
        MetabolicCliError::Engine(e)
    }
}

impl From<serde_json::Error> for MetabolicCliError {
    fn from(e: serde_json::Error) -> Self {
        MetabolicCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<MetabolicCliError> for CliError {
    fn from(e: MetabolicCliError) -> Self {
        match e {
            MetabolicCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            MetabolicCliError::Engine(e) => {
                let hint = match &e {
                    EngineError::InvalidProfile(_) => "Check age, height, weight and activity factor",
                    EngineError::InvalidConfig(_) => "Run 'metabolic doctor --config <file>'",
                    _ => "Ensure input matches the estimation request format",
                };
                CliError {
                    code: "ENGINE_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            MetabolicCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            MetabolicCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} sample issues found", count),
                hint: Some("Sort samples by date and remove duplicates".to_string()),
            },
            MetabolicCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct CycleOutput {
    estimate: MetabolicEstimate,
    coaching: WeeklyCoaching,
}

#[derive(Serialize)]
struct ValidationReport {
    weight_samples: usize,
    intake_samples: usize,
    issue_count: usize,
    issues: Vec<SampleIssue>,
}

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
