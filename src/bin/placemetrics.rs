//! Placemetrics CLI - command-line interface for the feature engine
//!
//! Commands:
//! - features: Compute the feature table from a batch of position fixes
//! - validate: Validate raw fix records and report problems

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use placemetrics::config::{ConfigOverrides, MobilityConfig};
use placemetrics::error::MobilityError;
use placemetrics::types::PositionFix;
use placemetrics::{WindowedAggregator, ENGINE_VERSION};

/// Placemetrics - mobility and significant-place feature engine
#[derive(Parser)]
#[command(name = "placemetrics")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Compute mobility features from position fix streams", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the feature table from a batch of position fixes
    Features {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Configuration overrides file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Window rule, e.g. "M", "1w", "1d", "4h", "30min"
        #[arg(long)]
        resample_rule: Option<String>,

        /// Clustering neighborhood radius in meters
        #[arg(long)]
        eps: Option<f64>,

        /// Minimum cluster membership for a dense neighborhood
        #[arg(long)]
        min_samples: Option<usize>,

        /// Motion threshold in m/s
        #[arg(long)]
        speed_threshold: Option<f64>,

        /// Participant UTC offset for the nocturnal hour test, e.g. "+02:00"
        #[arg(long)]
        utc_offset: Option<String>,

        /// Group by (user, device) instead of user alone
        #[arg(long)]
        group_by_device: bool,
    },

    /// Validate raw fix records and report problems
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Configuration overrides file (JSON), for column names
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one fix per line)
    Ndjson,
    /// JSON array of fixes
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Features {
            input,
            output,
            input_format,
            config,
            resample_rule,
            eps,
            min_samples,
            speed_threshold,
            utc_offset,
            group_by_device,
        } => {
            let overrides = merge_overrides(
                load_overrides(config.as_deref()),
                resample_rule,
                eps,
                min_samples,
                speed_threshold,
                utc_offset,
                group_by_device,
            );
            overrides.and_then(|overrides| {
                let config = overrides.resolve().map_err(|e| e.to_string())?;
                run_features(&input, &output, &input_format, &config)
            })
        }
        Commands::Validate {
            input,
            input_format,
            config,
        } => load_overrides(config.as_deref()).and_then(|overrides| {
            let config = overrides.resolve().map_err(|e| e.to_string())?;
            run_validate(&input, &input_format, &config)
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn load_overrides(path: Option<&std::path::Path>) -> Result<ConfigOverrides, String> {
    match path {
        None => Ok(ConfigOverrides::default()),
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            serde_json::from_str(&text).map_err(|e| format!("bad config {}: {e}", path.display()))
        }
    }
}

fn merge_overrides(
    base: Result<ConfigOverrides, String>,
    resample_rule: Option<String>,
    eps: Option<f64>,
    min_samples: Option<usize>,
    speed_threshold: Option<f64>,
    utc_offset: Option<String>,
    group_by_device: bool,
) -> Result<ConfigOverrides, String> {
    let mut overrides = base?;
    // Direct flags win over the config file
    if resample_rule.is_some() {
        overrides.resample_rule = resample_rule;
    }
    if eps.is_some() {
        overrides.eps = eps;
    }
    if min_samples.is_some() {
        overrides.min_samples = min_samples;
    }
    if speed_threshold.is_some() {
        overrides.speed_threshold = speed_threshold;
    }
    if utc_offset.is_some() {
        overrides.utc_offset = utc_offset;
    }
    if group_by_device {
        overrides.group_by_device = Some(true);
    }
    Ok(overrides)
}

fn read_input(path: &std::path::Path) -> Result<String, String> {
    if path.as_os_str() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err("refusing to read fixes from an interactive terminal".to_string());
        }
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| format!("cannot read stdin: {e}"))?;
        Ok(buffer)
    } else {
        fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))
    }
}

fn load_fixes(
    path: &std::path::Path,
    format: &InputFormat,
    config: &MobilityConfig,
) -> Result<Vec<PositionFix>, String> {
    let text = read_input(path)?;
    let values: Vec<serde_json::Value> = match format {
        InputFormat::Json => serde_json::from_str(&text).map_err(|e| format!("bad JSON: {e}"))?,
        InputFormat::Ndjson => {
            let mut values = Vec::new();
            for (line_no, line) in text.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let value = serde_json::from_str(line)
                    .map_err(|e| format!("bad JSON on line {}: {e}", line_no + 1))?;
                values.push(value);
            }
            values
        }
    };

    let mut fixes = Vec::with_capacity(values.len());
    for (row, value) in values.iter().enumerate() {
        let fix = parse_record(value, config).map_err(|e| format!("record {row}: {e}"))?;
        fixes.push(fix);
    }
    Ok(fixes)
}

/// Map one raw JSON record onto a [`PositionFix`], honoring the configured
/// latitude/longitude/speed field names.
fn parse_record(
    value: &serde_json::Value,
    config: &MobilityConfig,
) -> Result<PositionFix, MobilityError> {
    let user = value
        .get("user")
        .and_then(|v| v.as_str())
        .ok_or_else(|| MobilityError::MissingField("user".to_string()))?
        .to_string();
    let time_text = value
        .get("time")
        .and_then(|v| v.as_str())
        .ok_or_else(|| MobilityError::MissingField("time".to_string()))?;
    let time = time_text
        .parse()
        .map_err(|e| MobilityError::TimestampError(format!("{time_text}: {e}")))?;
    let latitude = value
        .get(&config.latitude_column)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| MobilityError::MissingField(config.latitude_column.clone()))?;
    let longitude = value
        .get(&config.longitude_column)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| MobilityError::MissingField(config.longitude_column.clone()))?;

    Ok(PositionFix {
        user,
        device: value
            .get("device")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        time,
        latitude,
        longitude,
        speed: value.get(&config.speed_column).and_then(|v| v.as_f64()),
        group: value
            .get("group")
            .and_then(|v| v.as_str())
            .map(str::to_string),
    })
}

fn run_features(
    input: &std::path::Path,
    output: &std::path::Path,
    format: &InputFormat,
    config: &MobilityConfig,
) -> Result<(), String> {
    let fixes = load_fixes(input, format, config)?;
    let rows = WindowedAggregator::with_defaults()
        .compute(&fixes, config)
        .map_err(|e| e.to_string())?;

    let mut lines = String::new();
    for row in &rows {
        let line = serde_json::to_string(row).map_err(|e| e.to_string())?;
        lines.push_str(&line);
        lines.push('\n');
    }

    if output.as_os_str() == "-" {
        io::stdout()
            .write_all(lines.as_bytes())
            .map_err(|e| format!("cannot write stdout: {e}"))?;
    } else {
        fs::write(output, lines).map_err(|e| format!("cannot write {}: {e}", output.display()))?;
    }

    eprintln!("{} fixes -> {} feature rows", fixes.len(), rows.len());
    Ok(())
}

fn run_validate(
    input: &std::path::Path,
    format: &InputFormat,
    config: &MobilityConfig,
) -> Result<(), String> {
    let fixes = load_fixes(input, format, config)?;
    placemetrics::aggregate::validate_fixes(&fixes).map_err(|e| e.to_string())?;
    println!("{} fixes OK", fixes.len());
    Ok(())
}
