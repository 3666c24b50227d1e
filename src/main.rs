use anyhow::{anyhow, bail, Context, Result};
use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand};
use colored::*;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use loadwatch::config::AppConfig;
use loadwatch::export::{self, ExportFormat};
use loadwatch::import::load_athletes;
use loadwatch::logging::{init_logging, LogFormat, LogLevel};
use loadwatch::pipeline::{run_batch, AthleteInput, BatchConfig, BatchSummary};
use loadwatch::session::validate_session;
use loadwatch::{LoadWatchError, Severity};

/// loadwatch - Athlete Load and Readiness Monitoring CLI
///
/// Computes session load, ACWR, weekly monotony and strain, a readiness
/// index from wellness data, and alerts from CSV exports.
#[derive(Parser)]
#[command(name = "loadwatch")]
#[command(version)]
#[command(about = "Athlete load and readiness monitoring", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log format (pretty, json, compact)
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Input files and reporting window shared by the analysis commands
#[derive(clap::Args)]
struct InputArgs {
    /// Sessions CSV (date, duration_minutes, rpe_post[, athlete_id])
    #[arg(short, long)]
    sessions: PathBuf,

    /// Wellness CSV, long or wide layout
    #[arg(short, long)]
    wellness: Option<PathBuf>,

    /// Window start (YYYY-MM-DD); defaults to 27 days before --to
    #[arg(short, long)]
    from: Option<NaiveDate>,

    /// Window end (YYYY-MM-DD); defaults to the latest date in the data
    #[arg(short, long)]
    to: Option<NaiveDate>,

    /// Only analyse this athlete
    #[arg(short, long)]
    athlete: Option<String>,

    /// Worker threads for the batch
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse load, variability and readiness over a window
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Output format (json, csv, text)
        #[arg(short = 'F', long, default_value = "text")]
        format: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// CSV output carries weekly monotony and strain instead of daily series
        #[arg(long)]
        weekly: bool,
    },

    /// List alerts raised over a window
    Alerts {
        #[command(flatten)]
        input: InputArgs,

        /// Output format (json, csv, text)
        #[arg(short = 'F', long, default_value = "text")]
        format: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only show error-severity alerts
        #[arg(long)]
        errors_only: bool,
    },

    /// Compute the load of a single session
    Load {
        /// Session duration in minutes
        #[arg(short, long)]
        duration: f64,

        /// Post-session RPE (0-10)
        #[arg(short, long)]
        rpe: f64,
    },

    /// Manage the configuration file
    Config {
        /// Write a default configuration file
        #[arg(long)]
        init: bool,

        /// Print the active configuration
        #[arg(long)]
        show: bool,

        /// Overwrite an existing file with --init
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => AppConfig::load_or_default(),
    };

    let mut log_config = config.logging.clone();
    if cli.verbose > 0 {
        log_config.level = LogLevel::from_verbosity(cli.verbose);
    }
    if let Some(format) = &cli.log_format {
        log_config.format = format.parse::<LogFormat>().map_err(anyhow::Error::msg)?;
    }
    init_logging(&log_config).context("Failed to initialise logging")?;
    debug!(level = ?log_config.level, "Logging initialised");

    match cli.command {
        Commands::Analyze {
            input,
            format,
            output,
            weekly,
        } => {
            let format = format.parse::<ExportFormat>()?;
            let summary = analyse(&config, &input, output.is_none())?;
            let mut writer = open_output(output.as_deref()).context("Failed to open output file")?;

            match format {
                ExportFormat::Json => export::json::write_json(&summary, &mut writer)?,
                ExportFormat::Csv if weekly => {
                    export::csv::write_weekly_series(&summary.reports, &mut writer)?
                }
                ExportFormat::Csv => export::csv::write_daily_series(&summary.reports, &mut writer)?,
                ExportFormat::Text => export::text::write_batch(&summary, &mut writer)?,
            }
            writer.flush()?;
            report_failures(&summary);
        }

        Commands::Alerts {
            input,
            format,
            output,
            errors_only,
        } => {
            let format = format.parse::<ExportFormat>()?;
            let mut summary = analyse(&config, &input, output.is_none())?;
            if errors_only {
                for report in &mut summary.reports {
                    report.alerts.retain(|a| a.severity == Severity::Error);
                }
            }
            let mut writer = open_output(output.as_deref()).context("Failed to open output file")?;

            match format {
                ExportFormat::Json => {
                    let alerts = export::athlete_alerts(&summary.reports);
                    export::json::write_json(&alerts, &mut writer)?
                }
                ExportFormat::Csv => export::csv::write_alerts(&summary.reports, &mut writer)?,
                ExportFormat::Text => {
                    for report in &summary.reports {
                        if report.alerts.is_empty() {
                            continue;
                        }
                        writeln!(writer, "{}", report.athlete_id.bold())?;
                        for alert in &report.alerts {
                            writeln!(writer, "  {}", export::text::format_alert(alert))?;
                        }
                    }
                    let total = summary.total_alerts();
                    if total == 0 {
                        writeln!(writer, "{}", "✓ No alerts".green())?;
                    } else {
                        writeln!(writer, "{} alerts", total)?;
                    }
                }
            }
            writer.flush()?;
            report_failures(&summary);
        }

        Commands::Load { duration, rpe } => {
            let today = chrono::Local::now().date_naive();
            let session = validate_session(today, duration, rpe).map_err(|e| {
                error!(severity = ?e.severity(), error = %e, "Session rejected");
                anyhow!(e.user_message())
            })?;
            println!("{} {:.1} AU", "Session load:".bold(), session.load());
        }

        Commands::Config { init, show, force } => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(AppConfig::default_config_path);

            if init {
                if path.exists() && !force {
                    bail!(
                        "Config file {} already exists (use --force to overwrite)",
                        path.display()
                    );
                }
                let mut fresh = AppConfig::default();
                fresh.save_to_file(&path)?;
                println!("{} {}", "✓ Wrote configuration to".green(), path.display());
            }

            if show || !init {
                let rendered =
                    toml::to_string_pretty(&config).context("Failed to render configuration")?;
                println!("{}", format!("# {}", path.display()).dimmed());
                println!("{}", rendered);
            }
        }
    }

    Ok(())
}

/// Import the inputs, resolve the window, and run the batch
fn analyse(config: &AppConfig, args: &InputArgs, interactive: bool) -> Result<BatchSummary> {
    let mut inputs = load_athletes(&args.sessions, args.wellness.as_deref()).map_err(|e| {
        let e = LoadWatchError::from(e);
        error!(severity = ?e.severity(), error = %e, "Import failed");
        anyhow!(e.user_message())
    })?;

    if let Some(athlete) = &args.athlete {
        inputs.retain(|i| &i.athlete_id == athlete);
        if inputs.is_empty() {
            bail!("No data for athlete '{}'", athlete);
        }
    }

    let to = match args.to {
        Some(to) => to,
        None => latest_date(&inputs).context("Input files contain no dated rows")?,
    };
    let from = args.from.unwrap_or(to - Duration::days(27));
    info!(%from, %to, athletes = inputs.len(), "Analysing window");

    let batch_config = BatchConfig {
        num_threads: args.threads,
        show_progress: interactive && inputs.len() > 1,
    };
    let summary = run_batch(&inputs, from, to, &config.pipeline_config(), &batch_config)?;
    if summary.all_failed() {
        report_failures(&summary);
        bail!("All {} athletes failed", summary.failures.len());
    }

    Ok(summary)
}

fn latest_date(inputs: &[AthleteInput]) -> Option<NaiveDate> {
    inputs
        .iter()
        .flat_map(|i| {
            i.daily_loads
                .iter()
                .map(|l| l.date)
                .chain(i.wellness.iter().map(|s| s.date))
        })
        .max()
}

fn open_output(path: Option<&Path>) -> loadwatch::Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            colored::control::set_override(false);
            let file = File::create(path)?;
            debug!(path = %path.display(), "Writing output file");
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

fn report_failures(summary: &BatchSummary) {
    for (athlete_id, reason) in &summary.failures {
        eprintln!("{} {}: {}", "✗".red(), athlete_id, reason);
    }
}
