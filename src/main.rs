//! ndrhunt: network traffic hunting report
//!
//! Reads an EVE-style JSON event log, classifies hosts and destinations
//! (cloud services, Windows, IoT, Linux) and writes a Markdown analyst log.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use ndrhunt::analysis::Analyzer;
use ndrhunt::config::AppConfig;
use ndrhunt::utils::report_file_stamp;
use ndrhunt::{schema, store};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(name = "ndrhunt")]
#[command(about = "Classify hosts and destinations from network event logs", long_about = None)]
struct Cli {
    /// Log file, or a directory holding rotated logs (the newest is used)
    #[arg(value_name = "PATH")]
    path: PathBuf,
    /// Directory the report is written to
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
    /// Print the report to stdout instead of writing a file
    #[arg(long)]
    stdout: bool,
    /// Override logging level (e.g., error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    // 1. Load Configuration
    let mut cfg = match AppConfig::new() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("Hint: check ndrhunt.toml and NDRHUNT__* environment overrides.");
            return Err(err).context("Failed to load configuration");
        }
    };
    if let Some(level) = cli.log_level {
        if !level.trim().is_empty() {
            cfg.logging.level = level;
        }
    }
    if let Some(dir) = cli.output_dir {
        cfg.report.directory = dir;
    }

    // 2. Initialize Logging (guard keeps the file writer alive)
    let _guard = init_logging(&cfg);

    // 3. Open the data source
    let store = match store::open(&cli.path, cfg.source.extensions.as_slice()) {
        Ok(store) => store,
        Err(err) => {
            error!(target: "ndrhunt", error = %err, "No usable data source");
            eprintln!("Usage: ndrhunt <log_file_or_dir>");
            eprintln!("Error: {}", err);
            return Ok(ExitCode::FAILURE);
        }
    };

    // 4. Analyze
    let schema = schema::probe(&store).context("Failed to read column catalog")?;
    let report = Analyzer::new(&store, schema, cfg.limits).run();
    let text = report.render();

    // 5. Emit
    if cli.stdout {
        print!("{}", text);
        return Ok(ExitCode::SUCCESS);
    }

    fs::create_dir_all(&cfg.report.directory).with_context(|| {
        format!(
            "Failed to create report directory {}",
            cfg.report.directory.display()
        )
    })?;
    let filename = format!(
        "{}-{}.md",
        cfg.report.filename_prefix,
        report_file_stamp(&Local::now())
    );
    let path = cfg.report.directory.join(filename);
    fs::write(&path, text)
        .with_context(|| format!("Failed to write report {}", path.display()))?;

    info!(target: "ndrhunt", report = %path.display(), "Report written");
    Ok(ExitCode::SUCCESS)
}

/// Initialize logging: rolling file layer plus optional stderr console
/// Returns a WorkerGuard that MUST be kept alive for the duration of the program
fn init_logging(cfg: &AppConfig) -> tracing_appender::non_blocking::WorkerGuard {
    if let Err(err) = fs::create_dir_all(&cfg.logging.directory).with_context(|| {
        format!(
            "Failed to create log directory {}",
            cfg.logging.directory.display()
        )
    }) {
        eprintln!("{:#}", err);
    }

    let app_file = rolling::daily(&cfg.logging.directory, &cfg.logging.filename);
    let (app_writer, app_guard) = tracing_appender::non_blocking(app_file);

    let app_layer = fmt::layer()
        .with_writer(app_writer)
        .compact()
        .with_ansi(false)
        .with_target(true)
        .with_filter(EnvFilter::new(&cfg.logging.level));

    // Console goes to stderr so `--stdout` output stays clean
    let console_layer = if cfg.logging.console_output {
        Some(
            fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_target(false)
                .with_filter(EnvFilter::new(&cfg.logging.level)),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(app_layer)
        .with(console_layer)
        .init();

    app_guard
}
