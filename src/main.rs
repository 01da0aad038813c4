//! Xray Cloud から JQL に一致するテストを取得し、ステップ・事前条件・
//! カスタムフィールドを XLSX に書き出すコマンド。

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use xray_export::config::{DEFAULT_PAGE_SIZE, DEFAULT_SAMPLE_SIZE};
use xray_export::{
    Config, Error, XrayClient, collect_rows, diagnose, validate_output_path, write_diagnostics,
    write_export,
};

#[derive(Parser, Debug)]
#[command(name = "xray-export")]
#[command(about = "Export Xray tests (steps, preconditions, custom fields) to XLSX", long_about = None)]
struct Args {
    /// Output file name
    #[arg(long, value_name = "PATH")]
    outfile: Option<PathBuf>,

    /// Write field_diagnostics.xlsx listing every custom field of a few sample tests
    #[arg(long)]
    diagnose_fields: bool,

    /// Number of tests to fetch per request
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..))]
    limit: u32,

    /// Number of tests sampled by --diagnose-fields
    #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE, value_parser = clap::value_parser!(u32).range(1..))]
    sample_size: u32,

    /// Read settings from this file instead of ./.env
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Increase log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::WARN
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    debug!("Tracing initialized with level: {}", level);
}

fn load_env_file(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => dotenv::from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => {
            if let Ok(path) = dotenv::dotenv() {
                debug!("Loaded settings from {}", path.display());
            }
        }
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    load_env_file(args.env_file.as_deref())?;

    let config = Config::from_env()?
        .outfile(args.outfile)
        .diagnose(args.diagnose_fields)
        .page_size(args.limit)?
        .sample_size(args.sample_size)?;
    debug!(?config, "Configuration loaded");

    // 取得後に書き込めないと全て無駄になるので先に確認する
    let output = config.output_path().to_path_buf();
    validate_output_path(&output)?;

    info!("Using Client ID: {}", config.masked_client_id());
    info!("Using JQL: {}", config.jql);

    info!("[1/3] Authenticating...");
    let client = XrayClient::connect(&config).await?;
    info!(" -> OK");

    if config.diagnose {
        return run_diagnostics(&client, &config, &output).await;
    }

    info!("[2/3] Fetching tests...");
    let report = collect_rows(&client, &config.jql, config.page_size, &config.custom_fields).await?;
    info!(" -> {} test issues fetched", report.issue_count);

    if !report.skipped.is_empty() {
        warn!("{} tests could not be fetched and were skipped:", report.skipped.len());
        for skipped in &report.skipped {
            warn!("  {}: {}", skipped.issue_key, skipped.reason);
        }
    }

    info!("[3/3] Writing Excel...");
    write_export(&report.rows, &config.custom_fields, &output)?;

    if report.skipped.is_empty() {
        println!("Done. Saved: {} ({} rows)", output.display(), report.rows.len());
    } else {
        println!(
            "Done. Saved: {} ({} rows, {} of {} tests skipped)",
            output.display(),
            report.rows.len(),
            report.skipped.len(),
            report.issue_count
        );
    }
    Ok(())
}

async fn run_diagnostics(client: &XrayClient, config: &Config, output: &Path) -> Result<()> {
    info!("[2/3] Fetching sample tests for field diagnostics...");
    let report = diagnose(client, &config.jql, config.sample_size).await?;

    for skipped in &report.skipped {
        warn!("Skipped {}: {}", skipped.issue_key, skipped.reason);
    }

    info!("[3/3] Writing diagnostic Excel file...");
    write_diagnostics(&report.rows, output)?;

    println!("Done. Saved: {}", output.display());
    println!(
        "Found {} custom fields in {} sample tests. Copy the field ids you need into XRAY_CUSTOM_FIELDS.",
        report.field_ids.len(),
        report.sampled.len()
    );
    Ok(())
}

fn report_error(err: &anyhow::Error) {
    let Some(error) = err.downcast_ref::<Error>() else {
        eprintln!("Error: {:#}", err);
        return;
    };

    eprintln!("Error: {}", error);
    if error.is_unauthorized() {
        eprintln!("Check that XRAY_CLIENT_ID and XRAY_CLIENT_SECRET in your .env file are correct.");
    } else if error.is_timeout() {
        eprintln!("The Xray API did not respond in time. Raise XRAY_TIMEOUT_SECS or try again later.");
    }
    if error.is_write_failure() {
        eprintln!("The fetched data was not saved. Fix the output path and run the export again.");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose, args.quiet);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}
