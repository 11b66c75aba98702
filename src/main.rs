//! modpatch - Batch patcher for game mod archives
//!
//! Usage:
//!   modpatch                         - Patch every recognized archive in ./mods
//!   modpatch --mods <dir>            - Use another mods directory
//!   modpatch --patch-data <dir>      - Use another patch data tree
//!   modpatch --rules <file.json>     - Add rules evaluated before the built-in ones

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;

use modpatch::config::{DEFAULT_MARKER, DEFAULT_MODS_DIR, DEFAULT_PATCH_DATA_DIR};
use modpatch::{format_size, Dispatcher, Disposition, PatcherConfig};

#[derive(Parser)]
#[command(name = "modpatch")]
#[command(version)]
#[command(about = "Patch game mod archives in bulk", long_about = None)]
struct Cli {
    /// Directory holding the mod archives
    #[arg(long, default_value = DEFAULT_MODS_DIR)]
    mods: PathBuf,

    /// Root of the replacement asset tree
    #[arg(long, default_value = DEFAULT_PATCH_DATA_DIR)]
    patch_data: PathBuf,

    /// Suffix appended to patched archive names
    #[arg(long, default_value = DEFAULT_MARKER)]
    marker: String,

    /// JSON file with extra dispatch rules
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<bool> {
    let config = PatcherConfig {
        mods_dir: cli.mods,
        patch_data_dir: cli.patch_data,
        marker: cli.marker,
        rules_file: cli.rules,
    };
    let dispatcher = Dispatcher::from_config(config).context("Failed to build rule table")?;

    println!("Scanning {}...", dispatcher.config().mods_dir.display());

    dispatcher
        .prepare_output_dir()
        .context("Failed to prepare output directory")?;
    let inputs = dispatcher.inputs().context("Failed to list mods")?;

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    )?);

    let summary = dispatcher.process_all(&inputs, |report| {
        let line = match &report.disposition {
            Disposition::Processed { output, .. } => {
                let size = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
                format!("{} ({})", report, format_size(size))
            }
            _ => report.to_string(),
        };
        pb.println(line);
        pb.set_message(report.file_name.clone());
        pb.inc(1);
    });

    pb.finish_with_message("Done");

    println!();
    println!(
        "Patched: {}, skipped: {}, unrecognized: {}, failed: {}",
        summary.processed, summary.skipped, summary.unrecognized, summary.failed
    );

    Ok(summary.failed == 0)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
