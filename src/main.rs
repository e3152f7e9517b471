use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use holdings_loader::logging::init_logging;
use holdings_loader::{dry_run, run, RunOptions};

/// Cleans a holdings CSV export and loads it into this week's portfolio table.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Change to this directory before resolving any other path
    #[arg(short = 'C', long)]
    directory: Option<PathBuf>,

    /// Path to the INI configuration file
    #[arg(short, long, default_value = "config.ini")]
    config: PathBuf,

    /// Path to the CSV export
    #[arg(short, long, default_value = "source/tipranks_raw.csv")]
    input: PathBuf,

    /// Directory the run's log file is written to
    #[arg(long, default_value = ".")]
    log_dir: PathBuf,

    /// Load into the table for this ISO week instead of the current one
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=53))]
    week: Option<u32>,

    /// Print the cleaned rows as CSV instead of loading them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(dir) = &cli.directory {
        std::env::set_current_dir(dir).with_context(|| format!("failed to change directory to {}", dir.display()))?;
    }

    init_logging(&cli.log_dir)?;
    info!("--- holdings clean and load started ---");

    let options = RunOptions {
        config_path: cli.config,
        input_path: cli.input,
        week: cli.week,
    };

    if cli.dry_run {
        let written =
            dry_run(&options, std::io::stdout()).inspect_err(|err| error!("{} stage failed: {}", err.stage(), err))?;
        info!("--- dry run finished, {} rows written, nothing loaded ---", written);
        return Ok(());
    }

    let inserted = run(&options).await.inspect_err(|err| error!("{} stage failed: {}", err.stage(), err))?;
    info!("--- holdings clean and load finished, {} rows loaded ---", inserted);

    Ok(())
}
