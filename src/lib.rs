use std::io;
use std::path::PathBuf;

use chrono::{Datelike, Local};
use log::{info, warn};
use thiserror::Error;

pub mod config;
pub mod data;
pub mod load;
pub mod logging;
pub mod normalize;

use config::{AppConfig, ConfigError};
use data::InputError;
use load::mysql::MySqlSession;
use load::LoadError;
use normalize::{NormalizedTable, Normalizer, TransformError};

/// A failed run, tagged with the stage that aborted it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Input(#[from] InputError),
    #[error("{0}")]
    Transform(#[from] TransformError),
    #[error("{0}")]
    Load(#[from] LoadError),
    #[error("failed to write normalized rows: {0}")]
    Output(#[source] csv::Error),
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Config(_) => "config",
            PipelineError::Input(_) => "input",
            PipelineError::Transform(_) => "transform",
            PipelineError::Load(_) => "load",
            PipelineError::Output(_) => "output",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config_path: PathBuf,
    pub input_path: PathBuf,
    /// ISO week to load into; the current week when unset.
    pub week: Option<u32>,
}

/// Configuration plus the cleaned rows, ready to load.
#[derive(Debug)]
pub struct Prepared {
    pub config: AppConfig,
    pub table: NormalizedTable,
}

pub fn current_iso_week() -> u32 {
    Local::now().iso_week().week()
}

/// Reads the configuration and the export, and normalizes it. Nothing touches
/// the database here, so any failure leaves the weekly tables as they were.
pub fn prepare(options: &RunOptions) -> Result<Prepared, PipelineError> {
    let config = AppConfig::load(&options.config_path)?;
    info!(
        "configuration read, USD->CAD rate: {}",
        config.settings().usd_to_cad_rate()
    );

    info!("cleaning stage started, input={}", options.input_path.display());
    let raw = data::read_csv(&options.input_path)?;
    let table = Normalizer::new(config.settings().usd_to_cad_rate()).normalize(&raw)?;
    info!("data cleaning finished, {} rows over {} columns", table.len(), table.columns.len());

    Ok(Prepared { config, table })
}

/// Prepares the rows and writes them to `writer` as CSV instead of loading
/// them. Returns the number of rows written.
pub fn dry_run<W: io::Write>(options: &RunOptions, writer: W) -> Result<usize, PipelineError> {
    let Prepared { table, .. } = prepare(options)?;
    data::write_csv(&table, writer).map_err(PipelineError::Output)?;

    Ok(table.len())
}

/// Runs every stage and returns the number of rows loaded.
pub async fn run(options: &RunOptions) -> Result<u64, PipelineError> {
    let Prepared { config, table } = prepare(options)?;

    info!("MySQL load stage started");
    let week = options.week.unwrap_or_else(current_iso_week);
    let mut session = MySqlSession::connect(&config.database().connect_options()).await?;
    let inserted = load::load(&mut session, &table, week).await?;

    if let Err(err) = session.close().await {
        warn!("failed to close the database connection cleanly, err={}", err);
    }
    info!("MySQL load succeeded");

    Ok(inserted)
}
