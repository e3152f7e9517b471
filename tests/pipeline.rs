use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Result};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

use holdings_loader::data::write_csv;
use holdings_loader::normalize::row::{Column, Currency};
use holdings_loader::{dry_run, prepare, PipelineError, RunOptions};

const CONFIG: &str = "
[database]
host = localhost
user = loader
password =
database = portfolio

[settings]
usd_to_cad_rate = 1.35
";

const EXPORT: &str = "\
Ticker,Name,No. of Shares,Holding Value,% of Portfolio,Highest Price Target
MSFT,Microsoft,5,\"$2,000.00\",40%,500.00 (High)
SHOP,Shopify,10,C$900,60%,
,,,,,
";

fn options(dir: &Path) -> RunOptions {
    RunOptions {
        config_path: dir.join("config.ini"),
        input_path: dir.join("source").join("tipranks_raw.csv"),
        week: Some(20),
    }
}

fn workspace(config: &str, export: Option<&str>) -> Result<tempfile::TempDir> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("config.ini"), config)?;
    if let Some(export) = export {
        fs::create_dir(dir.path().join("source"))?;
        fs::write(dir.path().join("source").join("tipranks_raw.csv"), export)?;
    }
    Ok(dir)
}

#[test]
fn test_prepare_cleans_export() -> Result<()> {
    let dir = workspace(CONFIG, Some(EXPORT))?;

    let prepared = prepare(&options(dir.path()))?;

    assert_eq!(prepared.config.settings().usd_to_cad_rate(), dec!(1.35));
    assert_eq!(
        prepared.table.columns,
        vec![
            Column::Ticker,
            Column::Name,
            Column::Shares,
            Column::HoldingValue,
            Column::PortfolioPct,
            Column::Currency,
            Column::HoldingValueCad,
            Column::HighestPriceTarget,
        ]
    );
    assert_eq!(prepared.table.len(), 2);

    let msft = &prepared.table.rows[0];
    assert_eq!(msft.currency, Some(Currency::Usd));
    assert_eq!(msft.holding_value_cad, Some(dec!(2700)));
    assert_eq!(msft.highest_price_target, Some(dec!(500)));

    let shop = &prepared.table.rows[1];
    assert_eq!(shop.currency, Some(Currency::Cad));
    assert_eq!(shop.holding_value_cad, Some(dec!(900)));
    assert_eq!(shop.highest_price_target, None);

    let mut out = Vec::new();
    write_csv(&prepared.table, &mut out)?;
    assert_eq!(
        String::from_utf8(out)?,
        "\
ticker,name,shares,holding_value,portfolio_pct,currency,holding_value_cad,highest_price_target
MSFT,Microsoft,5,2000.00,40,USD,2700.0000,500.00
SHOP,Shopify,10,900,60,CAD,900,
"
    );

    Ok(())
}

#[test]
fn test_prepare_reports_config_stage() -> Result<()> {
    let dir = workspace("[database]\nhost = localhost\n", Some(EXPORT))?;

    match prepare(&options(dir.path())) {
        Err(err) => assert_eq!(err.stage(), "config"),
        Ok(_) => bail!("incomplete configuration should abort the run"),
    }

    Ok(())
}

#[test]
fn test_prepare_reports_input_stage() -> Result<()> {
    let dir = workspace(CONFIG, None)?;

    match prepare(&options(dir.path())) {
        Err(err @ PipelineError::Input(_)) => assert_eq!(err.stage(), "input"),
        Err(err) => bail!("unexpected error: {err}"),
        Ok(_) => bail!("missing export should abort the run"),
    }

    Ok(())
}

#[test]
fn test_prepare_reports_transform_stage() -> Result<()> {
    let dir = workspace(CONFIG, Some("Symbol,Price\nAAPL,1\n"))?;

    match prepare(&options(dir.path())) {
        Err(err @ PipelineError::Transform(_)) => assert_eq!(err.stage(), "transform"),
        Err(err) => bail!("unexpected error: {err}"),
        Ok(_) => bail!("export without tickers should abort the run"),
    }

    Ok(())
}

struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_dry_run_writes_cleaned_rows() -> Result<()> {
    let dir = workspace(CONFIG, Some(EXPORT))?;

    let mut out = Vec::new();
    let written = dry_run(&options(dir.path()), &mut out)?;

    assert_eq!(written, 2);
    assert!(String::from_utf8(out)?.starts_with("ticker,name,shares,holding_value"));

    Ok(())
}

#[test]
fn test_dry_run_reports_output_stage() -> Result<()> {
    let dir = workspace(CONFIG, Some(EXPORT))?;

    match dry_run(&options(dir.path()), BrokenPipe) {
        Err(err @ PipelineError::Output(_)) => assert_eq!(err.stage(), "output"),
        Err(err) => bail!("unexpected error: {err}"),
        Ok(_) => bail!("a failing writer should abort the dry run"),
    }

    Ok(())
}
