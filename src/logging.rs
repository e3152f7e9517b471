use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use env_logger::{Builder, Env, Target};

/// Copies every log line to stdout and to the run's log file.
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()?;
        self.file.flush()
    }
}

pub fn log_file_name() -> String {
    format!("log_{}.txt", Local::now().format("%Y-%m-%d_%H-%M-%S"))
}

/// Installs the global logger. Defaults to `info`; `RUST_LOG` overrides it.
/// Returns the path of the file this run logs to.
pub fn init_logging(log_dir: &Path) -> Result<PathBuf> {
    let path = log_dir.join(log_file_name());
    let file = File::create(&path).with_context(|| format!("failed to create log file {}", path.display()))?;

    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(Tee { file })))
        .try_init()
        .context("a logger is already installed")?;

    Ok(path)
}
