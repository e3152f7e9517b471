use std::path::{Path, PathBuf};
use std::str::FromStr;

use configparser::ini::Ini;
use getset::{CopyGetters, Getters};
use log::debug;
use rust_decimal::Decimal;
use sqlx::mysql::MySqlConnectOptions;
use thiserror::Error;

const DEFAULT_MYSQL_PORT: u16 = 3306;

#[derive(Debug, PartialEq, Error)]
pub enum ConfigError {
    #[error("failed to read '{path}': {message}")]
    Read { path: PathBuf, message: String },
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    #[error("missing key '{key}' in section [{section}]")]
    MissingKey { section: &'static str, key: &'static str },
    #[error("invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct DatabaseConfig {
    #[getset(get = "pub")]
    host: String,
    #[getset(get_copy = "pub")]
    port: u16,
    #[getset(get = "pub")]
    user: String,
    #[getset(get = "pub")]
    password: String,
    #[getset(get = "pub")]
    database: String,
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

#[derive(Debug, Clone, PartialEq, CopyGetters)]
pub struct Settings {
    #[getset(get_copy = "pub")]
    usd_to_cad_rate: Decimal,
}

/// Values read from `config.ini`: a `[database]` and a `[settings]` section.
#[derive(Debug, Clone, PartialEq, Getters)]
#[getset(get = "pub")]
pub struct AppConfig {
    database: DatabaseConfig,
    settings: Settings,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<AppConfig, ConfigError> {
        let mut ini = Ini::new();
        ini.load(path).map_err(|message| ConfigError::Read {
            path: path.to_path_buf(),
            message,
        })?;

        debug!("read configuration from {}", path.display());
        AppConfig::from_ini(&ini)
    }

    pub fn parse(text: &str) -> Result<AppConfig, ConfigError> {
        let mut ini = Ini::new();
        ini.read(text.to_string()).map_err(ConfigError::Parse)?;

        AppConfig::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<AppConfig, ConfigError> {
        let port = match ini.get("database", "port") {
            Some(port) => u16::from_str(port.trim()).map_err(|_| ConfigError::InvalidValue {
                key: "port",
                value: port,
                reason: "expected a TCP port number",
            })?,
            None => DEFAULT_MYSQL_PORT,
        };

        let database = DatabaseConfig {
            host: required(ini, "database", "host")?,
            port,
            user: required(ini, "database", "user")?,
            password: ini.get("database", "password").unwrap_or_default(),
            database: required(ini, "database", "database")?,
        };

        let rate = required(ini, "settings", "usd_to_cad_rate")?;
        let usd_to_cad_rate = match Decimal::from_str(rate.trim()) {
            Ok(value) if value > Decimal::ZERO => value,
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: "usd_to_cad_rate",
                    value: rate,
                    reason: "expected a positive decimal",
                })
            },
        };

        Ok(AppConfig {
            database,
            settings: Settings { usd_to_cad_rate },
        })
    }
}

fn required(ini: &Ini, section: &'static str, key: &'static str) -> Result<String, ConfigError> {
    match ini.get(section, key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingKey { section, key }),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    const CONFIG: &str = "
[database]
host = db.local
user = loader
password = secret
database = portfolio

[settings]
usd_to_cad_rate = 1.37
";

    #[test]
    fn test_parse_config() -> Result<()> {
        let config = AppConfig::parse(CONFIG)?;

        assert_eq!(config.database().host(), "db.local");
        assert_eq!(config.database().port(), 3306);
        assert_eq!(config.database().user(), "loader");
        assert_eq!(config.database().password(), "secret");
        assert_eq!(config.database().database(), "portfolio");
        assert_eq!(config.settings().usd_to_cad_rate(), dec!(1.37));

        Ok(())
    }

    #[test]
    fn test_parse_config_with_port() -> Result<()> {
        let config = AppConfig::parse(&CONFIG.replace("user = loader", "user = loader\nport = 3307"))?;

        assert_eq!(config.database().port(), 3307);

        Ok(())
    }

    #[test]
    fn test_missing_key() {
        let result = AppConfig::parse(&CONFIG.replace("host = db.local", ""));

        assert_eq!(
            result,
            Err(ConfigError::MissingKey {
                section: "database",
                key: "host"
            })
        );
    }

    #[test]
    fn test_invalid_rate() {
        for rate in ["-1.2", "0", "abc"] {
            let result = AppConfig::parse(&CONFIG.replace("1.37", rate));

            assert!(
                matches!(result, Err(ConfigError::InvalidValue { key: "usd_to_cad_rate", .. })),
                "rate {rate} should be rejected"
            );
        }
    }

    #[test]
    fn test_load_missing_file() {
        let result = AppConfig::load(Path::new("does/not/exist.ini"));

        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.ini");
        std::fs::write(&path, CONFIG)?;

        let config = AppConfig::load(&path)?;

        assert_eq!(config.settings().usd_to_cad_rate(), dec!(1.37));

        Ok(())
    }
}
