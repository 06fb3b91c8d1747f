//! Configuration module for the covid-query server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Command-line arguments for the query server
#[derive(Parser, Debug)]
#[command(name = "covid-query")]
#[command(author = "covid-query authors")]
#[command(version = "0.1.0")]
#[command(about = "Serves JSON queries over a COVID-19 statistics dataset", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 0.0.0.0:4040)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Path to the CSV dataset loaded at startup
    #[arg(short = 'd', long)]
    pub dataset: Option<PathBuf>,

    /// Number of worker threads (defaults to number of CPU cores)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Log level (trace, debug, info, warn, error) [default: info]
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Number of worker threads
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            workers: None,
        }
    }
}

/// Dataset-related configuration
#[derive(Debug, Deserialize)]
pub struct DatasetConfig {
    /// CSV file read once at startup
    #[serde(default = "default_dataset_path")]
    pub path: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:4040".to_string()
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("data.csv")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub dataset: PathBuf,
    pub workers: Option<usize>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    /// Resolve already-parsed CLI arguments against the TOML file they name.
    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Ok(Config {
            listen: cli.listen.unwrap_or(toml_config.server.listen),
            dataset: cli.dataset.unwrap_or(toml_config.dataset.path),
            workers: cli.workers.or(toml_config.server.workers),
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        })
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.listen, "0.0.0.0:4040");
        assert_eq!(config.server.workers, None);
        assert_eq!(config.dataset.path, PathBuf::from("data.csv"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            listen = "127.0.0.1:5050"
            workers = 2

            [dataset]
            path = "/srv/covid/pakistan.csv"

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:5050");
        assert_eq!(config.server.workers, Some(2));
        assert_eq!(config.dataset.path, PathBuf::from("/srv/covid/pakistan.csv"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_defaults_without_file() {
        let cli = CliArgs::parse_from(["covid-query"]);
        let config = Config::from_args(cli).unwrap();
        assert_eq!(config.listen, "0.0.0.0:4040");
        assert_eq!(config.dataset, PathBuf::from("data.csv"));
        assert_eq!(config.workers, None);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nlisten = \"127.0.0.1:6000\"\nworkers = 8\n\n[dataset]\npath = \"from-file.csv\"\n\n[logging]\nlevel = \"warn\""
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let cli = CliArgs::parse_from([
            "covid-query",
            "--config",
            &path,
            "--listen",
            "127.0.0.1:7000",
            "--log-level",
            "trace",
        ]);
        let config = Config::from_args(cli).unwrap();

        assert_eq!(config.listen, "127.0.0.1:7000");
        assert_eq!(config.dataset, PathBuf::from("from-file.csv"));
        assert_eq!(config.workers, Some(8));
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn test_explicit_info_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"warn\"").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let cli = CliArgs::parse_from(["covid-query", "--config", &path]);
        assert_eq!(Config::from_args(cli).unwrap().log_level, "warn");

        let cli = CliArgs::parse_from(["covid-query", "--config", &path, "--log-level", "info"]);
        assert_eq!(Config::from_args(cli).unwrap().log_level, "info");
    }

    #[test]
    fn test_missing_config_file() {
        let cli = CliArgs::parse_from(["covid-query", "--config", "/nonexistent/covid.toml"]);
        let err = Config::from_args(cli).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(_, _)));
        assert!(err.to_string().contains("/nonexistent/covid.toml"));
    }
}
