//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.survey.toml` files.

use crate::media::DEFAULT_URL_TEMPLATE;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".survey.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Session settings.
    #[serde(default)]
    pub survey: SurveyConfig,

    /// Record storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub aggregate: AggregateConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    /// JSON task set.
    #[serde(default = "default_tasks_file")]
    pub tasks_file: PathBuf,

    /// Playback URL template; `{id}` is replaced by the item id.
    #[serde(default = "default_media_url_template")]
    pub media_url_template: String,

    /// Required number of items per playlist, if any.
    #[serde(default)]
    pub playlist_len: Option<usize>,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            tasks_file: default_tasks_file(),
            media_url_template: default_media_url_template(),
            playlist_len: None,
        }
    }
}

fn default_tasks_file() -> PathBuf {
    PathBuf::from("data.json")
}

fn default_media_url_template() -> String {
    DEFAULT_URL_TEMPLATE.to_string()
}

/// Record storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory completed sessions are written to.
    #[serde(default = "default_records_dir")]
    pub records_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            records_dir: default_records_dir(),
        }
    }
}

fn default_records_dir() -> PathBuf {
    PathBuf::from("responses")
}

/// Aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Decimal places in the aggregate table.
    #[serde(default = "default_precision")]
    pub precision: usize,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            precision: default_precision(),
        }
    }
}

fn default_precision() -> usize {
    4
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values the CLI actually provides override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        use crate::cli::Command;

        match &args.command {
            Command::Run(run) => {
                if let Some(ref tasks) = run.tasks {
                    self.survey.tasks_file = tasks.clone();
                }
                if let Some(ref dir) = run.records_dir {
                    self.storage.records_dir = dir.clone();
                }
            }
            Command::Aggregate(aggregate) => {
                if let Some(ref dir) = aggregate.records_dir {
                    self.storage.records_dir = dir.clone();
                }
            }
            Command::InitConfig => {}
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Log level from the merged verbosity settings. `quiet` wins over `verbose`.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{AggregateArgs, Args, Command, RunArgs};

    fn args(command: Command) -> Args {
        Args {
            config: None,
            verbose: false,
            quiet: false,
            command,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.survey.tasks_file, PathBuf::from("data.json"));
        assert_eq!(config.storage.records_dir, PathBuf::from("responses"));
        assert_eq!(config.aggregate.precision, 4);
        assert!(config.survey.media_url_template.contains("{id}"));
        assert!(config.survey.playlist_len.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true

[survey]
tasks_file = "tasks/pilot.json"
playlist_len = 4

[storage]
records_dir = "/srv/survey/responses"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.survey.tasks_file, PathBuf::from("tasks/pilot.json"));
        assert_eq!(config.survey.playlist_len, Some(4));
        assert_eq!(
            config.storage.records_dir,
            PathBuf::from("/srv/survey/responses")
        );
        assert_eq!(config.aggregate.precision, 4);
    }

    #[test]
    fn test_merge_run_args() {
        let mut config = Config::default();
        config.merge_with_args(&args(Command::Run(RunArgs {
            tasks: Some(PathBuf::from("other.json")),
            records_dir: None,
            state_file: None,
            seed: None,
        })));

        assert_eq!(config.survey.tasks_file, PathBuf::from("other.json"));
        assert_eq!(config.storage.records_dir, PathBuf::from("responses"));
    }

    #[test]
    fn test_merge_aggregate_args() {
        let mut config = Config::default();
        let mut args = args(Command::Aggregate(AggregateArgs {
            output: PathBuf::from("out/summary.csv"),
            records_dir: Some(PathBuf::from("downloaded")),
        }));
        args.verbose = true;
        config.merge_with_args(&args);

        assert_eq!(config.storage.records_dir, PathBuf::from("downloaded"));
        assert!(config.general.verbose);
    }

    #[test]
    fn test_log_level_follows_config_verbose() {
        let mut config = Config::default();
        assert_eq!(config.log_level(false), tracing::Level::INFO);

        config.general.verbose = true;
        assert_eq!(config.log_level(false), tracing::Level::DEBUG);
        assert_eq!(config.log_level(true), tracing::Level::ERROR);

        let mut config = Config::default();
        let mut cli = args(Command::InitConfig);
        cli.verbose = true;
        config.merge_with_args(&cli);
        assert_eq!(config.log_level(false), tracing::Level::DEBUG);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[survey]"));
        assert!(toml_str.contains("[storage]"));
        assert!(toml_str.contains("[aggregate]"));
    }
}
