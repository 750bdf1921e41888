//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Listening Survey - music similarity experiment runner
///
/// Runs participants through a fixed sequence of reference-vs-playlist
/// rating tasks and aggregates the stored responses.
///
/// Examples:
///   listening-survey run --tasks data.json
///   listening-survey run --state-file .session.json
///   listening-survey aggregate results/summary.csv
///   listening-survey init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .survey.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run one participant session in the terminal
    Run(RunArgs),

    /// Average all stored response records into one table
    Aggregate(AggregateArgs),

    /// Generate a default .survey.toml configuration file
    InitConfig,
}

/// Arguments for `run`.
#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// JSON task set to present
    #[arg(long, value_name = "FILE", env = "SURVEY_TASKS")]
    pub tasks: Option<PathBuf>,

    /// Directory completed records are written to
    #[arg(long, value_name = "DIR", env = "SURVEY_RECORDS_DIR")]
    pub records_dir: Option<PathBuf>,

    /// Keep session progress in this file so an interrupted session can resume
    #[arg(long, value_name = "FILE")]
    pub state_file: Option<PathBuf>,

    /// Seed for playlist display order (random per task if omitted)
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,
}

/// Arguments for `aggregate`.
#[derive(clap::Args, Debug, Clone)]
pub struct AggregateArgs {
    /// Output CSV file for the aggregate table
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Directory holding the response records
    #[arg(long, value_name = "DIR", env = "SURVEY_RECORDS_DIR")]
    pub records_dir: Option<PathBuf>,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Command::Aggregate(ref aggregate) = self.command {
            if aggregate.output.as_os_str().is_empty() {
                return Err("Output path must not be empty".to_string());
            }
            if aggregate.output.is_dir() {
                return Err(format!(
                    "Output path is a directory: {}",
                    aggregate.output.display()
                ));
            }
        }

        if let Some(ref config) = self.config {
            if !config.exists() {
                return Err(format!("Config file does not exist: {}", config.display()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(command: Command) -> Args {
        Args {
            config: None,
            verbose: false,
            quiet: false,
            command,
        }
    }

    #[test]
    fn test_parse_aggregate() {
        let args = Args::try_parse_from([
            "listening-survey",
            "aggregate",
            "out/summary.csv",
            "--records-dir",
            "responses",
        ])
        .unwrap();

        match args.command {
            Command::Aggregate(aggregate) => {
                assert_eq!(aggregate.output, PathBuf::from("out/summary.csv"));
                assert_eq!(aggregate.records_dir, Some(PathBuf::from("responses")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_run_with_global_flags() {
        let args = Args::try_parse_from([
            "listening-survey",
            "run",
            "--state-file",
            "state.json",
            "--seed",
            "3",
            "-v",
        ])
        .unwrap();

        assert!(args.verbose);
        match args.command {
            Command::Run(run) => {
                assert_eq!(run.state_file, Some(PathBuf::from("state.json")));
                assert_eq!(run.seed, Some(3));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_aggregate_requires_output() {
        assert!(Args::try_parse_from(["listening-survey", "aggregate"]).is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args(Command::InitConfig);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let args = make_args(Command::Aggregate(AggregateArgs {
            output: dir.path().to_path_buf(),
            records_dir: None,
        }));
        assert!(args.validate().is_err());
    }
}
