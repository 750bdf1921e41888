//! Listening Survey - music similarity experiment
//!
//! A CLI that runs participants through reference-vs-playlist rating
//! tasks and aggregates their stored responses into one mean table.
//!
//! Exit codes:
//!   0 - Success (including an aggregation run that found no data)
//!   1 - Runtime error (config, task set, persistence, malformed records, etc.)

mod analysis;
mod cli;
mod config;
mod error;
mod media;
mod models;
mod report;
mod session;
mod storage;

use anyhow::{Context, Result};
use cli::{AggregateArgs, Args, Command, RunArgs};
use config::{Config, CONFIG_FILE};
use error::SurveyError;
use indicatif::{ProgressBar, ProgressStyle};
use media::MediaLinks;
use models::{SessionState, TaskSet};
use session::{run_session, SessionController, SessionEnd, TerminalPresenter};
use std::io;
use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if let Command::InitConfig = args.command {
        return handle_init_config();
    }

    // Load configuration before logging so `[general] verbose` can raise the level
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(config.log_level(args.quiet));

    info!("Listening Survey v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    if let Err(e) = run_command(&config, &args) {
        error!("Command failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle init-config: generate a default .survey.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the task file, records directory, and more.");
    Ok(())
}

/// Initialize logging at `level`.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Dispatch the parsed command.
fn run_command(config: &Config, args: &Args) -> Result<()> {
    match &args.command {
        Command::Run(run) => run_survey(config, run),
        Command::Aggregate(aggregate) => run_aggregate(config, aggregate, args.quiet),
        Command::InitConfig => Ok(()),
    }
}

/// Load configuration from file or use defaults, then apply CLI overrides.
///
/// Runs before logging is set up, so problems go straight to stderr.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config {
        // Explicit config path
        Some(ref config_path) => Config::load(config_path)?,
        // Default location
        None => match Config::load_default() {
            Ok(Some(config)) => config,
            Ok(None) => Config::default(),
            Err(e) => {
                eprintln!("⚠️  Failed to load {}: {:#}. Using defaults.", CONFIG_FILE, e);
                Config::default()
            }
        },
    };

    config.merge_with_args(args);
    Ok(config)
}

/// Run one participant session in the terminal.
fn run_survey(config: &Config, run: &RunArgs) -> Result<()> {
    let tasks_file = &config.survey.tasks_file;
    let tasks = TaskSet::load(tasks_file, config.survey.playlist_len)
        .with_context(|| format!("Failed to load task set from {}", tasks_file.display()))?;
    info!("Loaded {} tasks from {}", tasks.total(), tasks_file.display());

    let store = storage::DirectoryStore::new(&config.storage.records_dir);
    let mut controller = SessionController::new(tasks, store);
    if let Some(seed) = run.seed {
        controller = controller.with_shuffle_seed(seed);
    }

    let existing = match run.state_file {
        Some(ref path) if path.exists() => Some(
            SessionState::load(path)
                .with_context(|| format!("Failed to read session state {}", path.display()))?,
        ),
        _ => None,
    };
    let mut state = controller.initialize(existing)?;

    let stdin = io::stdin();
    let mut presenter = TerminalPresenter::new(
        stdin.lock(),
        io::stdout(),
        MediaLinks::new(config.survey.media_url_template.clone()),
    );
    presenter.show_welcome(controller.total())?;

    let state_file = run.state_file.as_deref();
    let end = run_session(&controller, &mut state, &mut presenter, |state| match state_file {
        Some(path) => state.save(path),
        None => Ok(()),
    });

    match end {
        Ok(SessionEnd::Completed { record: Some(name) }) => {
            if let Some(path) = state_file {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!("Could not remove state file {}: {}", path.display(), e);
                }
            }
            println!(
                "\n✅ Response saved as {} in {}",
                name,
                controller.store().root().display()
            );
        }
        Ok(SessionEnd::Completed { record: None }) => {
            // Only a kept state file can start out complete, and it is kept
            // when the store refused the record.
            warn!("Session state was already complete; no record written this run");
            println!("\n{}", already_complete_notice(state_file));
        }
        Ok(SessionEnd::Abandoned) => match state_file {
            Some(path) => println!(
                "\n⏸️  Session paused at task {}/{}. Progress kept in {}",
                state.progress() + 1,
                controller.total(),
                path.display()
            ),
            None => println!("\n⏸️  Session ended early; no response was recorded."),
        },
        Err(e @ SurveyError::Persistence { .. }) => {
            if let Some(path) = state_file {
                error!("Response not stored; session state kept in {}", path.display());
            }
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

/// Notice for a resumed state that was already complete on entry.
fn already_complete_notice(state_file: Option<&Path>) -> String {
    let mut notice = String::from(
        "⚠️  This session was already complete, so no response was written now.\n   \
         Its record may never have been stored (check the earlier run's errors).",
    );
    if let Some(path) = state_file {
        notice.push_str(&format!("\n   The answers are still in {}", path.display()));
    }
    notice
}

/// Average every stored record into one table at `aggregate.output`.
fn run_aggregate(config: &Config, aggregate: &AggregateArgs, quiet: bool) -> Result<()> {
    let store = storage::DirectoryStore::new(&config.storage.records_dir);
    info!("Collecting records from {}", store.root().display());

    let records = analysis::collect(&store)
        .with_context(|| format!("Failed to list records in {}", store.root().display()))?;

    if records.is_empty() {
        warn!("No data in {}", store.root().display());
        println!("⚠️  No data: no response records found. Nothing written.");
        return Ok(());
    }

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(records.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    };

    let table = match analysis::aggregate_store(&store, &records, &progress)? {
        Some(table) => table,
        None => {
            warn!("All {} records in {} were blank", records.len(), store.root().display());
            println!("⚠️  No data: every response record was blank. Nothing written.");
            return Ok(());
        }
    };

    if let Some(parent) = aggregate.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let output = report::render_aggregate(&table, config.aggregate.precision);
    std::fs::write(&aggregate.output, output)
        .with_context(|| format!("Failed to write aggregate to {}", aggregate.output.display()))?;

    println!("\n📊 Aggregation Summary:");
    println!("   Records aggregated: {}", table.records);
    println!("   Reference tracks: {}", table.means.rows.len());
    println!("   Playlists: {}", table.means.columns.len());
    println!(
        "\n✅ Aggregate saved to: {}",
        aggregate.output.display()
    );

    Ok(())
}
