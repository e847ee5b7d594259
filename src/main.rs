//! CoopCheck - chicken health detector demo
//!
//! A CLI that takes a photo of a bird, runs a simulated multi-stage
//! analysis, and keeps the made-up diagnoses in a local result store.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Error (rejected image, unknown analysis id, storage failure, etc.)

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod session;
mod store;
mod upload;

use analysis::{BarReporter, Sequencer, SequencerConfig};
use anyhow::{Context, Result};
use cli::{Args, Command};
use config::{Config, DEFAULT_CONFIG_FILE};
use models::Diagnosis;
use session::Session;
use std::path::Path;
use store::{FileStorage, ResultStore};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use upload::UploadPolicy;

#[tokio::main]
async fn main() -> Result<()> {
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

    // Initialize logging
    let set_log_level = init_logging(&args);

    debug!("CoopCheck v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args, set_log_level).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .coopcheck.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", DEFAULT_CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to change the store location, stage timing, and upload limits.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Returns a setter for the level, applied again once the config file
/// has been read.
fn init_logging(args: &Args) -> impl Fn(tracing::Level) {
    let level = args.log_level();

    let builder = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::default().add_directive(LevelFilter::from_level(level).into()))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter_reloading();
    let handle = builder.reload_handle();

    tracing::subscriber::set_global_default(builder.finish())
        .expect("Failed to set tracing subscriber");

    move |level| {
        if let Err(e) = handle.reload(EnvFilter::default().add_directive(LevelFilter::from_level(level).into())) {
            warn!("Failed to change log level: {}", e);
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// Run the selected command. Returns the exit code.
async fn run(args: Args, set_log_level: impl Fn(tracing::Level)) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    set_log_level(config.log_level(args.quiet));

    let storage = FileStorage::new(&config.store.path);
    debug!(
        "Using store {} (key '{}')",
        storage.path().display(),
        config.store.key
    );
    let store = ResultStore::load(storage, config.store.key.clone());
    let mut session = Session::new(store, UploadPolicy::from(&config.upload));

    match args.command {
        Command::Analyze { ref image, seed, .. } => {
            handle_analyze(&mut session, &config, image, seed, args.quiet).await
        }
        Command::History {
            ref diagnosis,
            limit,
        } => handle_history(&session, &config, diagnosis.as_deref(), limit),
        Command::Show { ref id } => handle_show(&session, &config, id),
        Command::Delete { ref id, yes } => handle_delete(&mut session, id, yes),
        Command::InitConfig => handle_init_config().map(|_| 0),
    }
}

/// Validate the image, run the simulated analysis, then show the result.
async fn handle_analyze(
    session: &mut Session<FileStorage>,
    config: &Config,
    image: &Path,
    seed: Option<u64>,
    quiet: bool,
) -> Result<i32> {
    if session.select_image(image).is_err() {
        for alert in session.take_alerts() {
            eprintln!("{}", alert);
        }
        return Ok(1);
    }

    if let Some(selected) = session.selected() {
        println!(
            "📷 Selected {} ({}, {} bytes)",
            selected.file_name, selected.mime_type, selected.size
        );
    }

    let sequencer_config = SequencerConfig::from(&config.analysis);
    let sequencer = match seed {
        Some(seed) => Sequencer::with_seed(sequencer_config, seed),
        None => Sequencer::new(sequencer_config),
    };

    println!("🔬 Analyzing...\n");
    let reporter = BarReporter::new(!quiet);
    let id = session
        .analyze(&sequencer, &reporter)
        .await
        .context("Analysis failed")?;

    println!("\n✅ Analysis complete! Saved as {}\n", id);
    handle_show(session, config, &id)
}

fn handle_history(
    session: &Session<FileStorage>,
    config: &Config,
    diagnosis: Option<&str>,
    limit: Option<usize>,
) -> Result<i32> {
    let records = session.store().records();

    let mut selected: Vec<_> = match diagnosis {
        Some(label) => analysis::filter_by_diagnosis(records, &Diagnosis::from(label))
            .into_iter()
            .cloned()
            .collect(),
        None => records.to_vec(),
    };
    if let Some(limit) = limit {
        selected.truncate(limit);
    }

    let summary = analysis::HistorySummary::from_records(records);
    let output = report::render_history(config.general.format, &summary, &selected)?;
    println!("{}", output);
    Ok(0)
}

fn handle_show<S: store::KeyValueStorage>(
    session: &Session<S>,
    config: &Config,
    id: &str,
) -> Result<i32> {
    match session.find(id) {
        Some(record) => {
            let output = report::render_detail(config.general.format, record)?;
            println!("{}", output);
            Ok(0)
        }
        None => {
            eprintln!("❌ Analysis not found: {}", id);
            Ok(1)
        }
    }
}

/// Delete after the user confirms (or `--yes`).
fn handle_delete(session: &mut Session<FileStorage>, id: &str, yes: bool) -> Result<i32> {
    let Some(record) = session.find(id) else {
        eprintln!("❌ Analysis not found: {}", id);
        return Ok(1);
    };

    let confirmed = if yes {
        true
    } else {
        println!(
            "{} {} from {}",
            record.diagnosis.emoji(),
            record.diagnosis,
            record.formatted_date()
        );
        dialoguer::Confirm::new()
            .with_prompt("Are you sure you want to delete this analysis?")
            .default(false)
            .interact()
            .context("Failed to read confirmation")?
    };

    let removed = session
        .delete(id, confirmed)
        .context("Failed to save the store after deleting")?;
    if removed.is_none() {
        println!("Deletion cancelled.");
    }

    for alert in session.take_alerts() {
        println!("{}", alert);
    }
    Ok(0)
}
