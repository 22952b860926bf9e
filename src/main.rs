use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::sync::Arc;

use chunkd::config::{Config, LoggingConfig, data_dir};
use chunkd::decompose::TaskDecomposer;
use chunkd::llm::{GeminiClient, Generator, ModelRole};
use chunkd::pipeline::ChunkPipeline;
use chunkd::planning::PlanningAssistant;
use chunkd::prompt::{PromptLoader, Prompts};
use chunkd::server::{self, AppState};
use chunkd::store::{self, SharedStore, TaskStore};

mod cli;

use cli::Cli;
use cli::commands::Commands;

fn setup_logging(logging: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));

    if logging.to_file {
        let log_dir = data_dir().join("logs");
        fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

        let log_file = log_dir.join("chunkd.log");
        let target = Box::new(
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_file)
                .context("Failed to open log file")?,
        );
        builder.target(env_logger::Target::Pipe(target));
        builder.init();
        info!("Logging initialized, writing to: {}", log_file.display());
    } else {
        builder.init();
    }

    Ok(())
}

/// Open the database; only the long-running server settles stale claims
fn open_store(config: &Config, recover: bool) -> Result<SharedStore> {
    let path = &config.storage.db_path;
    let mut store = TaskStore::open(path).context(format!("Failed to open database {}", path.display()))?;

    if recover {
        let recovered = store.recover_stale_claims().context("Failed to recover stale claims")?;
        if recovered > 0 {
            log::warn!("Recovered {} task(s) left in chunking state", recovered);
        }
    }

    Ok(store::shared(store))
}

fn build_state(config: &Config, store: SharedStore) -> Result<Arc<AppState>> {
    let generator: Arc<dyn Generator> =
        Arc::new(GeminiClient::new(&config.llm).context("Failed to create Gemini client")?);

    let prompts = Arc::new(match &config.prompts.dir {
        Some(dir) => Prompts::new(PromptLoader::new(dir)),
        None => Prompts::default(),
    });

    let decomposer = TaskDecomposer::new(
        generator.clone(),
        prompts.clone(),
        config.decompose.clone(),
        config.llm.models.for_role(ModelRole::Chunk),
    );

    Ok(Arc::new(AppState {
        store: store.clone(),
        pipeline: ChunkPipeline::new(store, Arc::new(decomposer)),
        planner: PlanningAssistant::new(generator, prompts, config.llm.clone()),
        expose_error_details: config.server.expose_error_details,
    }))
}

async fn run_application(cli: &Cli, mut config: Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    cli.apply_server_overrides(&mut config.server);

    match &cli.command {
        None | Some(Commands::Serve) => handle_serve_command(&config).await,
        Some(Commands::Chunk) => handle_chunk_command(&config).await,
        Some(Commands::Tasks { chunks }) => handle_tasks_command(&config, *chunks),
    }
}

async fn handle_serve_command(config: &Config) -> Result<()> {
    let store = open_store(config, true)?;
    let state = build_state(config, store)?;
    println!(
        "{} http://{}:{}",
        "Listening on".green(),
        config.server.host,
        config.server.port
    );
    server::serve(state, &config.server).await.context("Server failed")
}

async fn handle_chunk_command(config: &Config) -> Result<()> {
    // A server may hold live claims on the same database
    let store = open_store(config, false)?;
    let state = build_state(config, store)?;
    let report = state.pipeline.run().await.context("Failed to chunk tasks")?;

    if report.chunks.is_empty() {
        println!("{}", "No unchunked tasks".yellow());
        return Ok(());
    }

    if report.degraded {
        println!(
            "{} {}",
            "Degraded:".yellow(),
            report.reason.as_deref().unwrap_or("fallback chunks used")
        );
    }
    for warning in &report.warnings {
        println!("{} {}", "Warning:".yellow(), warning);
    }
    for chunk in &report.chunks {
        println!("  {} {} ({} min)", chunk.task_id.dimmed(), chunk.title, chunk.duration);
    }
    println!("{} {} chunk(s)", "Created".green(), report.chunks.len());
    Ok(())
}

fn handle_tasks_command(config: &Config, with_chunks: bool) -> Result<()> {
    let store = open_store(config, false)?;
    let tasks = store::lock(&store)
        .and_then(|s| s.list_tasks_with_chunks(with_chunks))
        .context("Failed to list tasks")?;

    if tasks.is_empty() {
        println!("{}", "No tasks".yellow());
        return Ok(());
    }

    for entry in &tasks {
        let task = &entry.task;
        println!(
            "{} {} ({} min) [{}]",
            task.id.cyan(),
            task.title,
            task.estimate,
            task.chunk_status
        );
        for chunk in entry.chunks.iter().flatten() {
            println!("    - {} ({} min)", chunk.title, chunk.duration);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration; fallback problems are logged once logging is up
    let (config, warnings) =
        Config::load_with_warnings(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging once the level is known
    setup_logging(&config.logging, cli.is_verbose()).context("Failed to setup logging")?;
    for warning in &warnings {
        log::warn!("{}", warning);
        eprintln!("{} {}", "Warning:".yellow(), warning);
    }

    info!("Starting with config from: {:?}", cli.config);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime.block_on(run_application(&cli, config)).context("Application failed")?;

    Ok(())
}
