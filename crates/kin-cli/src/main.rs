mod llm;
mod server;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use kin_core::{
    DateContext, EmotionEngine, build_parse_prompt, describe_mood, now_millis, parse_utterance,
    prompt_context, reference_now,
};
use kin_store::{Config, Store};
use rmcp::{ServiceExt, transport::stdio};

use crate::llm::HttpCompletion;
use crate::server::{DEFAULT_USER, KinServer};

const DB_FILE: &str = "kin.db";
const PIDFILE: &str = "kin-serve.pid";

#[derive(Parser)]
#[command(name = "kin", about = "Companion mood engine, task parser and MCP server")]
struct Cli {
    /// User whose companion state to operate on
    #[arg(long, global = true, default_value = DEFAULT_USER)]
    user: String,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio transport
    Serve,

    /// Create the seed emotional state for the user
    Init,

    /// Record an emotion event
    Feel {
        /// Emotion label, e.g. joy, frustration, curiosity
        label: String,
        /// Intensity in [0, 1]; out-of-range values are clamped
        intensity: f64,
        /// What caused the emotion
        #[arg(long, default_value = "")]
        trigger: String,
    },

    /// Pull the mood one step back toward baseline
    Decay {
        /// Decay every stored user instead of just --user
        #[arg(long)]
        all: bool,
    },

    /// Describe the current mood
    Mood {
        /// Print the full prompt context block instead of the one-line summary
        #[arg(long)]
        context: bool,
        /// Recent emotions to include with --context
        #[arg(long, default_value_t = 3)]
        recent: usize,
    },

    /// Print the full stored state as JSON
    Show,

    /// List users with stored state
    Users,

    /// Delete the user's stored state
    Forget,

    /// Parse an utterance into a structured task via the configured LLM
    Parse {
        /// The utterance to parse
        text: String,
        /// Treat this YYYY-MM-DD date as today
        #[arg(long)]
        today: Option<String>,
    },

    /// Print the parser prompt for an utterance without calling the LLM
    Prompt {
        /// The utterance to build the prompt for
        text: String,
        /// Treat this YYYY-MM-DD date as today
        #[arg(long)]
        today: Option<String>,
    },

    /// Export the user's state to a JSON file
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// Import the user's state from a JSON file
    Import {
        /// Input file path
        path: PathBuf,
    },
}

fn data_dir() -> PathBuf {
    std::env::var("KIN_DATA_DIR")
        .ok()
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(kin_store::default_base_dir)
}

fn open_store() -> Result<Store> {
    let path = data_dir().join(DB_FILE);
    Store::open(&path).with_context(|| format!("failed to open store at {}", path.display()))
}

fn load_config() -> Result<Config> {
    Config::load_from_dir(&data_dir()).context("failed to load config.toml")
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let user = cli.user.trim();
    if user.is_empty() {
        bail!("--user must not be empty");
    }

    match &cli.command {
        Commands::Serve => cmd_serve().await,
        Commands::Init => cmd_init(user),
        Commands::Feel {
            label,
            intensity,
            trigger,
        } => cmd_feel(user, label, *intensity, trigger),
        Commands::Decay { all } => cmd_decay(user, *all),
        Commands::Mood { context, recent } => cmd_mood(user, *context, *recent),
        Commands::Show => cmd_show(user),
        Commands::Users => cmd_users(),
        Commands::Forget => cmd_forget(user),
        Commands::Parse { text, today } => cmd_parse(text, today.as_deref()).await,
        Commands::Prompt { text, today } => cmd_prompt(text, today.as_deref()),
        Commands::Export { path } => cmd_export(user, path),
        Commands::Import { path } => cmd_import(user, path),
    }
}

// ---------------------------------------------------------------------------
// Advisory pidfile for observability
// ---------------------------------------------------------------------------

fn pidfile_path() -> PathBuf {
    data_dir().join(PIDFILE)
}

/// Check for an existing pidfile and log accordingly, then write our own.
fn acquire_pidfile() -> Option<PathBuf> {
    let path = pidfile_path();
    if let Ok(content) = std::fs::read_to_string(&path)
        && let Ok(pid) = content.trim().parse::<u32>()
    {
        if is_process_alive(pid) {
            tracing::warn!("another kin serve (PID {pid}) is running, sharing the store");
        } else {
            tracing::info!("cleaned up stale pidfile (PID {pid} is dead)");
            let _ = std::fs::remove_file(&path);
        }
    }

    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match std::fs::File::create(&path) {
        Ok(mut f) => {
            let _ = write!(f, "{}", std::process::id());
            tracing::info!("wrote pidfile: {}", path.display());
            Some(path)
        }
        Err(e) => {
            tracing::warn!("failed to write pidfile: {e}");
            None
        }
    }
}

fn release_pidfile(path: &Path) {
    let _ = std::fs::remove_file(path);
    tracing::info!("removed pidfile: {}", path.display());
}

#[cfg(unix)]
fn is_process_alive(pid: u32) -> bool {
    // kill(pid, 0) checks existence without sending a signal
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    false
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let Ok(mut term) = signal(SignalKind::terminate()) else {
        let _ = tokio::signal::ctrl_c().await;
        return;
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("received SIGINT"),
        _ = term.recv() => tracing::info!("received SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

async fn cmd_serve() -> Result<()> {
    let store = open_store()?;
    let config = load_config()?;
    let completion =
        HttpCompletion::from_config(&config.llm).context("failed to build LLM client")?;
    tracing::info!(
        "starting MCP server (llm {} at {})",
        config.llm.model,
        config.llm.endpoint
    );

    let pidfile = acquire_pidfile();

    let server = KinServer::new(
        store,
        EmotionEngine::new(config.effect_table()),
        Arc::new(completion),
        config.parser.confirm_below,
    );

    let (outcome, signaled) = tokio::select! {
        res = run_stdio(server.clone()) => (res, false),
        _ = shutdown_signal() => (Ok(()), true),
    };

    server.checkpoint_wal().await;
    if let Some(path) = pidfile {
        release_pidfile(&path);
    }
    if signaled {
        // The blocking stdin reader never returns on its own and would hold
        // the runtime open at drop.
        std::process::exit(0);
    }
    outcome
}

async fn run_stdio(server: KinServer) -> Result<()> {
    let service = match server.serve(stdio()).await {
        Ok(service) => service,
        Err(e) => {
            // stdin closed before the client finished initializing
            tracing::info!("MCP session ended before initialization: {e}");
            return Ok(());
        }
    };
    service.waiting().await.context("MCP service failed")?;
    Ok(())
}

fn cmd_init(user: &str) -> Result<()> {
    let store = open_store()?;
    let (_, created) = store
        .create_state(user, now_millis())
        .context("failed to create state")?;
    if created {
        println!("created emotional state for '{user}'");
    } else {
        println!("emotional state for '{user}' already exists");
    }
    Ok(())
}

fn cmd_feel(user: &str, label: &str, intensity: f64, trigger: &str) -> Result<()> {
    if label.trim().is_empty() {
        bail!("label must not be empty");
    }
    let store = open_store()?;
    let engine = EmotionEngine::new(load_config()?.effect_table());
    let now = now_millis();

    store
        .create_state(user, now)
        .context("failed to create state")?;
    let state = store
        .update_state(user, |s| {
            engine.apply_emotion(s, label, intensity, trigger, now);
            s.clone()
        })
        .context("failed to update state")?;

    if !engine.effects().contains(label) {
        eprintln!("note: '{label}' has no effect entry; recorded without changing mood");
    }
    println!("{}", describe_mood(&state).summary);
    Ok(())
}

fn cmd_decay(user: &str, all: bool) -> Result<()> {
    let store = open_store()?;
    let engine = EmotionEngine::new(load_config()?.effect_table());
    let now = now_millis();

    if all {
        let touched = store.decay_all(&engine, now).context("failed to decay")?;
        println!("decayed {touched} user(s)");
        return Ok(());
    }

    let state = store
        .update_state(user, |s| {
            engine.decay(s, now);
            s.clone()
        })
        .with_context(|| format!("failed to decay '{user}'"))?;
    println!("{}", describe_mood(&state).summary);
    Ok(())
}

fn cmd_mood(user: &str, context: bool, recent: usize) -> Result<()> {
    let store = open_store()?;
    let state = store
        .require_state(user)
        .with_context(|| format!("failed to load '{user}' (run `kin init` first)"))?;
    if context {
        println!("{}", prompt_context(&state, recent));
    } else {
        println!("{}", describe_mood(&state).summary);
    }
    Ok(())
}

fn cmd_show(user: &str) -> Result<()> {
    let store = open_store()?;
    let json = store
        .export_json(user)
        .with_context(|| format!("failed to load '{user}'"))?;
    println!("{json}");
    Ok(())
}

fn cmd_users() -> Result<()> {
    let store = open_store()?;
    for user in store.list_users().context("failed to list users")? {
        println!("{user}");
    }
    Ok(())
}

fn cmd_forget(user: &str) -> Result<()> {
    let store = open_store()?;
    if store.delete_state(user).context("failed to delete state")? {
        println!("forgot '{user}'");
    } else {
        println!("no state stored for '{user}'");
    }
    Ok(())
}

async fn cmd_parse(text: &str, today: Option<&str>) -> Result<()> {
    let now = reference_now(today).context("--today must be YYYY-MM-DD")?;
    let config = load_config()?;
    let completion =
        HttpCompletion::from_config(&config.llm).context("failed to build LLM client")?;

    let task = parse_utterance(&completion, text, now)
        .await
        .context("failed to parse utterance")?;

    let mut json = serde_json::to_value(&task).context("failed to serialize task")?;
    json["needsConfirmation"] =
        serde_json::Value::Bool(task.needs_confirmation(config.parser.confirm_below));
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn cmd_prompt(text: &str, today: Option<&str>) -> Result<()> {
    let now = reference_now(today).context("--today must be YYYY-MM-DD")?;
    println!("{}", build_parse_prompt(&DateContext::build(now), text));
    Ok(())
}

fn cmd_export(user: &str, path: &Path) -> Result<()> {
    let store = open_store()?;
    let json = store
        .export_json(user)
        .with_context(|| format!("failed to export '{user}'"))?;
    std::fs::write(path, &json).with_context(|| format!("failed to write {}", path.display()))?;

    println!("exported to {}", path.display());
    Ok(())
}

fn cmd_import(user: &str, path: &Path) -> Result<()> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let store = open_store()?;
    let state = store
        .import_json(user, &json)
        .context("failed to import JSON")?;

    println!(
        "imported '{user}': {} recent emotion(s)",
        state.recent_emotions.len()
    );
    Ok(())
}
