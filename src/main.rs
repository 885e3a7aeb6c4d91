use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use teams_presence::app::Config;
use teams_presence::logwatch::{self, PresenceEngine, PresenceEvent};

/// Teams Presence - publishes Teams status changes read from its client log
#[derive(Parser)]
#[command(name = "teams-presence")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Write diagnostics to stderr instead of the log file
    #[arg(long)]
    log_stderr: bool,

    /// Config file (defaults to ~/.config/teams-presence/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Teams log directory
    #[arg(long, env = "TEAMS_PRESENCE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Log file name pattern
    #[arg(long)]
    pattern: Option<String>,

    /// Quiet period after start before the first snapshot
    #[arg(long)]
    throttle_secs: Option<u64>,

    /// Fallback poll interval
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the Teams log and print presence events as JSON lines (default)
    Watch,
    /// Print the log file that would be followed
    Locate,
    /// Run a recorded log through the patterns and print the final state
    Replay {
        /// Log file to replay from the beginning
        file: PathBuf,
    },
}

/// One line of `watch` output
#[derive(Serialize)]
struct EventLine<'a> {
    at: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    event: &'a PresenceEvent,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    // 設定を読み込み、コマンドライン引数で上書き
    let config = resolve_config(&cli)?;

    // ログ初期化
    init_logging(&config.log_level, cli.log_stderr)?;

    match cli.command {
        Some(Commands::Locate) => {
            let path = logwatch::select_newest(&config.log_dir, &config.file_pattern)?;
            println!("{}", path.display());
            Ok(())
        }
        Some(Commands::Replay { file }) => {
            let snapshot = logwatch::replay(&file)
                .with_context(|| format!("Failed to replay {}", file.display()))?;
            println!("{}", serde_json::to_string(&snapshot)?);
            Ok(())
        }
        Some(Commands::Watch) | None => run_watch(config),
    }
}

/// Config file values with command-line overrides applied
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load().unwrap_or_default(),
    };

    if let Some(dir) = &cli.log_dir {
        config.log_dir = dir.clone();
    }
    if let Some(pattern) = &cli.pattern {
        config.file_pattern = pattern.clone();
    }
    if let Some(secs) = cli.throttle_secs {
        config.throttle_secs = secs;
    }
    if let Some(ms) = cli.poll_interval_ms {
        config.poll_interval_ms = ms;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }

    Ok(config)
}

fn init_logging(level: &str, to_stderr: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    if to_stderr {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        let log_dir = directories::ProjectDirs::from("", "", "teams-presence")
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| std::env::temp_dir().join("teams-presence"));

        std::fs::create_dir_all(&log_dir)?;
        let log_file = std::fs::File::create(log_dir.join("teams-presence.log"))?;

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(log_file).with_ansi(false))
            .init();
    }

    info!("Teams Presence starting");
    Ok(())
}

fn run_watch(config: Config) -> Result<()> {
    let engine = PresenceEngine::new(config.engine_config());
    let mut events = engine.subscribe();
    let stop = engine.stop_handle();

    // Initialization errors surface here, before anything runs in the background
    let running = engine.start().context("Failed to start presence engine")?;
    eprintln!("Following {}", running.log_path().display());

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let mut streaming = tokio::task::spawn_blocking(move || running.run());
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => {
                        let line = EventLine { at: chrono::Utc::now(), event: &event };
                        println!("{}", serde_json::to_string(&line)?);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Event consumer lagged, skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = &mut ctrl_c => {
                    info!("Interrupted, stopping engine");
                    stop.stop();
                    break;
                }
                result = &mut streaming => {
                    return result
                        .context("Presence engine task panicked")?
                        .context("Presence engine failed");
                }
            }
        }

        streaming
            .await
            .context("Presence engine task panicked")?
            .context("Presence engine failed")
    })
}
