//! Watchbridge CLI - wbridge command

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod cmd;
mod util;

/// Watchbridge - file change notifications for a polling host
#[derive(Parser)]
#[command(name = "wbridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: nearest wbridge.toml, else --game-dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Game directory used as the "garrysmod" root when no config is found
    #[arg(long, global = true)]
    game_dir: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch paths and print file events until Ctrl-C
    Watch {
        /// Root-relative paths (a file path watches its directory)
        #[arg(required = true)]
        paths: Vec<String>,

        /// Root the paths are relative to
        #[arg(long, default_value = "garrysmod")]
        root: String,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,

        /// Tick interval in milliseconds (default: 50)
        #[arg(long, default_value = "50")]
        tick_ms: u64,
    },
    /// Re-express a path from one root in another
    Resolve {
        /// Path relative to --from
        path: String,

        /// Root the path is relative to
        #[arg(long)]
        from: String,

        /// Root to express the path in
        #[arg(long, default_value = "garrysmod")]
        to: String,
    },
    /// List configured roots and aliases
    Roots,
    /// Print an annotated example config
    ExampleConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered log lines are flushed on exit
    let _guard = init_logging(cli.log_file.as_deref())?;

    if let Commands::ExampleConfig = cli.command {
        print!("{}", watcher::example_config());
        return Ok(());
    }

    let config = util::load_config(cli.config.as_deref(), cli.game_dir.as_deref())?;

    match cli.command {
        Commands::Watch { paths, root, json, tick_ms } => {
            cmd::watch::run(&config, &paths, &root, json, tick_ms).await
        }
        Commands::Resolve { path, from, to } => cmd::resolve::run(&config, &path, &from, &to),
        Commands::Roots => cmd::roots::run(&config),
        Commands::ExampleConfig => Ok(()),
    }
}

/// Install the fmt subscriber, filtered by RUST_LOG (default: info)
fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}
