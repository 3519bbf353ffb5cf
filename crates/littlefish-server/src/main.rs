/*
[INPUT]:  CLI arguments, YAML configuration file, OS shutdown signals
[OUTPUT]: Running Littlefish API server with graceful shutdown
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, startup flow, or shutdown handling
*/

mod cli;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

use littlefish_server::config::LoggingConfig;
use littlefish_server::{AppState, ServerConfig};

const LOG_FILE_PREFIX: &str = "littlefish-server.log";

#[derive(Parser, Debug)]
#[command(name = "littlefish-server", version, about = "Littlefish wallet authentication server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
    #[arg(long = "dry-run")]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default configuration file
    Init {
        #[arg(long, short, value_name = "PATH", default_value = "littlefish.yaml")]
        output: PathBuf,
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    if let Some(Command::Init { output, force }) = &args.command {
        return cli::init::run_init(output, *force);
    }

    let config_path = args
        .config_path
        .as_deref()
        .context("--config <PATH> is required (run `littlefish-server init` to create one)")?;
    let config = load_config(config_path)?;
    let _log_guard = init_tracing(&args.log_level, &config.logging)?;

    info!(
        config_path = %config_path.display(),
        dry_run = args.dry_run,
        "starting littlefish-server"
    );
    info!(
        bind_addr = %config.server.bind_addr,
        indexer_mode = ?config.indexer.mode,
        network = ?config.indexer.network,
        indexer_key = config.indexer.project_id().is_some(),
        "configuration loaded"
    );

    if args.dry_run {
        info!("dry-run requested; configuration validated");
        return Ok(());
    }

    let bind_addr = config.bind_addr()?;
    let state = AppState::from_config(config)
        .await
        .context("initialize server state")?;
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("bind {bind_addr}"))?;

    let shutdown = CancellationToken::new();
    setup_signal_handlers(shutdown.clone());

    littlefish_server::serve(listener, state, shutdown).await?;
    info!("server shutdown complete");
    Ok(())
}

fn init_tracing(log_level: &str, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .context("invalid log level")?;

    let (writer, guard) = log_writer(logging);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);
    let result = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(guard)
}

/// Stderr, plus a daily rolling file when `logging.directory` is set
fn log_writer(logging: &LoggingConfig) -> (BoxMakeWriter, Option<WorkerGuard>) {
    match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (file, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(std::io::stderr.and(file)), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    }
}

fn load_config(path: &Path) -> Result<ServerConfig> {
    let path_str = path.to_str().context("config path must be valid utf-8")?;
    let config = ServerConfig::from_file(path_str).context("load config")?;
    config.validate().context("invalid config")?;
    Ok(config)
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown_clone.cancel();
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("received SIGTERM");
                    shutdown_clone.cancel();
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn test_log_directory_adds_file_output() {
        let dir = tempfile::tempdir().unwrap();
        let logging = LoggingConfig {
            json: false,
            directory: Some(dir.path().to_path_buf()),
        };

        let (writer, guard) = log_writer(&logging);
        assert!(guard.is_some());
        writer.make_writer().write_all(b"wallet linked\n").unwrap();
        drop(guard);

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .collect();
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().to_string_lossy().to_string();
        assert!(name.starts_with(LOG_FILE_PREFIX));
        let content = std::fs::read_to_string(files[0].path()).unwrap();
        assert!(content.contains("wallet linked"));
    }

    #[test]
    fn test_stderr_only_without_directory() {
        let (_, guard) = log_writer(&LoggingConfig::default());
        assert!(guard.is_none());
    }
}
