/*
[INPUT]:  CLI arguments, YAML configuration file, OS shutdown signals
[OUTPUT]: Running trading bridge HTTP service with graceful shutdown
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, startup flow, or shutdown handling
[UPDATE]: 2026-10-17 Optional daily-rolling log files
*/

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use mt5_bridge_adapter::{BrokerClient, PaperBroker, TerminalClient};
use mt5_bridge_server::{Bridge, BridgeConfig, api};

#[derive(Parser, Debug)]
#[command(name = "mt5-bridge-server", version, about = "MT5 trading bridge HTTP service")]
struct Cli {
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
    /// Trade against the in-memory paper terminal instead of the gateway
    #[arg(long)]
    paper: bool,
    #[arg(long = "dry-run")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let config = load_config(args.config_path.as_deref())?;
    let _log_guard = init_tracing(&args.log_level, config.logging.directory.as_deref())?;

    let addr = config.listen_addr()?;
    info!(
        config_path = ?args.config_path,
        %addr,
        paper = args.paper,
        dry_run = args.dry_run,
        "starting mt5-bridge-server"
    );

    if args.dry_run {
        info!("dry-run requested; configuration validated");
        return Ok(());
    }

    let broker: Box<dyn BrokerClient> = if args.paper {
        info!("using paper terminal");
        Box::new(PaperBroker::new())
    } else {
        let client = TerminalClient::with_config(config.client_config(), &config.terminal.base_url)
            .context("create terminal client")?;
        info!(base_url = %config.terminal.base_url, "using terminal gateway");
        Box::new(client)
    };

    let shutdown = CancellationToken::new();
    setup_signal_handlers(shutdown.clone());

    let bridge = Bridge::new(
        broker,
        config.call_timeout(),
        config.runner_timing(),
        shutdown.clone(),
    );
    bridge.session.probe_terminal().await;

    let app = api::create_router(bridge.clone(), config.server.enable_cors);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(%addr, "bridge API listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
        .await
        .context("serve API")?;
    info!("API server stopped");

    bridge.shutdown().await;
    Ok(())
}

fn init_tracing(log_level: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    let Some(dir) = log_dir else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .map_err(|err| anyhow!(err))
            .context("initialize tracing subscriber")?;
        return Ok(None);
    };

    let appender = tracing_appender::rolling::daily(dir, "mt5-bridge.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(Some(guard))
}

fn load_config(path: Option<&Path>) -> Result<BridgeConfig> {
    let Some(path) = path else {
        return Ok(BridgeConfig::default());
    };
    let path_str = path.to_str().context("config path must be valid utf-8")?;
    BridgeConfig::from_file(path_str).context("load config")
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
