use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use phono_core::{
    config_path, load_config_or_default, validate_config, Config, ConversionService,
    FormatRegistry,
};
use phono_server::api::create_router;
use phono_server::cli::{self, Cli, Command, EncodeTarget, ServeArgs};
use phono_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prefix of the per-process temporary directory.
const TEMP_DIR_PREFIX: &str = "phono";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Determine config path
    let config_path = config_path(cli.config.clone());

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let mut config = load_config_or_default(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Command line flags win over file and environment
    match &cli.command {
        Command::Serve(args) => apply_serve_args(&mut config, args),
        Command::Encode { target } => {
            if let Some(buffer_size) = target.buffer_size() {
                config.converter.buffer_size = buffer_size;
            }
        }
    }

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    // The registry is built once and shared by every job
    let registry = Arc::new(FormatRegistry::builtin());

    match cli.command {
        Command::Serve(_) => serve(config, registry).await,
        Command::Encode { target } => encode(config, registry, target).await,
    }
}

fn apply_serve_args(config: &mut Config, args: &ServeArgs) {
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref tempdir) = args.tempdir {
        config.converter.temp_dir = Some(tempdir.clone());
    }
    if let Some(buffer_size) = args.buffersize {
        config.converter.buffer_size = buffer_size;
    }
}

async fn serve(config: Config, registry: Arc<FormatRegistry>) -> Result<()> {
    info!("Starting phono v{}", VERSION);

    // Outputs go to a private directory that is removed on shutdown
    let base_dir = config.converter.effective_temp_dir();
    let temp_dir = tempfile::Builder::new()
        .prefix(TEMP_DIR_PREFIX)
        .tempdir_in(&base_dir)
        .with_context(|| format!("Failed to create temp dir in {:?}", base_dir))?;
    info!("Using temp dir {:?}", temp_dir.path());

    let converter_config = config.converter.clone().with_temp_dir(temp_dir.path());
    let service = ConversionService::new(registry, converter_config);

    info!(
        "Converter: buffer_size={}, spool_threshold_bytes={}",
        config.converter.buffer_size, config.converter.spool_threshold_bytes
    );
    for (format, limit) in config.limits.iter() {
        info!("Upload limit for {}: {} bytes", format, limit);
    }

    let addr = SocketAddr::new(config.server.host, config.server.port);

    // Create app state
    let state = Arc::new(AppState::new(config, service));

    // Build router
    let app = create_router(state);

    // Start server
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    temp_dir
        .close()
        .context("Failed to remove temp dir")?;
    info!("Temp dir removed");

    Ok(())
}

async fn encode(
    config: Config,
    registry: Arc<FormatRegistry>,
    target: EncodeTarget,
) -> Result<()> {
    let cancel = Arc::new(AtomicBool::new(false));
    let service =
        ConversionService::new(registry, config.converter).with_cancellation(cancel.clone());

    let mut worker = {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || cli::run_encode(&service, &target, &cancel))
    };

    // On a signal the running job aborts through its output guard before exit
    let joined = tokio::select! {
        joined = &mut worker => joined,
        _ = shutdown_signal() => {
            info!("Interrupted, aborting the current file");
            cancel.store(true, Ordering::SeqCst);
            worker.await
        }
    };
    let summary = joined.context("Encoding worker failed")??;

    if summary.failed > 0 {
        info!("{} file(s) could not be converted", summary.failed);
    }
    if summary.interrupted {
        anyhow::bail!("Encoding interrupted");
    }
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
