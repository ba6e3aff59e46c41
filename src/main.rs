use anyhow::{Context, Result};
use distcapsule::controller::app::Controller;
use distcapsule::controller::refresh::AppEvent;
use distcapsule::core::config::Config;
use distcapsule::core::startup::{build_controller, connect_on_startup};
use distcapsule::core::state::AppState;
use distcapsule::core::tracing_init::init_tracing;
use std::env;
use std::path::PathBuf;
use tokio::signal;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    let config_path = env::args().nth(1).map(PathBuf::from);

    // Load and validate configuration; every section has defaults
    let config = match &config_path {
        Some(path) => Config::from_file(path).context(format!(
            "Failed to load configuration from '{}'. \
            See config.example.toml for the available settings.",
            path.display()
        ))?,
        None => Config::default(),
    };

    init_tracing(&config.logging)?;

    // UI actions and refresh ticks are processed one at a time
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    runtime.block_on(async_main(config, config_path))
}

async fn async_main(config: Config, config_path: Option<PathBuf>) -> Result<()> {
    info!(
        config_path = ?config_path,
        default_address = %config.connection.default_address,
        default_port = config.connection.default_port,
        refresh_interval_ms = config.refresh.interval_ms,
        demo = config.demo.enabled,
        log_level = %config.logging.level,
        log_format = %config.logging.format,
        "DistCapsule client starting"
    );

    let (mut controller, events) = build_controller(&config);
    connect_on_startup(&mut controller, &config).await?;

    run_event_loop(&mut controller, events).await;

    controller.disconnect();
    info!("Shutting down gracefully");

    Ok(())
}

/// Drive refresh ticks until a shutdown signal arrives
async fn run_event_loop(controller: &mut Controller, mut events: UnboundedReceiver<AppEvent>) {
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = events.recv() => {
                let Some(event) = event else {
                    debug!("Event channel closed");
                    break;
                };
                if controller.handle_event(event).await {
                    AppState::capture(controller).log();
                }
            }
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
