use std::time::Duration;

use tracing::{error, info, warn};

use probes::config::Config;
use probes::{HealthState, ProbeServer};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::from_env()?;

    probes::logging::init(&config.logging)?;

    info!("Starting probes {}...", probes::PKG_VERSION);
    config.log_summary();

    // Probe traffic is tiny; a single thread is plenty.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let state = HealthState::new();
    let server = ProbeServer::new(state.clone());

    let startup = tokio::spawn(report_ready(state.clone(), config.probe.startup_delay));

    let signal = {
        let state = state.clone();
        async move {
            shutdown_signal().await;
            info!(health = %state.snapshot(), "Shutdown signal received, draining...");
            state.unready();
        }
    };

    let result = server
        .run_until(
            &config.probe.host,
            config.probe.port,
            signal,
            config.probe.shutdown_timeout,
        )
        .await;

    startup.abort();

    match result {
        Ok(()) => {
            info!("Probe server stopped");
            Ok(())
        }
        Err(e) => {
            error!("Probe server error: {}", e);
            Err(e.into())
        }
    }
}

/// Flip startup and readiness once the configured warm-up has elapsed.
async fn report_ready(state: HealthState, delay: Duration) {
    if !delay.is_zero() {
        info!("Waiting {}ms before reporting ready", delay.as_millis());
        tokio::time::sleep(delay).await;
    }
    state.ready();
    info!("Service started and ready");
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
