use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use stubd::admin_api::ControlServer;
use stubd::{build_endpoint, logging, ControlPlane, Settings};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();
    logging::init(&settings.log_level, settings.log_format)?;

    let listen = settings.listen_config();
    info!(
        kind = %listen.kind,
        protocol = %listen.protocol,
        "Starting stubd managed endpoint on {}",
        listen.addr
    );

    let endpoint = build_endpoint(listen).context("failed to create managed endpoint")?;
    let plane = Arc::new(ControlPlane::new(endpoint));

    if let Some(path) = &settings.response_file {
        plane
            .load_config(path)
            .with_context(|| format!("failed to load route table from {}", path.display()))?;
    } else {
        warn!("No response file configured; starting with an empty route table");
    }

    // A bind failure takes down the managed endpoint only.
    match plane.launch().await {
        Ok(_) => {
            if settings.auto_start {
                if let Err(e) = plane.start() {
                    warn!("Auto start skipped: {}", e);
                }
            }
        }
        Err(e) => error!("Managed endpoint failed to start: {}", e),
    }

    let shutdown = CancellationToken::new();
    let control = ControlServer::bind(settings.control_socket_addr(), Arc::clone(&plane))
        .await
        .with_context(|| format!("failed to bind control API on {}", settings.control_socket_addr()))?;
    let control_task = tokio::spawn(control.run(shutdown.clone()));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    shutdown.cancel();
    plane.shutdown().await;
    if let Err(e) = control_task.await {
        error!("Control API task failed: {}", e);
    }
    Ok(())
}
