//! # Backend Runtime
//!
//! Entry point of the fare backend. Binds the dispatcher port and serves
//! ticket requests until the process is stopped. Start-up failures exit
//! with -1.

use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use backend_runtime::BackendConfig;
use fare_telemetry::{init_logging, TelemetryConfig};
use fc_03_session_protocol::{Dispatcher, TicketIssuer, UdpBinder};
use tokio::net::UdpSocket;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let telemetry = TelemetryConfig::from_env().with_service("backend-runtime");
    if let Err(e) = init_logging(&telemetry) {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(-1);
    }

    let dispatcher = match start().await {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Backend start-up failed");
            process::exit(-1);
        }
    };

    tokio::select! {
        () = dispatcher.run() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "Failed to listen for Ctrl+C");
            }
            info!("Shutting down");
        }
    }
}

async fn start() -> Result<Dispatcher<UdpBinder>> {
    let config = BackendConfig::load().context("Failed to load configuration")?;
    let window = config.port_window()?;

    let socket = UdpSocket::bind(config.dispatcher_addr())
        .await
        .with_context(|| format!("Failed to bind dispatcher port {}", config.dispatcher_port))?;
    let issuer = TicketIssuer::new(Arc::new(config.ticket_store()));

    info!("===========================================");
    info!("  Fare Collection Backend");
    info!("===========================================");
    info!(
        port = config.dispatcher_port,
        sessions = %format!(
            "{}..{}",
            window.start(),
            u32::from(window.start()) + u32::from(window.width())
        ),
        zone_price = config.zone_price,
        "Backend ready"
    );

    Ok(Dispatcher::new(
        Arc::new(socket),
        UdpBinder::new(config.bind_host),
        window,
        Arc::new(issuer),
        config.session_config(),
    ))
}
