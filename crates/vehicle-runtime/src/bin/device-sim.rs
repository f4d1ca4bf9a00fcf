//! # Passenger Device Simulator
//!
//! Answers the vehicle's pings with a customer number and can look up the
//! passenger's ticket on the vehicle.
//!
//! ```text
//! device-sim <customer>     (or FC_CUSTOMER=<customer>)
//! ```
//!
//! Network settings are read the same way as the vehicle's (`FC_CONFIG`,
//! `FC_GROUP`, `FC_BEACON_PORT`, `FC_PONG_PORT`, `FC_LOOKUP_PORT`).

use std::net::SocketAddr;
use std::process;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use fare_telemetry::{init_logging, TelemetryConfig};
use fare_types::{CustomerNumber, LookupReply};
use fc_02_presence::adapters::bind_device_socket;
use fc_02_presence::{DeviceConfig, DeviceHandle, DeviceResponder};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tracing::{error, info, warn};

use vehicle_runtime::{request_ticket, DeviceInput, VehicleConfig, LOOKUP_TIMEOUT};

#[tokio::main]
async fn main() {
    let telemetry = TelemetryConfig::from_env().with_service("device-sim");
    if let Err(e) = init_logging(&telemetry) {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(-1);
    }

    if let Err(e) = run().await {
        error!(error = %format!("{e:#}"), "Device simulator failed");
        process::exit(-1);
    }
}

async fn run() -> Result<()> {
    let customer = customer_number()?;
    let config = VehicleConfig::load().context("Failed to load configuration")?;
    let network = &config.network;

    let socket = bind_device_socket(network.beacon_port, network.group)
        .await
        .with_context(|| format!("Failed to bind device socket on port {}", network.beacon_port))?;
    let device = DeviceConfig {
        reply_port: network.pong_port,
        ..DeviceConfig::new(customer)
    };
    let handle = DeviceResponder::new(device, Arc::new(socket)).spawn();
    info!(%customer, "Device started");
    info!("Commands: mute | unmute | ticket | quit");

    let mut connected = handle.connected();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            changed = connected.changed() => {
                if changed.is_err() {
                    warn!("Device responder stopped");
                    break;
                }
                if *connected.borrow_and_update() {
                    info!("Connected");
                } else {
                    info!("Not connected");
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<DeviceInput>() {
                    Ok(DeviceInput::Mute) => handle.mute().await,
                    Ok(DeviceInput::Unmute) => handle.unmute().await,
                    Ok(DeviceInput::Ticket) => show_ticket(&handle, customer, network.lookup_port).await,
                    Ok(DeviceInput::Quit) => break,
                    Err(e) => warn!("{e}"),
                }
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

/// Customer number from the first argument, else `FC_CUSTOMER`.
fn customer_number() -> Result<CustomerNumber> {
    let raw = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("FC_CUSTOMER").ok())
        .ok_or_else(|| anyhow!("Usage: device-sim <customer number> (or set FC_CUSTOMER)"))?;
    let number: u32 = raw
        .parse()
        .with_context(|| format!("'{raw}' is not a customer number"))?;
    Ok(CustomerNumber::new(number)?)
}

async fn show_ticket(handle: &DeviceHandle, customer: CustomerNumber, lookup_port: u16) {
    let Some(vehicle) = handle.vehicle() else {
        info!("No vehicle seen yet; wait for a ping");
        return;
    };
    let target = SocketAddr::new(vehicle.ip(), lookup_port);

    let socket = match UdpSocket::bind(("0.0.0.0", 0)).await {
        Ok(socket) => socket,
        Err(e) => {
            warn!(error = %e, "Could not open lookup socket");
            return;
        }
    };
    match request_ticket(&socket, target, customer, LOOKUP_TIMEOUT).await {
        Ok(LookupReply::Found(ticket)) => info!(
            id = ticket.id(),
            issued_at = ticket.issued_at(),
            price = ticket.price(),
            start_zone = %ticket.start_zone(),
            zones = ticket.zone_count(),
            "Ticket"
        ),
        Ok(LookupReply::NotFound) => info!("Ticket not found"),
        Err(e) => warn!(error = %e, %target, "Ticket lookup failed"),
    }
}
