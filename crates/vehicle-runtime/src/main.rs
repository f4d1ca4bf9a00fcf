//! # Vehicle Runtime
//!
//! Entry point of the on-board computer.
//!
//! ```text
//! stdin ──signals──→ VehicleController ──roster──→ backend dispatcher (2408)
//!                        │        ↑                        │
//!                        │        └──────tickets───────────┘
//!                        ↓
//!   ping (2222) ──multicast──→ devices (2224) ──pong──→ pong (2223) ──→ worker pool
//!   lookup (2225) ←── device ticket queries
//! ```
//!
//! Start-up failures and any fatal error after start-up end the process with
//! exit code -1; the latter write a backup first.

use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use fare_telemetry::{init_logging, TelemetryConfig};
use fc_02_presence::adapters::{bind_ping_socket, bind_pong_socket};
use fc_02_presence::{serve_pongs, PongWorkerPool, PresenceTracker, RosterCollector};
use fc_03_session_protocol::UplinkClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use vehicle_runtime::{
    BackupStore, ControllerError, LookupServer, Signal, VehicleConfig, VehicleController,
    VehicleState,
};

/// The running vehicle: controller plus its background services.
struct VehicleRuntime {
    controller: Arc<VehicleController>,
    services: Vec<JoinHandle<()>>,
}

impl VehicleRuntime {
    /// Bind every socket and start the background services.
    ///
    /// ## Startup Sequence
    ///
    /// 1. Restore the backup (a corrupt one is logged and ignored)
    /// 2. Bind ping, pong, uplink and lookup sockets
    /// 3. Start the pong worker pool and its listener
    /// 4. Start the lookup service
    async fn start(config: VehicleConfig) -> Result<Self> {
        let zone = config.zone()?;
        let backup = BackupStore::new(&config.backup_path);
        let state = match backup.load() {
            Ok(Some(snapshot)) => VehicleState::restore(zone, snapshot),
            Ok(None) => VehicleState::new(zone),
            Err(e) => {
                warn!(error = %e, path = %backup.path().display(), "Ignoring unreadable backup");
                VehicleState::new(zone)
            }
        };

        let network = &config.network;
        let ping = bind_ping_socket(config.local(network.ping_port))
            .await
            .with_context(|| format!("Failed to bind ping socket on port {}", network.ping_port))?;
        let pong = bind_pong_socket(config.local(network.pong_port))
            .await
            .with_context(|| format!("Failed to bind pong socket on port {}", network.pong_port))?;
        let uplink = UdpSocket::bind(config.local(network.uplink_port))
            .await
            .context("Failed to bind uplink socket")?;
        let lookup = UdpSocket::bind(config.local(network.lookup_port))
            .await
            .with_context(|| {
                format!("Failed to bind lookup socket on port {}", network.lookup_port)
            })?;

        let collector = Arc::new(RosterCollector::new());
        let pong = Arc::new(pong);
        let pool = Arc::new(PongWorkerPool::start(
            config.pool_config(),
            Arc::clone(&collector),
            pong.clone(),
        ));
        let tracker = PresenceTracker::new(config.presence_config(), Arc::new(ping), collector);
        let uplink = UplinkClient::new(uplink, config.uplink_config());

        let controller = Arc::new(VehicleController::new(
            Arc::new(tracker),
            Arc::new(uplink),
            backup,
            config.request_attempts,
            state,
        ));

        let services = vec![
            tokio::spawn(serve_pongs(pong, pool)),
            tokio::spawn(LookupServer::new(lookup, Arc::clone(&controller)).run()),
        ];

        info!("===========================================");
        info!("  Fare Collection Vehicle Runtime");
        info!("===========================================");
        info!(%zone, dispatcher = %network.dispatcher, "Vehicle ready");
        info!("Commands: leftstation | zonetransit <1-5> | quit");

        Ok(Self {
            controller,
            services,
        })
    }

    /// Read signals from stdin until `quit` or end of input.
    async fn run_console(&self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = tokio::select! {
                line = lines.next_line() => line.context("Failed to read stdin")?,
                result = tokio::signal::ctrl_c() => {
                    result.context("Failed to listen for Ctrl+C")?;
                    info!("Interrupted");
                    None
                }
            };
            let Some(line) = line else { return Ok(()) };
            if line.trim().is_empty() {
                continue;
            }

            let signal = match line.parse::<Signal>() {
                Ok(signal) => signal,
                Err(e) => {
                    warn!("{e}");
                    continue;
                }
            };
            let result = match signal {
                Signal::LeftStation => self.controller.on_departed().await,
                Signal::ZoneTransit(zone) => self.controller.on_zone_changed(zone).await,
                Signal::Quit => return Ok(()),
            };
            match result {
                Ok(tickets) => info!(tickets = tickets.len(), "Tickets received"),
                Err(e) => self.fail(e),
            }
        }
    }

    /// Fatal path: save what we have and exit with -1.
    fn fail(&self, cause: ControllerError) -> ! {
        error!(error = %cause, "Fatal error; saving backup");
        if let Err(e) = self.controller.emergency_backup() {
            error!(error = %e, "Backup failed");
        }
        process::exit(-1);
    }

    /// Stop the background services and save the final state.
    fn shutdown(self) {
        info!("Shutting down");
        for service in &self.services {
            service.abort();
        }
        if let Err(e) = self.controller.emergency_backup() {
            warn!(error = %e, "Could not save state on shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    let telemetry = TelemetryConfig::from_env().with_service("vehicle-runtime");
    if let Err(e) = init_logging(&telemetry) {
        eprintln!("Failed to initialize logging: {e}");
        process::exit(-1);
    }

    let runtime = match start().await {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Vehicle start-up failed");
            process::exit(-1);
        }
    };

    if let Err(e) = runtime.run_console().await {
        error!(error = %format!("{e:#}"), "Console stopped");
    }
    runtime.shutdown();
}

async fn start() -> Result<VehicleRuntime> {
    let config = VehicleConfig::load().context("Failed to load configuration")?;
    VehicleRuntime::start(config).await
}
