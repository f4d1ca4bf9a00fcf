//! # Ticket Flow
//!
//! The full ticket path over loopback UDP:
//!
//! ```text
//! [VehicleController] ──request──→ [Dispatcher] ──spawn──→ [SessionTask]
//!         ↑                                                     │
//!         └──────────────────reply / ack────────────────────────┘
//!         │
//!         ↓ TicketTable
//! [LookupServer] ←──customer── device
//! ```
//!
//! ## Test Categories
//!
//! 1. **Happy Path**: departure, tickets, lookup
//! 2. **Zone Transit**: re-issue for the new zone
//! 3. **Reuse**: a repeated roster gets the same tickets
//! 4. **Fatal Path**: unreachable backend, then emergency backup

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use fare_types::{CustomerNumber, LookupReply, PassengerRoster, Zone};
    use fc_02_presence::PresenceError;
    use fc_03_session_protocol::{
        Dispatcher, InMemoryTicketStore, PortWindow, SessionConfig, TicketIssuer, UdpBinder,
        UplinkClient, UplinkConfig,
    };
    use tokio::net::UdpSocket;
    use tokio::task::JoinHandle;
    use vehicle_runtime::{
        request_ticket, BackupStore, ControllerError, LookupServer, RosterSource,
        VehicleController, VehicleState, LOOKUP_TIMEOUT,
    };

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    fn customer(raw: u32) -> CustomerNumber {
        CustomerNumber::new(raw).unwrap()
    }

    /// Presence stand-in: the same passengers are always aboard.
    struct Aboard(Vec<u32>);

    #[async_trait]
    impl RosterSource for Aboard {
        async fn observe(&self, zone: Zone) -> Result<PassengerRoster, PresenceError> {
            let mut roster = PassengerRoster::new(zone);
            roster.extend(self.0.iter().map(|c| customer(*c)));
            Ok(roster)
        }
    }

    struct Backend {
        addr: SocketAddr,
        store: Arc<InMemoryTicketStore>,
        task: JoinHandle<()>,
    }

    impl Drop for Backend {
        fn drop(&mut self) {
            self.task.abort();
        }
    }

    /// A backend on an OS-assigned port; sessions also get OS-assigned ports.
    async fn start_backend() -> Backend {
        let socket = UdpSocket::bind((LOCALHOST, 0)).await.unwrap();
        let addr = socket.local_addr().unwrap();
        let store = Arc::new(InMemoryTicketStore::default());
        let dispatcher = Dispatcher::new(
            Arc::new(socket),
            UdpBinder::new(LOCALHOST),
            PortWindow::new(0, 1).unwrap(),
            Arc::new(TicketIssuer::new(store.clone())),
            SessionConfig::default(),
        );
        Backend {
            addr,
            store,
            task: tokio::spawn(dispatcher.run()),
        }
    }

    async fn start_vehicle(
        uplink: UplinkConfig,
        passengers: &[u32],
        backup_dir: &Path,
        request_attempts: u32,
    ) -> Arc<VehicleController> {
        let socket = UdpSocket::bind((LOCALHOST, 0)).await.unwrap();
        Arc::new(VehicleController::new(
            Arc::new(Aboard(passengers.to_vec())),
            Arc::new(UplinkClient::new(socket, uplink)),
            BackupStore::new(backup_dir.join("vc_backup.bin")),
            request_attempts,
            VehicleState::new(Zone::FIRST),
        ))
    }

    async fn start_lookup(controller: &Arc<VehicleController>) -> (SocketAddr, JoinHandle<()>) {
        let socket = UdpSocket::bind((LOCALHOST, 0)).await.unwrap();
        let addr = socket.local_addr().unwrap();
        let task = tokio::spawn(LookupServer::new(socket, Arc::clone(controller)).run());
        (addr, task)
    }

    // =========================================================================
    // HAPPY PATH
    // =========================================================================

    #[tokio::test]
    async fn test_departure_fetches_tickets_and_serves_lookups() {
        let dir = tempfile::tempdir().unwrap();
        let backend = start_backend().await;
        let vehicle = start_vehicle(UplinkConfig::new(backend.addr), &[5, 7], dir.path(), 5).await;

        let tickets = vehicle.on_departed().await.unwrap();
        assert_eq!(tickets.len(), 2);
        assert_eq!(vehicle.ticket_count(), 2);
        assert_eq!(backend.store.issue_calls(), 1);

        let (lookup_addr, lookup_task) = start_lookup(&vehicle).await;
        let device = UdpSocket::bind((LOCALHOST, 0)).await.unwrap();

        match request_ticket(&device, lookup_addr, customer(5), LOOKUP_TIMEOUT)
            .await
            .unwrap()
        {
            LookupReply::Found(ticket) => {
                assert_eq!(ticket.owner(), customer(5));
                assert_eq!(ticket.start_zone(), Zone::FIRST);
            }
            LookupReply::NotFound => panic!("ticket for customer 5 missing"),
        }
        let missing = request_ticket(&device, lookup_addr, customer(9), LOOKUP_TIMEOUT)
            .await
            .unwrap();
        assert_eq!(missing, LookupReply::NotFound);

        let snapshot = BackupStore::new(dir.path().join("vc_backup.bin"))
            .load()
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.table.len(), 2);
        assert_eq!(snapshot.roster.len(), 2);

        lookup_task.abort();
    }

    // =========================================================================
    // ZONE TRANSIT
    // =========================================================================

    #[tokio::test]
    async fn test_zone_transit_reissues_for_new_zone() {
        let dir = tempfile::tempdir().unwrap();
        let backend = start_backend().await;
        let vehicle = start_vehicle(UplinkConfig::new(backend.addr), &[5], dir.path(), 5).await;

        vehicle.on_departed().await.unwrap();
        let first = vehicle.lookup(customer(5)).unwrap();

        // Zone 2 is still covered by a ticket starting in zone 1.
        let zone_two = Zone::new(2).unwrap();
        vehicle.on_zone_changed(zone_two).await.unwrap();
        assert_eq!(vehicle.lookup(customer(5)).unwrap().id(), first.id());
        assert_eq!(backend.store.issue_calls(), 1);

        let zone_four = Zone::new(4).unwrap();
        vehicle.on_zone_changed(zone_four).await.unwrap();
        let reissued = vehicle.lookup(customer(5)).unwrap();
        assert_ne!(reissued.id(), first.id());
        assert_eq!(reissued.start_zone(), zone_four);
        assert_eq!(vehicle.zone(), zone_four);
        assert_eq!(backend.store.issue_calls(), 2);
    }

    // =========================================================================
    // REUSE
    // =========================================================================

    #[tokio::test]
    async fn test_repeated_departure_reuses_tickets() {
        let dir = tempfile::tempdir().unwrap();
        let backend = start_backend().await;
        let vehicle = start_vehicle(UplinkConfig::new(backend.addr), &[5, 7], dir.path(), 5).await;

        vehicle.on_departed().await.unwrap();
        let first = vehicle.lookup(customer(7)).unwrap();
        vehicle.on_departed().await.unwrap();

        assert_eq!(vehicle.lookup(customer(7)).unwrap(), first);
        assert_eq!(backend.store.issue_calls(), 1);
        assert_eq!(backend.store.existing_calls(), 2);
    }

    // =========================================================================
    // FATAL PATH
    // =========================================================================

    #[tokio::test]
    async fn test_silent_backend_exhausts_retries_then_backup_holds_roster() {
        let dir = tempfile::tempdir().unwrap();
        // Bound but never read: requests vanish without an ICMP error.
        let silent = UdpSocket::bind((LOCALHOST, 0)).await.unwrap();
        let uplink = UplinkConfig {
            resend_timeout: Duration::from_millis(20),
            max_requests: 2,
            ..UplinkConfig::new(silent.local_addr().unwrap())
        };
        let vehicle = start_vehicle(uplink, &[5, 7], dir.path(), 2).await;

        let result = vehicle.on_departed().await;
        assert!(matches!(
            result,
            Err(ControllerError::TicketsUnavailable { attempts: 2, .. })
        ));

        vehicle.emergency_backup().unwrap();
        let snapshot = BackupStore::new(dir.path().join("vc_backup.bin"))
            .load()
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.roster.len(), 2);
        assert!(snapshot.table.is_empty());
    }
}
