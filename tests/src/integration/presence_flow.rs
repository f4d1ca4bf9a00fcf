//! # Presence Flow
//!
//! A vehicle-side presence cycle against a live device responder:
//!
//! ```text
//! [PresenceTracker] ──ping──→ [DeviceResponder]
//!                                    │ pong
//!                                    ↓
//! [serve_pongs] → [PongWorkerPool] → RosterCollector ──ack──→ device
//! ```
//!
//! Pings go unicast to the device so the tests do not depend on multicast
//! routing of the host.

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::sync::Arc;
    use std::time::Duration;

    use fare_types::{CustomerNumber, Zone};
    use fc_02_presence::adapters::{bind_device_socket, bind_ping_socket, bind_pong_socket};
    use fc_02_presence::{
        serve_pongs, DeviceConfig, DeviceHandle, DeviceResponder, PoolConfig, PongWorkerPool,
        PresenceConfig, PresenceTracker, RosterCollector,
    };
    use fc_03_session_protocol::{
        Dispatcher, InMemoryTicketStore, PortWindow, SessionConfig, TicketIssuer, UdpBinder,
        UplinkClient, UplinkConfig,
    };
    use tokio::net::UdpSocket;
    use tokio::task::JoinHandle;
    use tokio::time::timeout;
    use vehicle_runtime::{BackupStore, VehicleController, VehicleState};

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    fn customer(raw: u32) -> CustomerNumber {
        CustomerNumber::new(raw).unwrap()
    }

    struct Device {
        handle: DeviceHandle,
        addr: SocketAddr,
    }

    struct Vehicle {
        tracker: Arc<PresenceTracker>,
        ping_addr: SocketAddr,
        listener: JoinHandle<()>,
    }

    impl Drop for Vehicle {
        fn drop(&mut self) {
            self.listener.abort();
        }
    }

    async fn start_vehicle_sockets() -> (UdpSocket, UdpSocket) {
        let ping = bind_ping_socket(SocketAddr::new(LOCALHOST, 0)).await.unwrap();
        let pong = bind_pong_socket(SocketAddr::new(LOCALHOST, 0)).await.unwrap();
        (ping, pong)
    }

    fn start_presence(ping: UdpSocket, pong: UdpSocket, device: SocketAddr) -> Vehicle {
        let ping_addr = ping.local_addr().unwrap();
        let collector = Arc::new(RosterCollector::new());
        let pong = Arc::new(pong);
        let pool = Arc::new(PongWorkerPool::start(
            PoolConfig::default(),
            Arc::clone(&collector),
            pong.clone(),
        ));
        let config = PresenceConfig {
            beacon_interval: Duration::from_millis(100),
            beacons_per_cycle: 3,
            max_send_failures: 3,
            beacon_target: device,
        };
        Vehicle {
            tracker: Arc::new(PresenceTracker::new(config, Arc::new(ping), collector)),
            ping_addr,
            listener: tokio::spawn(serve_pongs(pong, pool)),
        }
    }

    async fn start_device(raw: u32, pong_port: u16) -> Device {
        // Group 127.0.0.1 is not multicast, so no group is joined.
        let socket = bind_device_socket(0, Ipv4Addr::LOCALHOST).await.unwrap();
        let addr = SocketAddr::new(LOCALHOST, socket.local_addr().unwrap().port());
        let config = DeviceConfig {
            reply_port: pong_port,
            ..DeviceConfig::new(customer(raw))
        };
        Device {
            handle: DeviceResponder::new(config, Arc::new(socket)).spawn(),
            addr,
        }
    }

    /// Device plus vehicle, wired to each other.
    async fn start_pair(raw: u32) -> (Device, Vehicle) {
        let (ping, pong) = start_vehicle_sockets().await;
        let device = start_device(raw, pong.local_addr().unwrap().port()).await;
        let vehicle = start_presence(ping, pong, device.addr);
        (device, vehicle)
    }

    // =========================================================================
    // PRESENCE CYCLE
    // =========================================================================

    #[tokio::test]
    async fn test_cycle_finds_answering_device() {
        let (device, vehicle) = start_pair(5).await;

        let roster = vehicle.tracker.run_cycle(Zone::FIRST).await.unwrap();

        assert_eq!(roster.len(), 1);
        assert!(roster.contains(customer(5)));
        assert_eq!(roster.zone(), Zone::FIRST);
        device.handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_device_learns_vehicle_and_connects() {
        let (device, vehicle) = start_pair(5).await;
        assert_eq!(device.handle.vehicle(), None);

        vehicle.tracker.run_cycle(Zone::FIRST).await.unwrap();

        assert_eq!(device.handle.vehicle(), Some(vehicle.ping_addr));
        let mut connected = device.handle.connected();
        timeout(Duration::from_secs(2), connected.wait_for(|up| *up))
            .await
            .expect("device never saw an ack")
            .unwrap();
        device.handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_muted_device_is_left_off_roster() {
        let (device, vehicle) = start_pair(5).await;
        device.handle.mute().await;

        let roster = vehicle.tracker.run_cycle(Zone::FIRST).await.unwrap();

        assert!(roster.is_empty());
        device.handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_stopped_device_drops_out_of_next_cycle() {
        let (device, vehicle) = start_pair(5).await;
        assert_eq!(vehicle.tracker.run_cycle(Zone::FIRST).await.unwrap().len(), 1);

        device.handle.shutdown().await;

        let roster = vehicle.tracker.run_cycle(Zone::FIRST).await.unwrap();
        assert!(roster.is_empty());
    }

    // =========================================================================
    // PRESENCE INTO TICKETS
    // =========================================================================

    #[tokio::test]
    async fn test_departure_with_live_device_gets_ticket() {
        let dir = tempfile::tempdir().unwrap();

        let backend_socket = UdpSocket::bind((LOCALHOST, 0)).await.unwrap();
        let backend_addr = backend_socket.local_addr().unwrap();
        let dispatcher = Dispatcher::new(
            Arc::new(backend_socket),
            UdpBinder::new(LOCALHOST),
            PortWindow::new(0, 1).unwrap(),
            Arc::new(TicketIssuer::new(Arc::new(InMemoryTicketStore::default()))),
            SessionConfig::default(),
        );
        let backend = tokio::spawn(dispatcher.run());

        let (device, vehicle) = start_pair(12).await;
        let uplink = UdpSocket::bind((LOCALHOST, 0)).await.unwrap();
        let controller = VehicleController::new(
            vehicle.tracker.clone(),
            Arc::new(UplinkClient::new(uplink, UplinkConfig::new(backend_addr))),
            BackupStore::new(dir.path().join("vc_backup.bin")),
            5,
            VehicleState::new(Zone::FIRST),
        );

        let tickets = controller.on_departed().await.unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(controller.lookup(customer(12)).unwrap().owner(), customer(12));

        device.handle.shutdown().await;
        backend.abort();
    }
}
