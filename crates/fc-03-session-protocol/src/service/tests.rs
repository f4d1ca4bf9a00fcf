//! Tests for the session services

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fare_types::{decode, encode, CustomerNumber, PassengerRoster, Ticket, TicketList, Zone};
use tokio::time::Instant;

use super::*;
use crate::adapters::InMemoryTicketStore;
use crate::domain::{
    Frame, PortWindow, SessionConfig, SessionOutcome, UplinkConfig, ACK_PAYLOAD, SEQ_ACK,
    SEQ_REPLY, SEQ_REQUEST,
};
use crate::error::UplinkError;
use crate::ports::{DatagramTransport, StoreError, TicketStore, TransportError};
use crate::test_utils::{MemoryNetwork, MemoryTransport};

const HOST: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

fn addr(s: &str) -> SocketAddr {
    s.parse().unwrap()
}

fn dispatcher_addr() -> SocketAddr {
    addr("10.0.0.1:2408")
}

fn session_addr() -> SocketAddr {
    addr("10.0.0.1:2409")
}

fn client_addr() -> SocketAddr {
    addr("10.0.0.9:6000")
}

fn roster(zone: u8, customers: &[u32]) -> PassengerRoster {
    let mut roster = PassengerRoster::new(Zone::new(zone).unwrap());
    roster.extend(customers.iter().map(|c| CustomerNumber::new(*c).unwrap()));
    roster
}

fn request(roster: &PassengerRoster) -> Vec<u8> {
    Frame::encode(SEQ_REQUEST, &encode(roster).unwrap())
}

fn ack() -> Vec<u8> {
    Frame::encode(SEQ_ACK, &encode(ACK_PAYLOAD).unwrap())
}

fn tickets_in(reply: &[u8]) -> TicketList {
    let frame = Frame::parse(reply).unwrap();
    assert_eq!(frame.seq, SEQ_REPLY);
    decode(frame.payload).unwrap()
}

fn owners(tickets: &TicketList) -> Vec<u32> {
    let mut owners: Vec<u32> = tickets.customers().map(CustomerNumber::get).collect();
    owners.sort_unstable();
    owners
}

fn issuer(store: &Arc<InMemoryTicketStore>) -> Arc<TicketIssuer> {
    Arc::new(TicketIssuer::new(Arc::clone(store) as Arc<dyn TicketStore>))
}

struct FailingStore;

#[async_trait]
impl TicketStore for FailingStore {
    async fn existing_tickets(&self, _: &PassengerRoster) -> Result<TicketList, StoreError> {
        Err(StoreError::Unavailable("database offline".into()))
    }

    async fn issue_tickets(&self, _: &PassengerRoster) -> Result<TicketList, StoreError> {
        Err(StoreError::Unavailable("database offline".into()))
    }
}

/// Fails the first lookup, then behaves like the in-memory store.
struct FlakyStore {
    failed: std::sync::atomic::AtomicBool,
    inner: InMemoryTicketStore,
}

#[async_trait]
impl TicketStore for FlakyStore {
    async fn existing_tickets(&self, roster: &PassengerRoster) -> Result<TicketList, StoreError> {
        if !self.failed.swap(true, std::sync::atomic::Ordering::SeqCst) {
            return Err(StoreError::Unavailable("database restarting".into()));
        }
        self.inner.existing_tickets(roster).await
    }

    async fn issue_tickets(&self, roster: &PassengerRoster) -> Result<TicketList, StoreError> {
        self.inner.issue_tickets(roster).await
    }
}

struct SessionFixture {
    net: Arc<MemoryNetwork>,
    server: Arc<MemoryTransport>,
    client: MemoryTransport,
}

impl SessionFixture {
    fn new() -> Self {
        let net = MemoryNetwork::new(HOST);
        let server = Arc::new(net.attach(session_addr()).unwrap());
        let client = net.attach(client_addr()).unwrap();
        Self {
            net,
            server,
            client,
        }
    }

    fn spawn(
        &self,
        issuer: Arc<TicketIssuer>,
        first: Vec<u8>,
    ) -> tokio::task::JoinHandle<SessionReport> {
        let task = SessionTask::new(
            Arc::clone(&self.server),
            self.client.addr(),
            issuer,
            SessionConfig::default(),
        );
        tokio::spawn(task.run(first))
    }
}

// =============================================================================
// Session
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_session_replies_and_closes_on_ack() {
    let fx = SessionFixture::new();
    let store = Arc::new(InMemoryTicketStore::default());
    let handle = fx.spawn(issuer(&store), request(&roster(1, &[5, 6])));

    let (reply, from) = fx.client.recv_datagram().await.unwrap();
    assert_eq!(from, session_addr());
    assert_eq!(owners(&tickets_in(&reply)), vec![5, 6]);

    fx.client.send_datagram(&ack(), from).await.unwrap();
    let report = handle.await.unwrap();

    assert_eq!(report.outcome, SessionOutcome::Acknowledged);
    assert_eq!(report.peer, client_addr());
    assert_eq!(report.replies_sent, 1);
    assert_eq!(report.timer_fires, 0);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_request_gets_identical_reply() {
    let fx = SessionFixture::new();
    let store = Arc::new(InMemoryTicketStore::default());
    let first = request(&roster(2, &[5]));
    let handle = fx.spawn(issuer(&store), first.clone());

    let (reply, _) = fx.client.recv_datagram().await.unwrap();
    fx.client.send_datagram(&first, session_addr()).await.unwrap();
    let (replayed, _) = fx.client.recv_datagram().await.unwrap();

    assert_eq!(replayed, reply);
    assert_eq!(store.existing_calls(), 1);
    assert_eq!(store.issue_calls(), 1);

    fx.client.send_datagram(&ack(), session_addr()).await.unwrap();
    let report = handle.await.unwrap();
    assert_eq!(report.outcome, SessionOutcome::Acknowledged);
    assert_eq!(report.replies_sent, 2);
}

#[tokio::test(start_paused = true)]
async fn test_unacknowledged_session_gives_up_on_third_timeout() {
    let fx = SessionFixture::new();
    let store = Arc::new(InMemoryTicketStore::default());
    let start = Instant::now();

    let report = fx
        .spawn(issuer(&store), request(&roster(1, &[5])))
        .await
        .unwrap();

    assert_eq!(report.outcome, SessionOutcome::RetriesExhausted);
    assert_eq!(report.timer_fires, 3);
    assert_eq!(report.replies_sent, 3);
    assert_eq!(start.elapsed(), Duration::from_secs(12));

    let (first, _) = fx.client.recv_datagram().await.unwrap();
    for _ in 0..2 {
        assert_eq!(fx.client.recv_datagram().await.unwrap().0, first);
    }
}

#[tokio::test(start_paused = true)]
async fn test_unknown_sequence_and_empty_datagrams_are_dropped() {
    let fx = SessionFixture::new();
    let store = Arc::new(InMemoryTicketStore::default());
    let handle = fx.spawn(issuer(&store), request(&roster(1, &[5])));
    fx.client.recv_datagram().await.unwrap();

    fx.client.send_datagram(&Frame::encode(7, b"?"), session_addr()).await.unwrap();
    fx.client.send_datagram(&Frame::encode(SEQ_REPLY, b""), session_addr()).await.unwrap();
    fx.client.send_datagram(b"", session_addr()).await.unwrap();
    fx.client.send_datagram(&ack(), session_addr()).await.unwrap();

    let report = handle.await.unwrap();
    assert_eq!(report.outcome, SessionOutcome::Acknowledged);
    assert_eq!(report.replies_sent, 1);
}

#[tokio::test(start_paused = true)]
async fn test_foreign_peer_cannot_ack() {
    let fx = SessionFixture::new();
    let store = Arc::new(InMemoryTicketStore::default());
    let intruder = fx.net.attach(addr("10.0.0.66:6000")).unwrap();
    let handle = fx.spawn(issuer(&store), request(&roster(1, &[5])));
    fx.client.recv_datagram().await.unwrap();

    intruder.send_datagram(&ack(), session_addr()).await.unwrap();
    tokio::task::yield_now().await;
    assert!(!handle.is_finished());

    fx.client.send_datagram(&ack(), session_addr()).await.unwrap();
    assert_eq!(handle.await.unwrap().outcome, SessionOutcome::Acknowledged);
}

#[tokio::test(start_paused = true)]
async fn test_reply_send_failure_ends_session() {
    let fx = SessionFixture::new();
    let store = Arc::new(InMemoryTicketStore::default());
    fx.server.fail_next_sends(3);

    let report = fx
        .spawn(issuer(&store), request(&roster(1, &[5])))
        .await
        .unwrap();

    assert_eq!(report.outcome, SessionOutcome::SendFailed);
    assert_eq!(report.replies_sent, 0);
}

#[tokio::test(start_paused = true)]
async fn test_reply_send_succeeds_on_last_attempt() {
    let fx = SessionFixture::new();
    let store = Arc::new(InMemoryTicketStore::default());
    fx.server.fail_next_sends(2);
    let handle = fx.spawn(issuer(&store), request(&roster(1, &[5])));

    fx.client.recv_datagram().await.unwrap();
    fx.client.send_datagram(&ack(), session_addr()).await.unwrap();
    assert_eq!(handle.await.unwrap().outcome, SessionOutcome::Acknowledged);
}

#[tokio::test(start_paused = true)]
async fn test_store_failure_lets_session_expire() {
    let fx = SessionFixture::new();
    let failing = Arc::new(TicketIssuer::new(Arc::new(FailingStore)));
    let start = Instant::now();

    let report = fx.spawn(failing, request(&roster(1, &[5]))).await.unwrap();

    assert_eq!(report.outcome, SessionOutcome::RetriesExhausted);
    assert_eq!(report.timer_fires, 3);
    assert_eq!(report.replies_sent, 0);
    assert_eq!(start.elapsed(), Duration::from_secs(12));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_request_after_store_failure_is_served() {
    let fx = SessionFixture::new();
    let flaky = Arc::new(TicketIssuer::new(Arc::new(FlakyStore {
        failed: Default::default(),
        inner: InMemoryTicketStore::default(),
    })));
    let handle = fx.spawn(flaky, request(&roster(1, &[5])));

    fx.client
        .send_datagram(&request(&roster(1, &[5])), session_addr())
        .await
        .unwrap();
    let (reply, _) = fx.client.recv_datagram().await.unwrap();
    assert_eq!(owners(&tickets_in(&reply)), vec![5]);

    fx.client.send_datagram(&ack(), session_addr()).await.unwrap();
    let report = handle.await.unwrap();
    assert_eq!(report.outcome, SessionOutcome::Acknowledged);
    assert_eq!(report.replies_sent, 1);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_roster_is_dropped_and_retry_served() {
    let fx = SessionFixture::new();
    let store = Arc::new(InMemoryTicketStore::default());
    let handle = fx.spawn(issuer(&store), Frame::encode(SEQ_REQUEST, &[0xff, 0xff]));

    fx.client
        .send_datagram(&request(&roster(3, &[8])), session_addr())
        .await
        .unwrap();
    let (reply, _) = fx.client.recv_datagram().await.unwrap();
    assert_eq!(owners(&tickets_in(&reply)), vec![8]);

    fx.client.send_datagram(&ack(), session_addr()).await.unwrap();
    assert_eq!(handle.await.unwrap().outcome, SessionOutcome::Acknowledged);
}

// =============================================================================
// Uplink client against an in-memory dispatcher
// =============================================================================

fn dispatcher(net: &Arc<MemoryNetwork>, store: &Arc<InMemoryTicketStore>) -> Dispatcher<Arc<MemoryNetwork>> {
    let listener: Arc<dyn DatagramTransport> = Arc::new(net.attach(dispatcher_addr()).unwrap());
    Dispatcher::new(
        listener,
        Arc::clone(net),
        PortWindow::new(2409, 2000).unwrap(),
        issuer(store),
        SessionConfig::default(),
    )
}

/// Accept one request and wait for its session to finish.
fn serve_one(mut dispatcher: Dispatcher<Arc<MemoryNetwork>>) -> tokio::task::JoinHandle<SessionReport> {
    tokio::spawn(async move {
        let session = dispatcher.accept_one().await.unwrap().unwrap();
        session.await.unwrap()
    })
}

#[tokio::test(start_paused = true)]
async fn test_uplink_acks_the_session_port() {
    let net = MemoryNetwork::new(HOST);
    let store = Arc::new(InMemoryTicketStore::default());
    let server = serve_one(dispatcher(&net, &store));
    let transport = Arc::new(net.attach(client_addr()).unwrap());
    let client = UplinkClient::new(Arc::clone(&transport), UplinkConfig::new(dispatcher_addr()));

    let tickets = client.request_tickets(&roster(1, &[5, 7])).await.unwrap();
    assert_eq!(owners(&tickets), vec![5, 7]);

    let report = server.await.unwrap();
    assert_eq!(report.outcome, SessionOutcome::Acknowledged);
    assert_eq!(report.peer, client_addr());

    let sent = transport.sent();
    assert_eq!(sent[0].1, dispatcher_addr());
    assert_eq!(sent.last().unwrap().1, session_addr());
    assert_eq!(Frame::parse(&sent.last().unwrap().0).unwrap().seq, SEQ_ACK);
}

#[tokio::test(start_paused = true)]
async fn test_uplink_gives_up_after_five_requests() {
    let net = MemoryNetwork::new(HOST);
    let transport = Arc::new(net.attach(client_addr()).unwrap());
    let client = UplinkClient::new(Arc::clone(&transport), UplinkConfig::new(dispatcher_addr()));
    let start = Instant::now();

    let result = client.request_tickets(&roster(1, &[5])).await;

    assert!(matches!(result, Err(UplinkError::NoReply { requests: 5 })));
    assert_eq!(start.elapsed(), Duration::from_secs(20));
    assert_eq!(transport.sent().len(), 5);
    assert!(transport.sent().iter().all(|(_, to)| *to == dispatcher_addr()));
}

#[tokio::test(start_paused = true)]
async fn test_uplink_resends_lost_request() {
    let net = MemoryNetwork::new(HOST);
    let store = Arc::new(InMemoryTicketStore::default());
    let server = serve_one(dispatcher(&net, &store));
    net.drop_next(dispatcher_addr(), 1);
    let transport = Arc::new(net.attach(client_addr()).unwrap());
    let client = UplinkClient::new(Arc::clone(&transport), UplinkConfig::new(dispatcher_addr()));
    let start = Instant::now();

    let tickets = client.request_tickets(&roster(1, &[5])).await.unwrap();

    assert_eq!(owners(&tickets), vec![5]);
    assert_eq!(start.elapsed(), Duration::from_secs(4));
    assert_eq!(transport.sent().len(), 3);
    assert_eq!(server.await.unwrap().outcome, SessionOutcome::Acknowledged);
}

#[tokio::test(start_paused = true)]
async fn test_uplink_acks_malformed_reply_before_failing() {
    let net = MemoryNetwork::new(HOST);
    let fake = net.attach(dispatcher_addr()).unwrap();
    let responder = tokio::spawn(async move {
        let (_, from) = fake.recv_datagram().await.unwrap();
        fake.send_datagram(&Frame::encode(SEQ_REPLY, &[0xff]), from).await.unwrap();
        let (ack, _) = fake.recv_datagram().await.unwrap();
        Frame::parse(&ack).unwrap().seq
    });
    let client = UplinkClient::new(
        net.attach(client_addr()).unwrap(),
        UplinkConfig::new(dispatcher_addr()),
    );

    let result = client.request_tickets(&roster(1, &[5])).await;

    assert!(matches!(result, Err(UplinkError::MalformedReply(_))));
    assert_eq!(responder.await.unwrap(), SEQ_ACK);
}

#[tokio::test(start_paused = true)]
async fn test_uplink_never_returns_resent_reply_of_earlier_call() {
    let net = MemoryNetwork::new(HOST);
    let store = Arc::new(InMemoryTicketStore::default());
    let backend = tokio::spawn(dispatcher(&net, &store).run());
    // The first ack is lost, so session 2409 keeps resending its reply.
    net.drop_next(session_addr(), 1);
    let transport = Arc::new(net.attach(client_addr()).unwrap());
    let client = UplinkClient::new(Arc::clone(&transport), UplinkConfig::new(dispatcher_addr()));

    let first = client.request_tickets(&roster(1, &[5])).await.unwrap();
    assert_eq!(first.iter().next().unwrap().start_zone().get(), 1);

    tokio::time::sleep(Duration::from_secs(5)).await;
    let second = client.request_tickets(&roster(4, &[5])).await.unwrap();

    let ticket = second.iter().next().unwrap();
    assert_eq!(ticket.start_zone().get(), 4);
    assert_eq!(store.issue_calls(), 2);
    let acks_to_first_session = transport
        .sent()
        .iter()
        .filter(|(bytes, to)| *to == session_addr() && Frame::parse(bytes).unwrap().seq == SEQ_ACK)
        .count();
    assert_eq!(acks_to_first_session, 2);
    backend.abort();
}

#[tokio::test(start_paused = true)]
async fn test_uplink_escalates_send_failure() {
    let net = MemoryNetwork::new(HOST);
    let transport = Arc::new(net.attach(client_addr()).unwrap());
    transport.fail_next_sends(3);
    let client = UplinkClient::new(Arc::clone(&transport), UplinkConfig::new(dispatcher_addr()));

    let result = client.request_tickets(&roster(1, &[5])).await;

    assert!(matches!(
        result,
        Err(UplinkError::Transport(TransportError::Io(_)))
    ));
    assert!(transport.sent().is_empty());
}

// =============================================================================
// Dispatcher
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_dispatcher_rotates_session_ports() {
    let net = MemoryNetwork::new(HOST);
    let store = Arc::new(InMemoryTicketStore::default());
    let mut dispatcher = dispatcher(&net, &store);
    let a = net.attach(addr("10.0.0.20:7000")).unwrap();
    let b = net.attach(addr("10.0.0.21:7000")).unwrap();

    a.send_datagram(&request(&roster(1, &[1])), dispatcher_addr()).await.unwrap();
    b.send_datagram(&request(&roster(1, &[2])), dispatcher_addr()).await.unwrap();
    let first = dispatcher.accept_one().await.unwrap().unwrap();
    let second = dispatcher.accept_one().await.unwrap().unwrap();

    let (_, from_a) = a.recv_datagram().await.unwrap();
    let (_, from_b) = b.recv_datagram().await.unwrap();
    assert_eq!(from_a, addr("10.0.0.1:2409"));
    assert_eq!(from_b, addr("10.0.0.1:2410"));

    a.send_datagram(&ack(), from_a).await.unwrap();
    b.send_datagram(&ack(), from_b).await.unwrap();
    assert_eq!(first.await.unwrap().outcome, SessionOutcome::Acknowledged);
    assert_eq!(second.await.unwrap().outcome, SessionOutcome::Acknowledged);
}

#[tokio::test(start_paused = true)]
async fn test_dispatcher_skips_busy_port() {
    let net = MemoryNetwork::new(HOST);
    let store = Arc::new(InMemoryTicketStore::default());
    let mut dispatcher = dispatcher(&net, &store);
    let _squatter = net.attach(session_addr()).unwrap();
    let client = net.attach(client_addr()).unwrap();
    let req = request(&roster(1, &[5]));

    client.send_datagram(&req, dispatcher_addr()).await.unwrap();
    assert!(dispatcher.accept_one().await.unwrap().is_none());

    client.send_datagram(&req, dispatcher_addr()).await.unwrap();
    let session = dispatcher.accept_one().await.unwrap().unwrap();
    let (_, from) = client.recv_datagram().await.unwrap();
    assert_eq!(from, addr("10.0.0.1:2410"));

    client.send_datagram(&ack(), from).await.unwrap();
    assert_eq!(session.await.unwrap().outcome, SessionOutcome::Acknowledged);
}

#[tokio::test(start_paused = true)]
async fn test_dispatcher_stops_when_socket_closes() {
    let net = MemoryNetwork::new(HOST);
    let store = Arc::new(InMemoryTicketStore::default());
    let running = tokio::spawn(dispatcher(&net, &store).run());

    tokio::task::yield_now().await;
    net.close(dispatcher_addr());

    running.await.unwrap();
}

// =============================================================================
// Issuance
// =============================================================================

#[tokio::test]
async fn test_issuer_reuses_existing_and_issues_remainder() {
    let store = Arc::new(InMemoryTicketStore::default());
    store.insert(Ticket::new(40, "2014-12-02 16:00:00", 2400, 1, 2, 5).unwrap());

    let tickets = issuer(&store).tickets_for(&roster(1, &[5, 6])).await.unwrap();

    assert_eq!(owners(&tickets), vec![5, 6]);
    assert_eq!(tickets.get(CustomerNumber::new(5).unwrap()).unwrap().id(), 40);
    assert_eq!(store.issue_calls(), 1);
}

#[tokio::test]
async fn test_issuer_skips_issue_when_everyone_holds_a_ticket() {
    let store = Arc::new(InMemoryTicketStore::default());
    store.insert(Ticket::new(40, "2014-12-02 16:00:00", 2400, 1, 2, 5).unwrap());

    let tickets = issuer(&store).tickets_for(&roster(2, &[5])).await.unwrap();

    assert_eq!(tickets.len(), 1);
    assert_eq!(store.issue_calls(), 0);
}

#[tokio::test]
async fn test_issuer_propagates_store_failure() {
    let issuer = TicketIssuer::new(Arc::new(FailingStore));
    let result = issuer.tickets_for(&roster(1, &[5])).await;
    assert_eq!(
        result.unwrap_err(),
        StoreError::Unavailable("database offline".into())
    );
}
