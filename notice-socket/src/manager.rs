//! Connection manager for the notice channel.
//!
//! `NoticeChannel` owns the single logical connection to the admin server.
//! It opens the socket, runs the heartbeat while the socket is open, hands
//! inbound frames to the dispatcher and schedules reconnects with capped
//! exponential backoff after every close.
//!
//! Each attempt runs on its own task and reports back tagged with a
//! generation number. Reports carrying an older generation are ignored,
//! which is how `stop()` detaches a socket before closing it.

use std::sync::Arc;
use std::time::Duration;

use notice_core::config::{AppConfig, ChannelConfig};
use notice_core::error::NoticeResult;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backoff::{ReconnectScheduler, ReconnectTimer, RetryPolicy, Schedule};
use crate::bus::NotificationBus;
use crate::credentials::CredentialSource;
use crate::dispatcher::NoticeDispatcher;
use crate::events::ChannelStatus;
use crate::heartbeat::{HeartbeatConfig, HeartbeatMonitor};
use crate::state::{ConnectionState, RetryState};
use crate::transport::{Endpoint, Transport, WsTransport};

/// Frames waiting to be written to the socket.
const OUTBOUND_CAPACITY: usize = 16;

/// How long `stop()` waits for the connection task to close its socket.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Tunables for a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelOptions {
    pub policy: RetryPolicy,
    pub heartbeat: HeartbeatConfig,
}

impl From<&ChannelConfig> for ChannelOptions {
    fn from(config: &ChannelConfig) -> Self {
        Self {
            policy: RetryPolicy::from(config),
            heartbeat: HeartbeatConfig::from(config),
        }
    }
}

/// Result of `NoticeChannel::start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A connection attempt is underway.
    Started,
    /// Already connecting, open, or waiting on a reconnect.
    AlreadyActive,
    /// Nobody is signed in; nothing was done.
    MissingCredential,
}

/// Handle to the notice channel. Clones share the same connection.
#[derive(Clone)]
pub struct NoticeChannel {
    shared: Arc<Shared>,
}

struct Shared {
    endpoint: Endpoint,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialSource>,
    dispatcher: NoticeDispatcher,
    scheduler: ReconnectScheduler,
    state_tx: watch::Sender<ConnectionState>,
    inner: Mutex<Inner>,
}

struct Inner {
    state: ConnectionState,
    retry: RetryState,
    /// Bumped for every attempt and on `stop()`.
    generation: u64,
    /// Read at `start()`, reused by reconnects.
    credential: Option<String>,
    link: Option<Link>,
    timer: ReconnectTimer,
    heartbeat: HeartbeatMonitor,
}

/// The task driving the current attempt.
struct Link {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl NoticeChannel {
    pub fn new(
        endpoint: Endpoint,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialSource>,
        bus: NotificationBus,
        options: ChannelOptions,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        let dispatcher = NoticeDispatcher::new(bus, options.heartbeat.pong_payload.clone());

        Self {
            shared: Arc::new(Shared {
                endpoint,
                transport,
                credentials,
                dispatcher,
                scheduler: ReconnectScheduler::new(options.policy),
                state_tx,
                inner: Mutex::new(Inner {
                    state: ConnectionState::Idle,
                    retry: RetryState::default(),
                    generation: 0,
                    credential: None,
                    link: None,
                    timer: ReconnectTimer::default(),
                    heartbeat: HeartbeatMonitor::new(options.heartbeat),
                }),
            }),
        }
    }

    /// Build a WebSocket-backed channel from application config.
    pub fn from_config(
        config: &AppConfig,
        credentials: Arc<dyn CredentialSource>,
        bus: NotificationBus,
    ) -> NoticeResult<Self> {
        config.channel.validate()?;
        let endpoint = Endpoint::from_server_config(&config.server)?;
        let transport = Arc::new(WsTransport::new(config.channel.connect_timeout()));
        Ok(Self::new(
            endpoint,
            transport,
            credentials,
            bus,
            ChannelOptions::from(&config.channel),
        ))
    }

    /// Begin connecting.
    ///
    /// Accepted from `Idle`, from `Failed`, and from `Closed` when no
    /// reconnect is pending. Starting from `Failed` grants a fresh retry
    /// budget. Connection problems never surface here; watch the state or
    /// the bus status topic instead.
    pub async fn start(&self) -> StartOutcome {
        let Some(credential) = self.shared.credentials.token() else {
            debug!("no credential available, notice channel not started");
            return StartOutcome::MissingCredential;
        };

        let mut inner = self.shared.inner.lock().await;
        let startable = match inner.state {
            ConnectionState::Idle | ConnectionState::Failed => true,
            ConnectionState::Closed => !inner.timer.is_armed(),
            ConnectionState::Connecting | ConnectionState::Open | ConnectionState::Closing => false,
        };
        if !startable {
            debug!("notice channel already {}, ignoring start", inner.state);
            return StartOutcome::AlreadyActive;
        }

        info!("starting notice channel to {}", self.shared.endpoint);
        inner.retry.reset();
        inner.credential = Some(credential.clone());
        self.shared.begin_attempt(&mut inner, credential);
        StartOutcome::Started
    }

    /// Tear the channel down. Safe to call in any state, any number of times.
    ///
    /// Pending reconnects and the heartbeat are cancelled and the current
    /// socket is detached before it is closed, so nothing it reports
    /// afterwards reaches the bus. `Idle` and `Failed` are left as they are.
    pub async fn stop(&self) {
        let task = {
            let mut inner = self.shared.inner.lock().await;
            inner.generation += 1;
            inner.timer.cancel();
            inner.heartbeat.stop();

            let Some(mut link) = inner.link.take() else {
                debug!("stop: no live connection ({})", inner.state);
                return;
            };

            self.shared.set_state(&mut inner, ConnectionState::Closing);
            let signalled = link.shutdown.take().is_some_and(|tx| tx.send(()).is_ok());
            if !signalled {
                link.task.abort();
            }
            self.shared.set_state(&mut inner, ConnectionState::Closed);
            link.task
        };

        let mut task = task;
        if tokio::time::timeout(CLOSE_GRACE, &mut task).await.is_err() {
            warn!("connection task did not finish within {:?}, aborting", CLOSE_GRACE);
            task.abort();
        }
        info!("notice channel stopped");
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    /// Receiver that observes every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    pub async fn retry_state(&self) -> RetryState {
        self.shared.inner.lock().await.retry
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn bus(&self) -> &NotificationBus {
        self.shared.dispatcher.bus()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.shared.endpoint
    }

    pub fn policy(&self) -> &RetryPolicy {
        self.shared.scheduler.policy()
    }
}

impl std::fmt::Debug for NoticeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoticeChannel")
            .field("endpoint", &self.shared.endpoint.to_string())
            .field("state", &self.state())
            .finish()
    }
}

impl Shared {
    fn set_state(&self, inner: &mut Inner, to: ConnectionState) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;
        self.state_tx.send_replace(to);
        self.dispatcher
            .bus()
            .status()
            .publish(ChannelStatus::StateChanged { from, to });
        debug!("notice channel {from} -> {to}");
    }

    /// Spawn a fresh attempt, replacing any timer or link still around.
    fn begin_attempt(self: &Arc<Self>, inner: &mut Inner, credential: String) {
        inner.timer.cancel();
        inner.heartbeat.stop();
        if let Some(old) = inner.link.take() {
            debug!("dropping previous connection task");
            old.task.abort();
        }

        inner.generation += 1;
        let generation = inner.generation;
        self.set_state(inner, ConnectionState::Connecting);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_connection(self.clone(), generation, credential, shutdown_rx));
        inner.link = Some(Link {
            shutdown: Some(shutdown_tx),
            task,
        });
    }

    /// The socket opened. Returns false if this attempt has been detached.
    async fn on_open(&self, generation: u64, outbound: mpsc::Sender<String>) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation || inner.state != ConnectionState::Connecting {
            debug!("discarding socket from stale attempt {generation}");
            return false;
        }
        inner.retry.reset();
        self.set_state(&mut inner, ConnectionState::Open);
        inner.heartbeat.start(outbound);
        info!("notice channel connected to {}", self.endpoint);
        true
    }

    async fn on_message(&self, generation: u64, raw: &str) {
        {
            let inner = self.inner.lock().await;
            if inner.generation != generation || inner.state != ConnectionState::Open {
                return;
            }
        }
        self.dispatcher.dispatch(raw);
    }

    /// The socket closed, errored, or never opened.
    async fn on_close(self: &Arc<Self>, generation: u64) {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            debug!("ignoring close from stale attempt {generation}");
            return;
        }

        inner.link = None;
        inner.heartbeat.stop();
        self.set_state(&mut inner, ConnectionState::Closed);

        match self.scheduler.next(&mut inner.retry) {
            Schedule::Retry { attempt, delay } => {
                info!(
                    "reconnecting in {:?} (attempt {attempt}/{})",
                    delay,
                    self.scheduler.policy().max_retries
                );
                self.dispatcher
                    .bus()
                    .status()
                    .publish(ChannelStatus::ReconnectScheduled { attempt, delay });
                let shared = self.clone();
                inner.timer.arm(delay, async move {
                    shared.reconnect(generation).await;
                });
            }
            Schedule::Exhausted { attempts } => {
                self.set_state(&mut inner, ConnectionState::Failed);
                warn!("notice channel gave up after {attempts} reconnect attempts");
                self.dispatcher
                    .bus()
                    .status()
                    .publish(ChannelStatus::Exhausted { attempts });
            }
        }
    }

    /// Reconnect timer callback.
    async fn reconnect(self: &Arc<Self>, generation: u64) {
        let mut inner = self.inner.lock().await;
        inner.timer.disarm();
        if inner.generation != generation || inner.state != ConnectionState::Closed {
            debug!("reconnect for stale attempt {generation} skipped");
            return;
        }
        let Some(credential) = inner.credential.clone() else {
            return;
        };
        debug!("reconnect attempt {} firing", inner.retry.attempt);
        self.begin_attempt(&mut inner, credential);
    }
}

/// Drive one connection attempt from open to close.
async fn run_connection(
    shared: Arc<Shared>,
    generation: u64,
    credential: String,
    mut shutdown: oneshot::Receiver<()>,
) {
    let opened = tokio::select! {
        result = shared.transport.open(&shared.endpoint, &credential) => result,
        _ = &mut shutdown => return,
    };

    let mut socket = match opened {
        Ok(socket) => socket,
        Err(e) => {
            warn!("notice socket connect failed: {e}");
            shared.on_close(generation).await;
            return;
        }
    };

    let (outbound_tx, mut outbound) = mpsc::channel::<String>(OUTBOUND_CAPACITY);
    if !shared.on_open(generation, outbound_tx).await {
        socket.close().await;
        return;
    }

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                socket.close().await;
                debug!("connection task {generation} shut down");
                return;
            }
            frame = socket.recv() => match frame {
                Some(Ok(text)) => shared.on_message(generation, &text).await,
                Some(Err(e)) => {
                    warn!("notice socket error: {e}");
                    break;
                }
                None => {
                    info!("notice socket closed by server");
                    break;
                }
            },
            Some(text) = outbound.recv() => {
                if let Err(e) = socket.send(text).await {
                    warn!("notice socket send failed: {e}");
                    break;
                }
            }
        }
    }

    socket.close().await;
    shared.on_close(generation).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredential;
    use crate::events::{NoticeCategory, NoticeEvent};
    use crate::transport::Socket;
    use async_trait::async_trait;
    use notice_core::error::NoticeError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::broadcast;

    /// Server side of a mock connection.
    struct MockPeer {
        to_client: Option<mpsc::UnboundedSender<String>>,
        from_client: mpsc::UnboundedReceiver<String>,
        closed: Arc<AtomicBool>,
    }

    impl MockPeer {
        fn push(&self, text: &str) {
            if let Some(tx) = &self.to_client {
                let _ = tx.send(text.to_string());
            }
        }

        /// Simulate the server dropping the connection.
        fn hang_up(&mut self) {
            self.to_client = None;
        }
    }

    struct MockSocket {
        inbound: mpsc::UnboundedReceiver<String>,
        outbound: mpsc::UnboundedSender<String>,
        closed: Arc<AtomicBool>,
        live: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Socket for MockSocket {
        async fn send(&mut self, text: String) -> NoticeResult<()> {
            self.outbound
                .send(text)
                .map_err(|_| NoticeError::SocketClosed)
        }

        async fn recv(&mut self) -> Option<NoticeResult<String>> {
            self.inbound.recv().await.map(Ok)
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    impl Drop for MockSocket {
        fn drop(&mut self) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct Counters {
        opens: AtomicUsize,
        live: Arc<AtomicUsize>,
        max_live: AtomicUsize,
    }

    struct MockTransport {
        /// Number of upcoming opens to refuse; `usize::MAX` refuses forever.
        refuse: AtomicUsize,
        counters: Arc<Counters>,
        peers: mpsc::UnboundedSender<MockPeer>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn open(&self, _endpoint: &Endpoint, credential: &str) -> NoticeResult<Box<dyn Socket>> {
            assert_eq!(credential, "secret");
            self.counters.opens.fetch_add(1, Ordering::SeqCst);

            let refuse = self.refuse.load(Ordering::SeqCst);
            if refuse > 0 {
                if refuse != usize::MAX {
                    self.refuse.fetch_sub(1, Ordering::SeqCst);
                }
                return Err(NoticeError::Socket("connection refused".into()));
            }

            let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters.max_live.fetch_max(live, Ordering::SeqCst);

            let (to_client, inbound) = mpsc::unbounded_channel();
            let (outbound, from_client) = mpsc::unbounded_channel();
            let closed = Arc::new(AtomicBool::new(false));
            let _ = self.peers.send(MockPeer {
                to_client: Some(to_client),
                from_client,
                closed: closed.clone(),
            });
            Ok(Box::new(MockSocket {
                inbound,
                outbound,
                closed,
                live: self.counters.live.clone(),
            }))
        }
    }

    struct Harness {
        channel: NoticeChannel,
        transport: Arc<MockTransport>,
        counters: Arc<Counters>,
        peers: mpsc::UnboundedReceiver<MockPeer>,
        status: broadcast::Receiver<ChannelStatus>,
        notices: broadcast::Receiver<NoticeEvent>,
    }

    fn harness(refuse: usize, token: Option<&str>) -> Harness {
        let (peers_tx, peers) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        let transport = Arc::new(MockTransport {
            refuse: AtomicUsize::new(refuse),
            counters: counters.clone(),
            peers: peers_tx,
        });
        let bus = NotificationBus::new(256);
        let status = bus.status().subscribe();
        let notices = bus.notices().subscribe();
        let endpoint = Endpoint::from_origin("http://localhost:5173", "/api/ws/notice", None).unwrap();
        let channel = NoticeChannel::new(
            endpoint,
            transport.clone(),
            Arc::new(StaticCredential::new(token.map(str::to_string))),
            bus,
            ChannelOptions::default(),
        );
        Harness {
            channel,
            transport,
            counters,
            peers,
            status,
            notices,
        }
    }

    async fn wait_for(channel: &NoticeChannel, target: ConnectionState) {
        let mut rx = channel.subscribe_state();
        tokio::time::timeout(Duration::from_secs(3600), rx.wait_for(|s| *s == target))
            .await
            .expect("timed out waiting for state")
            .expect("state channel closed");
    }

    fn scheduled_delays(status: &mut broadcast::Receiver<ChannelStatus>) -> Vec<u64> {
        let mut delays = Vec::new();
        while let Ok(event) = status.try_recv() {
            if let ChannelStatus::ReconnectScheduled { delay, .. } = event {
                delays.push(delay.as_secs());
            }
        }
        delays
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_server_exhausts_budget() {
        let mut h = harness(usize::MAX, Some("secret"));
        assert_eq!(h.channel.start().await, StartOutcome::Started);

        wait_for(&h.channel, ConnectionState::Failed).await;

        // One initial attempt plus ten reconnects.
        assert_eq!(h.counters.opens.load(Ordering::SeqCst), 11);
        let mut events = Vec::new();
        while let Ok(event) = h.status.try_recv() {
            events.push(event);
        }
        let delays: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                ChannelStatus::ReconnectScheduled { delay, .. } => Some(delay.as_secs()),
                _ => None,
            })
            .collect();
        assert_eq!(delays, vec![2, 4, 8, 16, 32, 60, 60, 60, 60, 60]);
        assert!(events.contains(&ChannelStatus::Exhausted { attempts: 10 }));

        // Failed is terminal: nothing else happens on its own.
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(h.counters.opens.load(Ordering::SeqCst), 11);
        assert_eq!(h.channel.state(), ConnectionState::Failed);

        h.channel.stop().await;
        h.channel.stop().await;
        assert_eq!(h.channel.state(), ConnectionState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_open_resets_backoff() {
        let mut h = harness(2, Some("secret"));
        h.channel.start().await;

        let mut peer = h.peers.recv().await.unwrap();
        wait_for(&h.channel, ConnectionState::Open).await;
        assert_eq!(h.counters.opens.load(Ordering::SeqCst), 3);
        assert_eq!(h.channel.retry_state().await.attempt, 0);
        assert_eq!(scheduled_delays(&mut h.status), vec![2, 4]);

        peer.hang_up();
        wait_for(&h.channel, ConnectionState::Closed).await;
        assert!(peer.closed.load(Ordering::SeqCst));
        assert_eq!(h.channel.retry_state().await.attempt, 1);
        // Back to the base delay, not 8s.
        assert_eq!(scheduled_delays(&mut h.status), vec![2]);

        let _peer = h.peers.recv().await.unwrap();
        wait_for(&h.channel, ConnectionState::Open).await;
        h.channel.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_channel_pings_and_dispatches() {
        let mut h = harness(0, Some("secret"));
        h.channel.start().await;
        let mut peer = h.peers.recv().await.unwrap();
        wait_for(&h.channel, ConnectionState::Open).await;
        assert!(h.channel.is_connected());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(peer.from_client.recv().await.unwrap(), "ping");

        peer.push("pong");
        peer.push("{malformed");
        peer.push(r#"{"type":"kickout","data":{}}"#);
        peer.push(r#"{"type":"notice","data":{"id":7,"title":"Release","type":2,"createBy":"ops"}}"#);

        let event = h.notices.recv().await.unwrap();
        assert_eq!(
            event,
            NoticeEvent {
                title: "Release".into(),
                category: NoticeCategory::Announcement,
                publisher: "ops".into(),
            }
        );
        assert!(h.notices.try_recv().is_err());
        assert_eq!(h.channel.state(), ConnectionState::Open);
        h.channel.stop().await;
    }

    /// Frames the client sent since the last drain.
    fn drain_sent(peer: &mut MockPeer) -> Vec<String> {
        let mut sent = Vec::new();
        while let Ok(text) = peer.from_client.try_recv() {
            sent.push(text);
        }
        sent
    }

    async fn heartbeat_running(channel: &NoticeChannel) -> bool {
        channel.shared.inner.lock().await.heartbeat.is_running()
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_stops_when_server_hangs_up() {
        let mut h = harness(0, Some("secret"));
        h.channel.start().await;
        let mut peer = h.peers.recv().await.unwrap();
        wait_for(&h.channel, ConnectionState::Open).await;
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(peer.from_client.recv().await.unwrap(), "ping");

        // Keep the channel out of Open after the drop.
        h.transport.refuse.store(usize::MAX, Ordering::SeqCst);
        peer.hang_up();
        wait_for(&h.channel, ConnectionState::Closed).await;
        assert!(!heartbeat_running(&h.channel).await);

        tokio::time::sleep(Duration::from_secs(95)).await;
        assert!(drain_sent(&mut peer).is_empty());
        assert!(!heartbeat_running(&h.channel).await);
        assert_ne!(h.channel.state(), ConnectionState::Open);
        h.channel.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_stops_on_stop() {
        let mut h = harness(0, Some("secret"));
        h.channel.start().await;
        let mut peer = h.peers.recv().await.unwrap();
        wait_for(&h.channel, ConnectionState::Open).await;
        assert!(heartbeat_running(&h.channel).await);
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(peer.from_client.recv().await.unwrap(), "ping");

        h.channel.stop().await;
        assert!(!heartbeat_running(&h.channel).await);

        tokio::time::sleep(Duration::from_secs(95)).await;
        assert!(drain_sent(&mut peer).is_empty());
        assert_eq!(h.channel.state(), ConnectionState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_guards() {
        let h = harness(0, None);
        assert_eq!(h.channel.start().await, StartOutcome::MissingCredential);
        assert_eq!(h.channel.state(), ConnectionState::Idle);
        assert_eq!(h.counters.opens.load(Ordering::SeqCst), 0);

        let mut h = harness(0, Some("secret"));
        assert_eq!(h.channel.start().await, StartOutcome::Started);
        assert_eq!(h.channel.start().await, StartOutcome::AlreadyActive);
        let _peer = h.peers.recv().await.unwrap();
        wait_for(&h.channel, ConnectionState::Open).await;
        assert_eq!(h.channel.start().await, StartOutcome::AlreadyActive);
        assert_eq!(h.counters.opens.load(Ordering::SeqCst), 1);
        h.channel.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_detaches_and_is_idempotent() {
        let mut h = harness(0, Some("secret"));
        h.channel.start().await;
        let peer = h.peers.recv().await.unwrap();
        wait_for(&h.channel, ConnectionState::Open).await;

        h.channel.stop().await;
        assert_eq!(h.channel.state(), ConnectionState::Closed);
        assert!(peer.closed.load(Ordering::SeqCst));

        // Late traffic from the old socket goes nowhere and nothing reconnects.
        peer.push(r#"{"type":"notice","data":{"title":"late","type":1}}"#);
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert!(h.notices.try_recv().is_err());
        assert_eq!(h.counters.opens.load(Ordering::SeqCst), 1);

        h.channel.stop().await;
        assert_eq!(h.channel.state(), ConnectionState::Closed);

        // A stopped channel can be started again.
        assert_eq!(h.channel.start().await, StartOutcome::Started);
        let _peer = h.peers.recv().await.unwrap();
        wait_for(&h.channel, ConnectionState::Open).await;
        assert_eq!(h.counters.opens.load(Ordering::SeqCst), 2);
        h.channel.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_reconnect() {
        let mut h = harness(usize::MAX, Some("secret"));
        h.channel.start().await;

        loop {
            if let ChannelStatus::ReconnectScheduled { .. } = h.status.recv().await.unwrap() {
                break;
            }
        }
        assert_eq!(h.channel.start().await, StartOutcome::AlreadyActive);

        h.channel.stop().await;
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(h.counters.opens.load(Ordering::SeqCst), 1);
        assert_eq!(h.channel.state(), ConnectionState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_cycles_never_overlap_sockets() {
        let mut h = harness(0, Some("secret"));
        h.channel.start().await;

        for _ in 0..3 {
            let mut peer = h.peers.recv().await.unwrap();
            wait_for(&h.channel, ConnectionState::Open).await;
            peer.hang_up();
            wait_for(&h.channel, ConnectionState::Closed).await;
        }
        let _peer = h.peers.recv().await.unwrap();
        wait_for(&h.channel, ConnectionState::Open).await;

        assert_eq!(h.counters.opens.load(Ordering::SeqCst), 4);
        assert_eq!(h.counters.max_live.load(Ordering::SeqCst), 1);
        h.channel.stop().await;
        assert_eq!(h.counters.live.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_from_failed_gets_fresh_budget() {
        let mut h = harness(usize::MAX, Some("secret"));
        h.channel.start().await;
        wait_for(&h.channel, ConnectionState::Failed).await;
        let mut status = h.channel.bus().status().subscribe();

        assert_eq!(h.channel.start().await, StartOutcome::Started);
        loop {
            if let ChannelStatus::ReconnectScheduled { attempt, delay } = status.recv().await.unwrap() {
                assert_eq!(attempt, 1);
                assert_eq!(delay, Duration::from_secs(2));
                break;
            }
        }
        h.channel.stop().await;
    }
}
