//! The connection manager.
//!
//! Owns exactly one logical connection per instance, broadcasts state
//! snapshots to arbitrarily many observers, and rides out transport churn:
//! the run loop dials, pumps frames, and on any link failure schedules an
//! automatic retry with a policy delay. Retries are unbounded; only an
//! explicit [`ConnectionManager::disconnect`] stops them.
//!
//! All failures surface through state snapshots and the event registry —
//! nothing on this public API returns a transport `Err` or panics.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use medialink_core::backoff::{EXPLICIT_RECONNECT_DELAY_MS, ReconnectPolicy};
use medialink_core::messages::{self, Envelope, PushMessage};
use medialink_core::state::{ConnectionQuality, ConnectionState};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::machine::{self, LinkEvent};
use crate::observers::{ObserverId, StateObservers};
use crate::registry::{EventRegistry, SubscriptionHandle};
use crate::transport::Transport;

/// Frames queued for send while the write side is busy.
const OUTBOX_CAPACITY: usize = 64;

/// Default probe reply deadline in milliseconds.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 5_000;

/// Post-handshake authentication credentials.
#[derive(Clone, Debug)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Account password.
    pub password: String,
}

/// Connection manager tuning.
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    /// Delay policy for automatic reconnection.
    pub policy: ReconnectPolicy,
    /// Credentials sent right after the handshake, when present.
    pub credentials: Option<Credentials>,
    /// How long a quality probe waits for its reply.
    pub probe_timeout_ms: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            policy: ReconnectPolicy::default(),
            credentials: None,
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
        }
    }
}

/// Maintains one resilient push-style link to the backend.
pub struct ConnectionManager {
    config: ManagerConfig,
    transport: Arc<dyn Transport>,
    state: Mutex<ConnectionState>,
    observers: StateObservers,
    registry: EventRegistry,
    outbox: Mutex<Option<mpsc::Sender<String>>>,
    probes: Mutex<HashMap<String, oneshot::Sender<()>>>,
    cancel: Mutex<Option<CancellationToken>>,
    run_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Create a manager over the given transport. No connection is made
    /// until [`connect`](Self::connect) is called.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, config: ManagerConfig) -> Self {
        Self {
            config,
            transport,
            state: Mutex::new(ConnectionState::initial()),
            observers: StateObservers::new(),
            registry: EventRegistry::new(),
            outbox: Mutex::new(None),
            probes: Mutex::new(HashMap::new()),
            cancel: Mutex::new(None),
            run_task: Mutex::new(None),
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Start the connection run loop.
    ///
    /// Idempotent: when already connected or connecting this returns without
    /// creating a second link.
    pub fn connect(self: &Arc<Self>) {
        let mut cancel = self.cancel.lock();
        let mut run_task = self.run_task.lock();
        let active = cancel.is_some() && run_task.as_ref().is_some_and(|t| !t.is_finished());
        if active {
            debug!("connect requested while already active, ignoring");
            return;
        }

        let token = CancellationToken::new();
        *cancel = Some(token.clone());
        let manager = Arc::clone(self);
        *run_task = Some(tokio::spawn(run_loop(manager, token)));
    }

    /// Tear down the link and stop retrying.
    ///
    /// Never fails; disconnecting an already-disconnected manager is a no-op.
    pub fn disconnect(&self) {
        if let Some(token) = self.cancel.lock().take() {
            token.cancel();
        }
        let _ = self.run_task.lock().take();
        *self.outbox.lock() = None;
        self.update_state(&LinkEvent::DisconnectRequested);
    }

    /// Explicit disconnect-then-reconnect, with a short fixed delay so a
    /// backend that just dropped the link is not immediately hammered.
    pub async fn reconnect(self: &Arc<Self>) {
        self.disconnect();
        tokio::time::sleep(Duration::from_millis(EXPLICIT_RECONNECT_DELAY_MS)).await;
        self.connect();
    }

    // ── State access ────────────────────────────────────────────────────────

    /// Current snapshot.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.lock().clone()
    }

    /// Whether the handshake has completed and the link is live.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Latest probe-derived quality bucket.
    #[must_use]
    pub fn connection_quality(&self) -> ConnectionQuality {
        self.state.lock().quality
    }

    /// Latest measured round trip in milliseconds.
    #[must_use]
    pub fn latency(&self) -> Option<u64> {
        self.state.lock().latency_ms
    }

    /// Register an observer for every subsequent state snapshot. Registering
    /// the same observer twice yields two independent deliveries.
    pub fn on_state_change(
        &self,
        observer: impl Fn(&ConnectionState) + Send + Sync + 'static,
    ) -> ObserverId {
        self.observers.add(observer)
    }

    /// Remove exactly the observer registered under `id`.
    pub fn remove_state_observer(&self, id: ObserverId) {
        self.observers.remove(id);
    }

    // ── Messaging ───────────────────────────────────────────────────────────

    /// Fire-and-forget send. A no-op while disconnected; callers that need
    /// guaranteed delivery must check [`is_connected`](Self::is_connected)
    /// first.
    pub fn emit(&self, event: &str, data: Option<Value>) {
        self.emit_envelope(Envelope::new(event, data));
    }

    /// Fire-and-forget send of a prebuilt envelope.
    pub fn emit_envelope(&self, envelope: Envelope) {
        let sender = self.outbox.lock().clone();
        let Some(sender) = sender else {
            debug!(event = %envelope.event, "emit while disconnected, dropping");
            return;
        };
        if let Err(e) = sender.try_send(envelope.to_frame()) {
            debug!(event = %envelope.event, "emit dropped: {e}");
        }
    }

    /// Register a handler for a named inbound event.
    pub fn on(
        &self,
        event: &str,
        handler: impl Fn(&PushMessage) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        self.registry.on(event, handler)
    }

    /// Remove exactly the handler registered under `handle` for `event`.
    pub fn off(&self, event: &str, handle: SubscriptionHandle) {
        self.registry.off(event, handle);
    }

    // ── Quality probe ───────────────────────────────────────────────────────

    /// Round-trip probe returning a coarse quality bucket.
    ///
    /// Runs on its own; state delivery to other observers is never blocked
    /// by an in-flight probe. While disconnected the probe is skipped and
    /// the bucket is [`ConnectionQuality::Unknown`]. A timed-out probe
    /// degrades quality to [`ConnectionQuality::Poor`].
    pub async fn check_connection_quality(&self) -> ConnectionQuality {
        if !self.is_connected() {
            return ConnectionQuality::Unknown;
        }

        let nonce = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        let _ = self.probes.lock().insert(nonce.clone(), tx);

        let started = Instant::now();
        self.emit_envelope(messages::probe(&nonce));

        let deadline = Duration::from_millis(self.config.probe_timeout_ms);
        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(())) => {
                let rtt_ms = started.elapsed().as_millis() as u64;
                self.update_state(&LinkEvent::ProbeMeasured { rtt_ms });
                self.connection_quality()
            }
            _ => {
                let _ = self.probes.lock().remove(&nonce);
                self.update_state(&LinkEvent::ProbeTimedOut);
                ConnectionQuality::Poor
            }
        }
    }

    // ── Internals ───────────────────────────────────────────────────────────

    fn update_state(&self, event: &LinkEvent) {
        let next = {
            let mut state = self.state.lock();
            let next = machine::apply(&state, event);
            *state = next.clone();
            next
        };
        self.observers.notify(&next);
    }

    /// Decode one inbound frame and route it. Malformed frames are dropped
    /// here, at the boundary, so no consumer ever sees raw JSON.
    fn handle_frame(&self, frame: &str) {
        let Some(envelope) = Envelope::parse(frame) else {
            warn!("dropping non-envelope frame");
            return;
        };
        let Some(message) = PushMessage::decode(&envelope) else {
            debug!(event = %envelope.event, "dropping unknown or malformed message");
            return;
        };

        if let PushMessage::ConnectionStatus(status) = &message {
            if let Some(nonce) = &status.nonce {
                if let Some(reply) = self.probes.lock().remove(nonce) {
                    let _ = reply.send(());
                }
            }
        }

        self.registry.dispatch(message.event(), &message);
    }

    /// Clear the outbox only if it still belongs to this session.
    fn clear_outbox_if(&self, sender: &mpsc::Sender<String>) {
        let mut outbox = self.outbox.lock();
        if outbox.as_ref().is_some_and(|tx| tx.same_channel(sender)) {
            *outbox = None;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Run loop
// ─────────────────────────────────────────────────────────────────────────────

async fn run_loop(manager: Arc<ConnectionManager>, cancel: CancellationToken) {
    let mut attempt: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return;
        }
        manager.update_state(&LinkEvent::Dialing { attempt });

        let connected = tokio::select! {
            result = manager.transport.connect() => result,
            () = cancel.cancelled() => return,
        };

        match connected {
            Ok(mut session) => {
                let (tx, mut rx) = mpsc::channel::<String>(OUTBOX_CAPACITY);
                *manager.outbox.lock() = Some(tx.clone());
                manager.update_state(&LinkEvent::HandshakeOk);
                attempt = 0;

                if let Some(credentials) = &manager.config.credentials {
                    let frame =
                        messages::login(&credentials.username, &credentials.password).to_frame();
                    if let Err(e) = session.send(frame).await {
                        warn!("authentication send failed: {e}");
                    }
                }

                loop {
                    tokio::select! {
                        inbound = session.recv() => match inbound {
                            Some(Ok(frame)) => manager.handle_frame(&frame),
                            Some(Err(e)) => {
                                manager.update_state(&LinkEvent::LinkFailed {
                                    error: e.to_string(),
                                });
                                break;
                            }
                            None => {
                                manager.update_state(&LinkEvent::LinkClosed);
                                break;
                            }
                        },
                        outgoing = rx.recv() => match outgoing {
                            Some(frame) => {
                                if let Err(e) = session.send(frame).await {
                                    manager.update_state(&LinkEvent::LinkFailed {
                                        error: e.to_string(),
                                    });
                                    break;
                                }
                            }
                            // Sender dropped by an explicit disconnect; the
                            // cancel branch owns the state transition.
                            None => {
                                session.close().await;
                                return;
                            }
                        },
                        () = cancel.cancelled() => {
                            session.close().await;
                            manager.clear_outbox_if(&tx);
                            manager.update_state(&LinkEvent::DisconnectRequested);
                            return;
                        }
                    }
                }
                manager.clear_outbox_if(&tx);
            }
            Err(e) => {
                manager.update_state(&LinkEvent::LinkFailed {
                    error: e.to_string(),
                });
            }
        }

        // Automatic retry, unbounded. Only an explicit disconnect stops it.
        let delay = manager.config.policy.delay_ms(attempt);
        attempt += 1;
        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(delay)) => {}
            () = cancel.cancelled() => return,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use medialink_core::errors::TransportError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::transport::TransportSession;

    struct FakeSession {
        incoming: mpsc::UnboundedReceiver<String>,
        sent: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl TransportSession for FakeSession {
        async fn send(&mut self, frame: String) -> Result<(), TransportError> {
            self.sent.send(frame).map_err(|e| TransportError::Send {
                message: e.to_string(),
            })
        }

        async fn recv(&mut self) -> Option<Result<String, TransportError>> {
            self.incoming.recv().await.map(Ok)
        }

        async fn close(&mut self) {
            self.incoming.close();
        }
    }

    enum Dial {
        Refused,
        Session(FakeSession),
    }

    /// Transport that plays back a script of dial outcomes, then parks.
    struct FakeTransport {
        script: Mutex<VecDeque<Dial>>,
        dials: AtomicUsize,
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn connect(&self) -> Result<Box<dyn TransportSession>, TransportError> {
            let _ = self.dials.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().pop_front();
            match next {
                Some(Dial::Session(session)) => Ok(Box::new(session)),
                Some(Dial::Refused) => Err(TransportError::Handshake {
                    message: "connection refused".into(),
                }),
                None => std::future::pending().await,
            }
        }
    }

    /// Handles the test keeps for one scripted session.
    struct SessionHandles {
        incoming: mpsc::UnboundedSender<String>,
        sent: mpsc::UnboundedReceiver<String>,
    }

    fn scripted(outcomes: Vec<Option<()>>) -> (Arc<FakeTransport>, Vec<SessionHandles>) {
        let mut script = VecDeque::new();
        let mut handles = Vec::new();
        for outcome in outcomes {
            match outcome {
                None => script.push_back(Dial::Refused),
                Some(()) => {
                    let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
                    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
                    script.push_back(Dial::Session(FakeSession {
                        incoming: incoming_rx,
                        sent: sent_tx,
                    }));
                    handles.push(SessionHandles {
                        incoming: incoming_tx,
                        sent: sent_rx,
                    });
                }
            }
        }
        (
            Arc::new(FakeTransport {
                script: Mutex::new(script),
                dials: AtomicUsize::new(0),
            }),
            handles,
        )
    }

    fn fast_config() -> ManagerConfig {
        ManagerConfig {
            policy: ReconnectPolicy {
                base_delay_ms: 10,
                max_delay_ms: 40,
            },
            credentials: None,
            probe_timeout_ms: 200,
        }
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        for _ in 0..1_000 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test(start_paused = true)]
    async fn connect_transitions_to_connected() {
        let (transport, _handles) = scripted(vec![Some(())]);
        let manager = Arc::new(ConnectionManager::new(transport, fast_config()));
        assert_eq!(manager.state(), ConnectionState::initial());

        manager.connect();
        wait_for(|| manager.is_connected()).await;

        let state = manager.state();
        assert!(state.connected);
        assert!(!state.connecting);
        assert_eq!(state.reconnect_attempt, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_is_idempotent() {
        let (transport, _handles) = scripted(vec![Some(())]);
        let manager = Arc::new(ConnectionManager::new(transport.clone(), fast_config()));

        manager.connect();
        wait_for(|| manager.is_connected()).await;
        manager.connect();
        manager.connect();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(transport.dials.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn handshake_failure_retries_with_incremented_attempt() {
        let (transport, _handles) = scripted(vec![None, Some(())]);
        let manager = Arc::new(ConnectionManager::new(transport, fast_config()));

        let attempts = Arc::new(Mutex::new(Vec::new()));
        let attempts2 = attempts.clone();
        let _ = manager.on_state_change(move |state| {
            if state.connecting {
                attempts2.lock().push(state.reconnect_attempt);
            }
        });

        manager.connect();
        wait_for(|| manager.is_connected()).await;

        let seen = attempts.lock().clone();
        assert!(seen.contains(&0));
        assert!(seen.contains(&1));
        assert_eq!(manager.state().reconnect_attempt, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_link_reconnects_and_increments_attempt() {
        let (transport, handles) = scripted(vec![Some(()), Some(())]);
        let manager = Arc::new(ConnectionManager::new(transport, fast_config()));

        let retry_attempts = Arc::new(Mutex::new(Vec::new()));
        let retry_attempts2 = retry_attempts.clone();
        let _ = manager.on_state_change(move |state| {
            if state.connecting && !state.connected {
                retry_attempts2.lock().push(state.reconnect_attempt);
            }
        });

        manager.connect();
        wait_for(|| manager.is_connected()).await;

        // Drop the first session's incoming side: clean close. The second
        // session's handles must stay alive or it would close immediately.
        let mut sessions = handles.into_iter();
        let first = sessions.next().unwrap();
        let _second = sessions.next().unwrap();
        drop(first);
        wait_for(|| !manager.is_connected()).await;
        wait_for(|| manager.is_connected()).await;

        assert!(retry_attempts.lock().contains(&1));
        assert_eq!(manager.state().reconnect_attempt, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn emit_while_disconnected_is_silent_noop() {
        let (transport, _handles) = scripted(vec![]);
        let manager = Arc::new(ConnectionManager::new(transport, fast_config()));
        manager.emit("request:refresh", Some(serde_json::json!({"id": "r1"})));
        assert!(!manager.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn emit_while_connected_writes_frame() {
        let (transport, mut handles) = scripted(vec![Some(())]);
        let manager = Arc::new(ConnectionManager::new(transport, fast_config()));
        manager.connect();
        wait_for(|| manager.is_connected()).await;

        manager.emit("request:refresh", Some(serde_json::json!({"id": "r1"})));

        let mut session = handles.remove(0);
        let frame = loop {
            match session.sent.recv().await {
                Some(frame) => break frame,
                None => panic!("session closed before frame arrived"),
            }
        };
        let envelope = Envelope::parse(&frame).unwrap();
        assert_eq!(envelope.event, "request:refresh");
        assert_eq!(envelope.data.unwrap()["id"], "r1");
    }

    #[tokio::test(start_paused = true)]
    async fn inbound_frame_dispatches_to_handler() {
        let (transport, handles) = scripted(vec![Some(())]);
        let manager = Arc::new(ConnectionManager::new(transport, fast_config()));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        let _ = manager.on("service:status", move |message| {
            if let PushMessage::ServiceStatus(update) = message {
                seen2.lock().push(update.id.clone());
            }
        });

        manager.connect();
        wait_for(|| manager.is_connected()).await;

        let frame = Envelope::new(
            "service:status",
            Some(serde_json::json!({"id": "svc_1", "status": "up"})),
        )
        .to_frame();
        handles[0].incoming.send(frame).unwrap();

        wait_for(|| !seen.lock().is_empty()).await;
        assert_eq!(seen.lock().clone(), vec!["svc_1".to_owned()]);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frames_are_dropped_quietly() {
        let (transport, handles) = scripted(vec![Some(())]);
        let manager = Arc::new(ConnectionManager::new(transport, fast_config()));

        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let _ = manager.on("service:status", move |_| {
            let _ = c.fetch_add(1, Ordering::SeqCst);
        });

        manager.connect();
        wait_for(|| manager.is_connected()).await;

        handles[0].incoming.send("not json at all".into()).unwrap();
        handles[0]
            .incoming
            .send(r#"{"type": "torrent:status", "data": {"id": "x"}}"#.into())
            .unwrap();
        handles[0]
            .incoming
            .send(r#"{"type": "service:status", "data": "up"}"#.into())
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(manager.is_connected(), "bad frames must not drop the link");
    }

    #[tokio::test(start_paused = true)]
    async fn quality_probe_round_trip() {
        let (transport, mut handles) = scripted(vec![Some(())]);
        let manager = Arc::new(ConnectionManager::new(transport, fast_config()));
        manager.connect();
        wait_for(|| manager.is_connected()).await;

        let mut session = handles.remove(0);
        let incoming = session.incoming.clone();
        let responder = tokio::spawn(async move {
            let frame = session.sent.recv().await.unwrap();
            let envelope = Envelope::parse(&frame).unwrap();
            assert_eq!(envelope.event, "connection:status");
            let nonce = envelope.data.unwrap()["nonce"].as_str().unwrap().to_owned();
            let reply = Envelope::new(
                "connection:status",
                Some(serde_json::json!({"connected": true, "nonce": nonce})),
            )
            .to_frame();
            incoming.send(reply).unwrap();
        });

        let quality = manager.check_connection_quality().await;
        responder.await.unwrap();

        assert_ne!(quality, ConnectionQuality::Unknown);
        assert_eq!(manager.connection_quality(), quality);
        assert!(manager.latency().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn quality_probe_timeout_degrades_to_poor() {
        let (transport, _handles) = scripted(vec![Some(())]);
        let manager = Arc::new(ConnectionManager::new(transport, fast_config()));
        manager.connect();
        wait_for(|| manager.is_connected()).await;

        let quality = manager.check_connection_quality().await;
        assert_eq!(quality, ConnectionQuality::Poor);
        assert!(manager.state().last_error.is_some());
        assert!(manager.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn quality_probe_while_disconnected_is_unknown() {
        let (transport, _handles) = scripted(vec![]);
        let manager = Arc::new(ConnectionManager::new(transport, fast_config()));
        let quality = manager.check_connection_quality().await;
        assert_eq!(quality, ConnectionQuality::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_is_idempotent_and_stops_retries() {
        let (transport, _handles) = scripted(vec![Some(())]);
        let manager = Arc::new(ConnectionManager::new(transport.clone(), fast_config()));
        manager.connect();
        wait_for(|| manager.is_connected()).await;

        manager.disconnect();
        manager.disconnect();

        let state = manager.state();
        assert!(!state.connected);
        assert!(!state.connecting);

        // No further dials after disconnect.
        let dials = transport.dials.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(transport.dials.load(Ordering::SeqCst), dials);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_cycles_the_link() {
        let (transport, _handles) = scripted(vec![Some(()), Some(())]);
        let manager = Arc::new(ConnectionManager::new(transport.clone(), fast_config()));
        manager.connect();
        wait_for(|| manager.is_connected()).await;

        manager.reconnect().await;
        wait_for(|| manager.is_connected()).await;

        assert_eq!(transport.dials.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn login_is_sent_after_handshake() {
        let (transport, mut handles) = scripted(vec![Some(())]);
        let config = ManagerConfig {
            credentials: Some(Credentials {
                username: "admin".into(),
                password: "hunter2".into(),
            }),
            ..fast_config()
        };
        let manager = Arc::new(ConnectionManager::new(transport, config));
        manager.connect();
        wait_for(|| manager.is_connected()).await;

        let frame = handles[0].sent.recv().await.unwrap();
        let envelope = Envelope::parse(&frame).unwrap();
        assert_eq!(envelope.event, "login");
        assert_eq!(envelope.data.unwrap()["username"], "admin");
    }

    #[tokio::test(start_paused = true)]
    async fn removed_observer_is_not_notified() {
        let (transport, _handles) = scripted(vec![Some(())]);
        let manager = Arc::new(ConnectionManager::new(transport, fast_config()));

        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let id = manager.on_state_change(move |_| {
            let _ = c.fetch_add(1, Ordering::SeqCst);
        });
        manager.remove_state_observer(id);

        manager.connect();
        wait_for(|| manager.is_connected()).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
