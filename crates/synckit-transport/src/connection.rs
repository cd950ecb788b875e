//! Client-side transport connection (`spec.md` §4.5, §5): owns the
//! websocket, the negotiated wire mode, the reconnect backoff, the
//! heartbeat monitor, and the offline queue for one logical connection to
//! one sync server.
//!
//! Grounded on `beagle-websocket/src/connection.rs`'s
//! `Arc<RwLock<ConnectionState>>` + `mpsc` channel-pair shape and on
//! `beagle-websocket/src/handler.rs`'s sender/receiver task-pair pattern,
//! adapted from a server accepting upgrades to a client dialing out via
//! `tokio_tungstenite::connect_async`. The two spawned tasks are the only
//! suspension points here (`spec.md` §5) — everything else in this module
//! is synchronous state tracking.

use std::sync::Arc;
use std::time::Instant;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use synckit_core::config::{HeartbeatConfig, QueueConfig, ReconnectConfig};
use synckit_core::SyncKitError;

use crate::backoff::ReconnectBackoff;
use crate::frame::Frame;
use crate::heartbeat::HeartbeatMonitor;
use crate::negotiation::Negotiation;
use crate::queue::OfflineQueue;

/// Connection lifecycle states named in `spec.md` §4.5 ("Failed", the
/// terminal state after exhausting reconnect attempts) and §4.4 via the
/// coordinator's own transport-facing vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Reconnecting,
    Failed,
    Closed,
}

const OUTBOUND_CHANNEL_CAPACITY: usize = 1000;
const INBOUND_CHANNEL_CAPACITY: usize = 1000;

/// One logical connection to a sync server. Cloning shares the same
/// underlying channels and state (cheap `Arc` handles), matching the
/// teacher's `Arc<WebSocketConnection>` sharing pattern.
pub struct Connection {
    pub id: Uuid,
    state: Arc<RwLock<ConnectionState>>,
    created_at: Instant,
    last_activity: Arc<RwLock<Instant>>,
    outbound_tx: mpsc::Sender<WsMessage>,
    inbound_rx: Arc<Mutex<mpsc::Receiver<Frame>>>,
    negotiation: Arc<Mutex<Negotiation>>,
    backoff: Arc<Mutex<ReconnectBackoff>>,
    heartbeat: Arc<Mutex<HeartbeatMonitor>>,
    queue: Arc<Mutex<OfflineQueue>>,
}

impl Connection {
    /// Dial `url`, negotiate the wire mode on the first inbound message,
    /// and spawn the reader/writer task pair that carry frames across the
    /// socket for the lifetime of the connection.
    #[instrument(skip(reconnect, heartbeat, queue))]
    pub async fn connect(
        url: &str,
        reconnect: ReconnectConfig,
        heartbeat: HeartbeatConfig,
        queue: QueueConfig,
    ) -> Result<Self, SyncKitError> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| SyncKitError::ConnectionFailed(e.to_string()))?;
        let (mut sink, mut stream) = ws_stream.split();

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<WsMessage>(OUTBOUND_CHANNEL_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel::<Frame>(INBOUND_CHANNEL_CAPACITY);

        let negotiation = Arc::new(Mutex::new(Negotiation::new()));
        let negotiation_for_reader = negotiation.clone();

        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(e) = sink.send(message).await {
                    warn!("outbound send failed, closing writer task: {e}");
                    break;
                }
            }
        });

        tokio::spawn(async move {
            while let Some(Ok(message)) = stream.next().await {
                let decoded = {
                    let mut negotiation = negotiation_for_reader.lock().await;
                    negotiation.decode(&message)
                };
                match decoded {
                    Ok(frame) => {
                        if inbound_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("dropping unparseable inbound message: {e}");
                    }
                }
            }
            debug!("reader task exiting, connection closed by peer");
        });

        info!("connected to {url}");

        Ok(Self {
            id: Uuid::new_v4(),
            state: Arc::new(RwLock::new(ConnectionState::Connected)),
            created_at: Instant::now(),
            last_activity: Arc::new(RwLock::new(Instant::now())),
            outbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            negotiation,
            backoff: Arc::new(Mutex::new(ReconnectBackoff::new(reconnect))),
            heartbeat: Arc::new(Mutex::new(HeartbeatMonitor::new(heartbeat, Instant::now()))),
            queue: Arc::new(Mutex::new(OfflineQueue::new(queue))),
        })
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    async fn set_state(&self, state: ConnectionState) {
        *self.state.write().await = state;
    }

    /// Send a frame. While connected, writes straight to the socket; while
    /// disconnected or reconnecting, queues it for replay on reconnect
    /// (`spec.md` §4.5's offline queue).
    pub async fn send(&self, frame: Frame) -> Result<(), SyncKitError> {
        if self.state().await == ConnectionState::Connected {
            let negotiation = self.negotiation.lock().await;
            let message = negotiation.encode(&frame)?;
            drop(negotiation);
            self.outbound_tx
                .send(message)
                .await
                .map_err(|_| SyncKitError::ConnectionLost("outbound channel closed".into()))?;
            *self.last_activity.write().await = Instant::now();
            Ok(())
        } else {
            let payload = frame.encode_binary()?;
            self.queue.lock().await.enqueue(frame.ts, payload)
        }
    }

    /// Receive the next inbound frame, if any is buffered, without
    /// blocking.
    pub async fn try_recv(&self) -> Option<Frame> {
        self.inbound_rx.lock().await.try_recv().ok()
    }

    /// Receive the next inbound frame, waiting for one to arrive.
    pub async fn recv(&self) -> Option<Frame> {
        self.inbound_rx.lock().await.recv().await
    }

    /// Replay every queued item in FIFO order once a connection is
    /// (re)established, preserving each item's original `ts` (`spec.md`
    /// §4.5).
    pub async fn flush_queue(&self) -> Result<(), SyncKitError> {
        loop {
            let item = {
                let queue = self.queue.lock().await;
                queue.pending().next().cloned()
            };
            let Some(item) = item else { break };
            let frame = Frame::decode_binary(&item.payload)?;
            match self.send(frame).await {
                Ok(()) => {
                    self.queue.lock().await.ack_oldest();
                }
                Err(_) => {
                    self.queue.lock().await.retry_oldest();
                    break;
                }
            }
        }
        Ok(())
    }

    /// Whether a PING is due right now; callers drive the heartbeat loop
    /// by polling this alongside `recv`.
    pub async fn heartbeat_ping_due(&self) -> bool {
        self.heartbeat.lock().await.ping_due(Instant::now())
    }

    pub async fn record_ping_sent(&self) {
        self.heartbeat.lock().await.record_ping_sent(Instant::now());
    }

    pub async fn record_pong_received(&self) {
        self.heartbeat.lock().await.record_pong_received(Instant::now());
        *self.last_activity.write().await = Instant::now();
    }

    /// True once the in-flight PING has outlived `heartbeatTimeout`
    /// without a PONG — the caller should treat the connection as dead
    /// and move to `Reconnecting` (`spec.md` §4.5).
    pub async fn heartbeat_expired(&self) -> bool {
        self.heartbeat.lock().await.is_expired(Instant::now())
    }

    /// Mark the connection lost and compute the next reconnect delay.
    /// Returns `ConnectionFailed` once `maxAttempts` is exhausted, at
    /// which point the caller transitions to `Failed` and waits for an
    /// explicit reconnect request.
    pub async fn mark_disconnected(&self) -> Result<std::time::Duration, SyncKitError> {
        self.set_state(ConnectionState::Reconnecting).await;
        let mut backoff = self.backoff.lock().await;
        match backoff.next_delay() {
            Ok(delay) => Ok(delay),
            Err(e) => {
                drop(backoff);
                self.set_state(ConnectionState::Failed).await;
                Err(e)
            }
        }
    }

    pub async fn mark_reconnected(&self) {
        self.backoff.lock().await.reset();
        self.set_state(ConnectionState::Connected).await;
    }

    pub async fn close(&self) {
        self.set_state(ConnectionState::Closed).await;
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }
}
