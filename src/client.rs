//! Async client for the BrawlNet match protocol.
//!
//! [`BrawlNetClient`] owns the connection lifecycle: it dials (or adopts) a
//! [`Transport`], drives a background transport loop, runs the authentication
//! handshake, and maintains the room view, latency metrics, and error history
//! as server messages arrive. Events are emitted on a bounded channel
//! ([`tokio::sync::mpsc::Receiver<BrawlNetEvent>`]) returned from
//! [`BrawlNetClient::new`].
//!
//! # Example
//!
//! ```rust,ignore
//! let (mut client, mut events) = BrawlNetClient::new(BrawlNetConfig::new());
//!
//! client.connect("wss://play.brawlnet.dev/ws").await?;
//! let user_id = client.authenticate(token).await?;
//! client.join_queue()?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         BrawlNetEvent::MatchFound { room_id } => client.join_room(room_id)?,
//!         BrawlNetEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::error::{BrawlNetError, Result};
use crate::event::BrawlNetEvent;
use crate::metrics::{ConnectionMetrics, ErrorKind, ErrorRecord, ErrorTracker, LatencyTracker};
use crate::protocol::{
    CharacterType, ClientMessage, MatchResultMessage, PlayerInputMessage, PlayerPositionMessage,
    RoomData, RoomId, ServerMessage, StageType, UserId,
};
use crate::room::RoomView;
use crate::transport::Transport;

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Contractual ceiling on a `connect` attempt.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Contractual ceiling on the authentication handshake.
const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default cadence of the latency probe.
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(2);

/// Default cap on reconnect attempts before `can_reconnect` turns false.
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Default transport-level dial attempts per `connect` call.
const DEFAULT_TRANSPORT_RETRY_ATTEMPTS: u32 = 3;

/// Default fixed delay between transport-level dial attempts.
const DEFAULT_TRANSPORT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Lock a std mutex, recovering the guard if a panicking test poisoned it.
fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Connection state ────────────────────────────────────────────────

/// Lifecycle state of the connection. Exactly one value at a time, mutated
/// only by the client's transition paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No channel open.
    #[default]
    Disconnected,
    /// A `connect` attempt is in flight.
    Connecting,
    /// Channel open, not yet authenticated.
    Connected,
    /// Channel open and the handshake has succeeded.
    Authenticated,
    /// The last connect attempt failed. Not terminal: a fresh `connect`
    /// re-enters `Connecting`.
    Error,
}

impl ConnectionState {
    /// `true` while a channel is open (`Connected` or `Authenticated`).
    pub fn is_open(self) -> bool {
        matches!(self, Self::Connected | Self::Authenticated)
    }
}

/// Authenticated identity bound to the current channel.
///
/// Derived state: the session only counts as authenticated while the
/// connection state is [`ConnectionState::Authenticated`] (see
/// `BrawlNetClient::is_authenticated`). Cleared atomically on disconnect.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Opaque bearer token used for the current handshake.
    pub auth_token: Option<String>,
    /// User id confirmed by the server.
    pub user_id: Option<UserId>,
}

impl Session {
    /// Both identity fields are present.
    pub fn is_set(&self) -> bool {
        self.auth_token.is_some() && self.user_id.is_some()
    }

    fn clear(&mut self) {
        self.auth_token = None;
        self.user_id = None;
    }
}

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`BrawlNetClient`].
///
/// All fields have defaults; construct with [`BrawlNetConfig::new`] and adjust
/// with the builder methods.
///
/// # Example
///
/// ```
/// use brawlnet_client::client::BrawlNetConfig;
/// use std::time::Duration;
///
/// let config = BrawlNetConfig::new()
///     .with_event_channel_capacity(512)
///     .with_ping_interval(Duration::from_secs(5));
/// assert_eq!(config.event_channel_capacity, 512);
/// ```
#[derive(Debug, Clone)]
pub struct BrawlNetConfig {
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer cannot keep up with incoming server messages, events
    /// are dropped (with a warning logged) to avoid blocking the transport
    /// loop. The `Disconnected` event is always delivered regardless of
    /// capacity.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Timeout for the graceful shutdown.
    ///
    /// When [`BrawlNetClient::shutdown`] is called, the background transport
    /// loop is given this much time to close the transport and emit a final
    /// `Disconnected` event. If the timeout expires the task is aborted.
    pub shutdown_timeout: Duration,
    /// Ceiling on a whole `connect` call, including transport-level retries.
    /// Defaults to **20 seconds**.
    pub connect_timeout: Duration,
    /// Ceiling on the authentication handshake. Defaults to **10 seconds**.
    pub auth_timeout: Duration,
    /// Cadence of the protocol-level latency probe.
    pub ping_interval: Duration,
    /// Cap consulted by [`BrawlNetClient::can_reconnect`]. Defaults to **5**.
    pub max_reconnect_attempts: u32,
    /// Transport-level dial attempts per `connect` call. Defaults to **3**.
    pub transport_retry_attempts: u32,
    /// Fixed delay between transport-level dial attempts.
    pub transport_retry_delay: Duration,
}

impl Default for BrawlNetConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            ping_interval: DEFAULT_PING_INTERVAL,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            transport_retry_attempts: DEFAULT_TRANSPORT_RETRY_ATTEMPTS,
            transport_retry_delay: DEFAULT_TRANSPORT_RETRY_DELAY,
        }
    }
}

impl BrawlNetConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the capacity of the bounded event channel.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the timeout for the graceful shutdown.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the ceiling on a `connect` call.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the ceiling on the authentication handshake.
    #[must_use]
    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    /// Set the cadence of the latency probe.
    #[must_use]
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Set the reconnect-attempt cap consulted by `can_reconnect`.
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, max: u32) -> Self {
        self.max_reconnect_attempts = max;
        self
    }

    /// Set the transport-level retry schedule for `connect`.
    #[must_use]
    pub fn with_transport_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.transport_retry_attempts = attempts;
        self.transport_retry_delay = delay;
        self
    }
}

// ── CreateRoomParams ────────────────────────────────────────────────

/// Parameters for creating a room.
///
/// All fields are optional; the server applies its defaults for absent ones.
///
/// # Example
///
/// ```
/// use brawlnet_client::client::CreateRoomParams;
/// use brawlnet_client::protocol::StageType;
///
/// let params = CreateRoomParams::new()
///     .with_max_players(2)
///     .with_stage(StageType::Foundry)
///     .private(true);
/// assert_eq!(params.max_players, Some(2));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CreateRoomParams {
    /// Maximum number of players allowed in the room.
    pub max_players: Option<u8>,
    /// Preselected stage.
    pub stage: Option<StageType>,
    /// Whether the room is hidden from matchmaking.
    pub private: Option<bool>,
}

impl CreateRoomParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of players.
    #[must_use]
    pub fn with_max_players(mut self, max_players: u8) -> Self {
        self.max_players = Some(max_players);
        self
    }

    /// Preselect a stage.
    #[must_use]
    pub fn with_stage(mut self, stage: StageType) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Hide the room from matchmaking.
    #[must_use]
    pub fn private(mut self, private: bool) -> Self {
        self.private = Some(private);
        self
    }
}

// ── Shared state ────────────────────────────────────────────────────

/// Pending authentication handshake: the token being presented and the
/// one-shot reply channel the caller is awaiting.
struct PendingAuth {
    token: String,
    reply: oneshot::Sender<Result<UserId>>,
}

/// State shared between the client handle and the transport loop.
///
/// Single-writer discipline: the transport loop mutates `session`, `room`,
/// `latency`, and `errors`; the handle mutates them only on the disconnect
/// paths, after the loop has been stopped.
struct Shared {
    state: watch::Sender<ConnectionState>,
    session: StdMutex<Session>,
    room: StdMutex<RoomView>,
    latency: StdMutex<LatencyTracker>,
    errors: StdMutex<ErrorTracker>,
    reconnect_attempts: AtomicU32,
    pending_auth: StdMutex<Option<PendingAuth>>,
}

impl Shared {
    fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            state,
            session: StdMutex::new(Session::default()),
            room: StdMutex::new(RoomView::new()),
            latency: StdMutex::new(LatencyTracker::new()),
            errors: StdMutex::new(ErrorTracker::new()),
            reconnect_attempts: AtomicU32::new(0),
            pending_auth: StdMutex::new(None),
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(?prev, ?next, "connection state transition");
        }
    }

    fn record_error(&self, record: ErrorRecord) {
        lock(&self.errors).record(record);
    }

    /// Mark the start of a connect attempt.
    fn begin_attempt(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::AcqRel);
        self.set_state(ConnectionState::Connecting);
    }

    /// Record a failed connect attempt and hand the error back to the caller.
    fn fail_attempt(&self, message: String, err: BrawlNetError) -> BrawlNetError {
        self.record_error(ErrorRecord::new(ErrorKind::Connection, message, true));
        self.clear_session_state();
        self.set_state(ConnectionState::Error);
        err
    }

    /// Clear session, room view, and any pending handshake.
    ///
    /// Dropping the pending reply sender wakes a caller suspended in
    /// `authenticate` with a channel-closed error.
    fn clear_session_state(&self) {
        lock(&self.session).clear();
        lock(&self.room).clear();
        lock(&self.pending_auth).take();
    }

    fn reset_to_disconnected(&self) {
        self.clear_session_state();
        self.set_state(ConnectionState::Disconnected);
    }
}

/// Rolls a cancelled connect attempt back to `Disconnected` so the state
/// machine is never left stuck in `Connecting`.
struct AttemptGuard {
    shared: Arc<Shared>,
    armed: bool,
}

impl AttemptGuard {
    fn new(shared: Arc<Shared>) -> Self {
        Self {
            shared,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        if self.armed {
            debug!("connect attempt cancelled, rolling back to disconnected");
            self.shared.reset_to_disconnected();
        }
    }
}

/// Per-connection handles held by the client.
struct ActiveConn {
    cmd_tx: mpsc::UnboundedSender<ClientMessage>,
    task: tokio::task::JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

// ── Client handle ───────────────────────────────────────────────────

/// Async client handle for the BrawlNet match protocol.
///
/// Created via [`BrawlNetClient::new`], which returns this handle together
/// with the event receiver. Connecting spawns a background transport loop;
/// the receiver stays valid across reconnects.
///
/// `connect` and `authenticate` are the only suspending operations, and the
/// `&mut self` receivers guarantee at most one of each is in flight at a
/// time. Everything else (senders, accessors, `disconnect`) is synchronous.
pub struct BrawlNetClient {
    shared: Arc<Shared>,
    event_tx: mpsc::Sender<BrawlNetEvent>,
    conn: Option<ActiveConn>,
    config: BrawlNetConfig,
}

impl BrawlNetClient {
    /// Create a client handle and its event receiver.
    ///
    /// No connection is opened yet; call [`connect`](Self::connect) (or
    /// [`connect_with`](Self::connect_with)) next.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn new(config: BrawlNetConfig) -> (Self, mpsc::Receiver<BrawlNetEvent>) {
        // Clamp capacity to at least 1 (tokio panics on 0).
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<BrawlNetEvent>(capacity);

        let client = Self {
            shared: Arc::new(Shared::new()),
            event_tx,
            conn: None,
            config,
        };

        (client, event_rx)
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Connect to a BrawlNet server over WebSocket.
    ///
    /// Dials with the configured transport-level retry schedule, bounded as a
    /// whole by `connect_timeout` (20 s by default). Returns once the channel
    /// is open and the transport loop is running — never while the state is
    /// still `Connecting`.
    ///
    /// Calling this while already connected is a no-op. A successful connect
    /// resets `reconnect_attempts` to 0.
    ///
    /// # Errors
    ///
    /// Returns [`BrawlNetError::Timeout`] when the ceiling elapses, or the
    /// transport error from the final dial attempt. Either failure moves the
    /// state machine to [`ConnectionState::Error`] and records a critical
    /// connection error.
    #[cfg(feature = "transport-websocket")]
    pub async fn connect(&mut self, url: &str) -> Result<()> {
        use crate::transports::WebSocketTransport;

        if self.state().is_open() {
            debug!(url, "connect: already connected, ignoring");
            return Ok(());
        }

        self.shared.begin_attempt();
        let guard = AttemptGuard::new(Arc::clone(&self.shared));

        let dial = WebSocketTransport::connect_with_retry(
            url,
            self.config.transport_retry_attempts,
            self.config.transport_retry_delay,
        );

        match tokio::time::timeout(self.config.connect_timeout, dial).await {
            Ok(Ok(transport)) => {
                guard.disarm();
                self.attach(transport);
                Ok(())
            }
            Ok(Err(e)) => {
                guard.disarm();
                Err(self
                    .shared
                    .fail_attempt(format!("transport connect failed: {e}"), e))
            }
            Err(_) => {
                guard.disarm();
                Err(self.shared.fail_attempt(
                    format!("connect to {url} timed out"),
                    BrawlNetError::Timeout,
                ))
            }
        }
    }

    /// Adopt an already-connected [`Transport`] (custom transports, tests).
    ///
    /// Must be called within a Tokio runtime. Calling this while already
    /// connected is a no-op that leaves the existing channel untouched.
    pub fn connect_with(&mut self, transport: impl Transport) -> Result<()> {
        if self.state().is_open() {
            debug!("connect_with: already connected, ignoring");
            return Ok(());
        }
        self.shared.begin_attempt();
        self.attach(transport);
        Ok(())
    }

    fn attach(&mut self, transport: impl Transport) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        lock(&self.shared.latency).reset();

        let task = tokio::spawn(transport_loop(
            transport,
            cmd_rx,
            self.event_tx.clone(),
            Arc::clone(&self.shared),
            shutdown_rx,
            self.config.ping_interval,
        ));

        self.conn = Some(ActiveConn {
            cmd_tx,
            task,
            shutdown_tx: Some(shutdown_tx),
        });

        self.shared.reconnect_attempts.store(0, Ordering::Release);
        self.shared.set_state(ConnectionState::Connected);
        info!("connected");
    }

    /// Run the authentication handshake with an opaque bearer token.
    ///
    /// Sends `authenticate` and awaits the correlated `authenticated` /
    /// `authenticationFailed` response, bounded by `auth_timeout` (10 s by
    /// default). On success the session is populated and the state machine
    /// moves to [`ConnectionState::Authenticated`].
    ///
    /// The pending reply is deregistered on every exit path, so a response
    /// arriving after a timeout cannot mutate the session.
    ///
    /// # Errors
    ///
    /// - [`BrawlNetError::NotConnected`] if no channel is open (precondition;
    ///   nothing is sent).
    /// - [`BrawlNetError::AuthenticationFailed`] on server rejection.
    /// - [`BrawlNetError::Timeout`] if no response arrives in time; the state
    ///   is unchanged and the caller may retry.
    pub async fn authenticate(&mut self, token: impl Into<String>) -> Result<UserId> {
        let token = token.into();

        if !self.state().is_open() {
            return Err(BrawlNetError::NotConnected);
        }

        let (reply_tx, reply_rx) = oneshot::channel::<Result<UserId>>();
        *lock(&self.shared.pending_auth) = Some(PendingAuth {
            token: token.clone(),
            reply: reply_tx,
        });

        if let Err(e) = self.send(ClientMessage::Authenticate { token }) {
            lock(&self.shared.pending_auth).take();
            return Err(e);
        }

        match tokio::time::timeout(self.config.auth_timeout, reply_rx).await {
            Ok(Ok(outcome)) => outcome,
            // The loop dropped the reply: the transport died mid-handshake.
            Ok(Err(_closed)) => Err(BrawlNetError::NotConnected),
            Err(_) => {
                // Deregister so a late response is ignored.
                lock(&self.shared.pending_auth).take();
                self.shared.record_error(ErrorRecord::new(
                    ErrorKind::Authentication,
                    "authentication timed out",
                    false,
                ));
                Err(BrawlNetError::Timeout)
            }
        }
    }

    /// Disconnect immediately.
    ///
    /// Synchronous and idempotent: aborts the transport loop, releases the
    /// channel, clears the session and room view, and moves to
    /// [`ConnectionState::Disconnected`] regardless of prior state.
    ///
    /// For a graceful close (WebSocket close frame, final `Disconnected`
    /// event from the loop) use [`shutdown`](Self::shutdown) instead.
    pub fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            debug!("disconnect: aborting transport loop");
            conn.task.abort();
            // Best-effort: the loop was aborted, so emit the final event here.
            let _ = self.event_tx.try_send(BrawlNetEvent::Disconnected {
                reason: Some("client disconnected".into()),
            });
        }
        self.shared.reset_to_disconnected();
    }

    /// Shut down gracefully, closing the transport and stopping the
    /// background task.
    ///
    /// The transport loop is given `shutdown_timeout` to close the transport
    /// and emit a final `Disconnected` event; past that it is aborted.
    pub async fn shutdown(&mut self) {
        debug!("BrawlNetClient: shutdown requested");

        let Some(mut conn) = self.conn.take() else {
            self.shared.reset_to_disconnected();
            return;
        };

        // Signal the transport loop to shut down gracefully.
        if let Some(tx) = conn.shutdown_tx.take() {
            let _ = tx.send(());
        }

        // Await the transport loop with a timeout. If it doesn't exit in time,
        // abort it so the task cannot detach and run indefinitely.
        let mut task = conn.task;
        match tokio::time::timeout(self.config.shutdown_timeout, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(join_err)) => {
                warn!("transport loop terminated with join error: {join_err}");
            }
            Err(_) => {
                warn!("transport loop did not exit within timeout; aborting task");
                task.abort();
                if let Err(join_err) = task.await {
                    debug!("transport loop aborted: {join_err}");
                }
            }
        }

        self.shared.reset_to_disconnected();
    }

    // ── Reconnection policy ─────────────────────────────────────────

    /// Connect attempts made since the last successful connect.
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.reconnect_attempts.load(Ordering::Acquire)
    }

    /// The configured attempt cap.
    pub fn max_reconnect_attempts(&self) -> u32 {
        self.config.max_reconnect_attempts
    }

    /// Whether another automatic reconnect should be offered.
    ///
    /// Once this turns false, callers typically surface a manual retry
    /// affordance instead of dialing again on their own.
    pub fn can_reconnect(&self) -> bool {
        self.reconnect_attempts() < self.config.max_reconnect_attempts
    }

    // ── State accessors ─────────────────────────────────────────────

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// `true` while a channel is open.
    pub fn is_connected(&self) -> bool {
        self.state().is_open()
    }

    /// `true` iff the handshake succeeded on the current channel and both
    /// identity fields are set.
    pub fn is_authenticated(&self) -> bool {
        self.state() == ConnectionState::Authenticated && lock(&self.shared.session).is_set()
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        lock(&self.shared.session).clone()
    }

    /// Snapshot of the current room, if the client is in one.
    pub fn current_room(&self) -> Option<RoomData> {
        lock(&self.shared.room).room().cloned()
    }

    /// Final result of the last match, once `matchEnded` has arrived.
    pub fn match_result(&self) -> Option<MatchResultMessage> {
        lock(&self.shared.room).result().cloned()
    }

    /// Snapshot of the connection metrics.
    pub fn metrics(&self) -> ConnectionMetrics {
        lock(&self.shared.latency).metrics()
    }

    /// The most recent error record, if any.
    pub fn last_error(&self) -> Option<ErrorRecord> {
        lock(&self.shared.errors).last().cloned()
    }

    /// The retained error history, oldest first (at most 10 records).
    pub fn error_history(&self) -> Vec<ErrorRecord> {
        lock(&self.shared.errors).history().cloned().collect()
    }

    /// Drop the entire error history.
    pub fn clear_errors(&self) {
        lock(&self.shared.errors).clear();
    }

    // ── Protocol senders ────────────────────────────────────────────
    //
    // All senders queue a message to the transport loop and return
    // immediately (no round-trip await). They fail with `NotConnected`
    // once the channel is gone.

    /// Enter the matchmaking queue.
    pub fn join_queue(&self) -> Result<()> {
        self.send(ClientMessage::JoinQueue)
    }

    /// Leave the matchmaking queue.
    pub fn leave_queue(&self) -> Result<()> {
        self.send(ClientMessage::LeaveQueue)
    }

    /// Join a room by id (e.g. one announced via `matchFound`).
    pub fn join_room(&self, room_id: impl Into<RoomId>) -> Result<()> {
        self.send(ClientMessage::JoinRoom {
            room_id: room_id.into(),
        })
    }

    /// Leave the current room.
    pub fn leave_room(&self) -> Result<()> {
        self.send(ClientMessage::LeaveRoom)
    }

    /// Create a room.
    pub fn create_room(&self, params: CreateRoomParams) -> Result<()> {
        self.send(ClientMessage::CreateRoom {
            max_players: params.max_players,
            stage: params.stage,
            private: params.private,
        })
    }

    /// Pick a character. The room view updates when the server echoes
    /// `characterSelected`.
    pub fn select_character(&self, character: CharacterType) -> Result<()> {
        self.send(ClientMessage::SelectCharacter { character })
    }

    /// Pick a stage.
    pub fn select_stage(&self, stage: StageType) -> Result<()> {
        self.send(ClientMessage::SelectStage { stage })
    }

    /// Set or clear readiness. The room view updates when the server echoes
    /// `playerReadyChanged`.
    pub fn set_ready(&self, ready: bool) -> Result<()> {
        self.send(ClientMessage::PlayerReady { ready })
    }

    /// Send one frame of input.
    pub fn send_input(&self, input: PlayerInputMessage) -> Result<()> {
        self.send(ClientMessage::PlayerInput(input))
    }

    /// Send a position sample for peer interpolation.
    pub fn send_position(&self, position: PlayerPositionMessage) -> Result<()> {
        self.send(ClientMessage::PlayerPosition(position))
    }

    /// Send a chat message to the room.
    pub fn send_chat(&self, message: impl Into<String>) -> Result<()> {
        self.send(ClientMessage::ChatMessage {
            message: message.into(),
        })
    }

    /// Ask the server for a full game-state snapshot.
    pub fn request_game_state_sync(&self) -> Result<()> {
        self.send(ClientMessage::RequestGameStateSync)
    }

    /// Ask the server for a full room snapshot.
    pub fn request_room_state(&self) -> Result<()> {
        self.send(ClientMessage::RequestRoomState)
    }

    /// Request match start (host only).
    pub fn start_game(&self) -> Result<()> {
        self.send(ClientMessage::StartGame)
    }

    /// Send a manual latency probe. The transport loop also probes on
    /// `ping_interval` automatically.
    pub fn ping(&self) -> Result<()> {
        self.send(ClientMessage::Ping)
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// Queue a `ClientMessage` to the transport loop.
    fn send(&self, msg: ClientMessage) -> Result<()> {
        if !self.state().is_open() {
            return Err(BrawlNetError::NotConnected);
        }
        let Some(conn) = &self.conn else {
            return Err(BrawlNetError::NotConnected);
        };
        conn.cmd_tx
            .send(msg)
            .map_err(|_| BrawlNetError::NotConnected)
    }
}

impl std::fmt::Debug for BrawlNetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrawlNetClient")
            .field("state", &self.state())
            .field("authenticated", &self.is_authenticated())
            .field("reconnect_attempts", &self.reconnect_attempts())
            .field("has_task", &self.conn.is_some())
            .finish()
    }
}

impl Drop for BrawlNetClient {
    fn drop(&mut self) {
        // `Drop` is synchronous so we cannot await a graceful shutdown.
        // The only safe action is to abort the spawned task, which causes
        // the transport loop future to be dropped immediately. The
        // `shutdown_tx` oneshot is intentionally *not* sent here: sending
        // it would trigger a graceful path that calls async `transport.close()`,
        // but there is no executor context to drive it inside `Drop`.
        if let Some(conn) = self.conn.take() {
            conn.task.abort();
        }
    }
}

// ── Transport loop ──────────────────────────────────────────────────

/// Background transport loop that multiplexes send/receive/probe via
/// `tokio::select!`.
///
/// Exits when:
/// - The command channel closes (client handle dropped)
/// - The shutdown signal fires (graceful `shutdown`)
/// - The transport returns `None` (server closed connection)
/// - A transport error occurs
async fn transport_loop(
    mut transport: impl Transport,
    mut cmd_rx: mpsc::UnboundedReceiver<ClientMessage>,
    event_tx: mpsc::Sender<BrawlNetEvent>,
    shared: Arc<Shared>,
    mut shutdown_rx: oneshot::Receiver<()>,
    ping_interval: Duration,
) {
    debug!("transport loop started");

    // Emit the synthetic Connected event before entering the select loop.
    emit_event(&event_tx, BrawlNetEvent::Connected).await;

    let mut probe = tokio::time::interval(ping_interval);
    probe.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so probing starts one
    // interval after connect.
    probe.tick().await;

    loop {
        tokio::select! {
            // Branch 1: outgoing command from the client handle
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(msg) => {
                        debug!("sending client message: {:?}", std::mem::discriminant(&msg));
                        if matches!(msg, ClientMessage::Ping) {
                            lock(&shared.latency).record_ping_sent(Instant::now());
                        }
                        match serde_json::to_string(&msg) {
                            Ok(json) => {
                                if let Err(e) = transport.send(json).await {
                                    error!("transport send error: {e}");
                                    shared.record_error(ErrorRecord::new(
                                        ErrorKind::Connection,
                                        format!("transport send error: {e}"),
                                        true,
                                    ));
                                    emit_disconnected(
                                        &event_tx,
                                        &shared,
                                        Some(format!("transport send error: {e}")),
                                    ).await;
                                    break;
                                }
                            }
                            Err(e) => {
                                error!("failed to serialize ClientMessage: {e}");
                                // Serialization errors are programming bugs; don't kill the loop.
                            }
                        }
                    }
                    // Command channel closed — client handle dropped.
                    None => {
                        debug!("command channel closed, shutting down transport loop");
                        let _ = transport.close().await;
                        emit_disconnected(&event_tx, &shared, Some("client shut down".into())).await;
                        break;
                    }
                }
            }

            // Branch 2: shutdown signal
            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                let _ = transport.close().await;
                emit_disconnected(&event_tx, &shared, Some("client shut down".into())).await;
                break;
            }

            // Branch 3: latency probe
            _ = probe.tick() => {
                lock(&shared.latency).record_ping_sent(Instant::now());
                match serde_json::to_string(&ClientMessage::Ping) {
                    Ok(json) => {
                        if let Err(e) = transport.send(json).await {
                            error!("transport send error on probe: {e}");
                            shared.record_error(ErrorRecord::new(
                                ErrorKind::Connection,
                                format!("transport send error: {e}"),
                                true,
                            ));
                            emit_disconnected(
                                &event_tx,
                                &shared,
                                Some(format!("transport send error: {e}")),
                            ).await;
                            break;
                        }
                    }
                    Err(e) => error!("failed to serialize ping probe: {e}"),
                }
            }

            // Branch 4: incoming message from the server
            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => {
                        match serde_json::from_str::<ServerMessage>(&text) {
                            Ok(ServerMessage::Ping) => {
                                // Server keepalive: answer immediately, nothing to surface.
                                match serde_json::to_string(&ClientMessage::Pong) {
                                    Ok(json) => {
                                        if let Err(e) = transport.send(json).await {
                                            error!("transport send error on pong: {e}");
                                            emit_disconnected(
                                                &event_tx,
                                                &shared,
                                                Some(format!("transport send error: {e}")),
                                            ).await;
                                            break;
                                        }
                                    }
                                    Err(e) => error!("failed to serialize pong: {e}"),
                                }
                            }
                            Ok(ServerMessage::Pong) => {
                                lock(&shared.latency).record_pong(Instant::now());
                                emit_event(&event_tx, BrawlNetEvent::Pong).await;
                            }
                            Ok(server_msg) => {
                                // Update shared state based on the message.
                                update_shared(&shared, &server_msg);

                                // Convert to event and forward to the event channel.
                                let event = BrawlNetEvent::from(server_msg);
                                emit_event(&event_tx, event).await;
                            }
                            Err(e) => {
                                // Unknown or malformed events are rejected, never
                                // passed through untyped.
                                warn!("failed to deserialize server message: {e} — raw: {text}");
                            }
                        }
                    }
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        shared.record_error(ErrorRecord::new(
                            ErrorKind::Connection,
                            format!("transport receive error: {e}"),
                            true,
                        ));
                        emit_disconnected(
                            &event_tx,
                            &shared,
                            Some(format!("transport receive error: {e}")),
                        ).await;
                        break;
                    }
                    // Transport closed cleanly.
                    None => {
                        debug!("transport closed by server");
                        emit_disconnected(&event_tx, &shared, None).await;
                        break;
                    }
                }
            }
        }
    }

    debug!("transport loop exited");
}

/// Update shared state based on a received [`ServerMessage`].
fn update_shared(shared: &Shared, msg: &ServerMessage) {
    match msg {
        ServerMessage::Authenticated { user_id } => {
            match lock(&shared.pending_auth).take() {
                Some(pending) => {
                    {
                        let mut session = lock(&shared.session);
                        session.auth_token = Some(pending.token);
                        session.user_id = Some(user_id.clone());
                    }
                    shared.set_state(ConnectionState::Authenticated);
                    debug!(user_id = %user_id, "state: authenticated");
                    let _ = pending.reply.send(Ok(user_id.clone()));
                }
                // No handshake in flight (e.g. it already timed out); the
                // session must not change.
                None => warn!("authenticated response with no pending handshake, ignoring"),
            }
        }
        ServerMessage::AuthenticationFailed { reason, error_code } => {
            match lock(&shared.pending_auth).take() {
                Some(pending) => {
                    shared.record_error(
                        ErrorRecord::new(ErrorKind::Authentication, reason.clone(), true)
                            .with_code(error_code.clone()),
                    );
                    let _ = pending.reply.send(Err(BrawlNetError::AuthenticationFailed {
                        reason: reason.clone(),
                        error_code: error_code.as_ref().map(|c| format!("{c:?}")),
                    }));
                }
                None => warn!("authenticationFailed with no pending handshake, ignoring"),
            }
        }
        ServerMessage::RoomJoined(room) | ServerMessage::RoomStateSync(room) => {
            lock(&shared.room).replace((**room).clone());
        }
        ServerMessage::PlayerJoined { player } => {
            lock(&shared.room).player_joined(player.clone());
        }
        ServerMessage::PlayerLeft { player_id } => {
            lock(&shared.room).player_left(player_id);
        }
        ServerMessage::CharacterSelected {
            player_id,
            character,
        } => {
            lock(&shared.room).character_selected(player_id, *character);
        }
        ServerMessage::StageSelected { stage } => {
            lock(&shared.room).stage_selected(*stage);
        }
        ServerMessage::PlayerReadyChanged { player_id, ready } => {
            lock(&shared.room).player_ready_changed(player_id, *ready);
        }
        ServerMessage::GameStarted => {
            lock(&shared.room).game_started();
        }
        ServerMessage::MatchEnded(result) => {
            lock(&shared.room).match_ended(result.clone());
        }
        ServerMessage::Error {
            message,
            error_code,
        } => {
            shared.record_error(
                ErrorRecord::new(ErrorKind::Game, message.clone(), false)
                    .with_code(error_code.clone()),
            );
        }
        ServerMessage::RoomError {
            message,
            error_code,
        } => {
            shared.record_error(
                ErrorRecord::new(ErrorKind::Room, message.clone(), false)
                    .with_code(error_code.clone()),
            );
        }
        _ => {}
    }
}

/// Emit an event to the event channel. If the channel is full, log a warning
/// and drop the event to avoid blocking the transport loop.
async fn emit_event(event_tx: &mpsc::Sender<BrawlNetEvent>, event: BrawlNetEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!(
                "event channel full, dropping event: {:?}",
                std::mem::discriminant(&dropped)
            );
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Emit a [`Disconnected`](BrawlNetEvent::Disconnected) event and reset state.
///
/// Uses `send().await` (blocking) instead of `try_send` because `Disconnected`
/// is always the last event on the channel and must never be silently dropped.
async fn emit_disconnected(
    event_tx: &mpsc::Sender<BrawlNetEvent>,
    shared: &Shared,
    reason: Option<String>,
) {
    shared.reset_to_disconnected();
    let event = BrawlNetEvent::Disconnected { reason };
    if event_tx.send(event).await.is_err() {
        debug!("event channel closed, receiver dropped");
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::{NetworkPlayer, PlayerStats, RoomState};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicBool;

    // ── Mock transport ──────────────────────────────────────────────

    type Scripted = (usize, Option<std::result::Result<String, BrawlNetError>>);

    /// A mock transport that records sent messages and replays scripted
    /// responses. Each scripted item carries a gate: it is only released
    /// once that many messages have been sent by the client, which lets
    /// request/response exchanges be scripted without races.
    struct MockTransport {
        incoming: VecDeque<Scripted>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    impl MockTransport {
        /// Ungated script: every item is released immediately.
        fn new(
            incoming: Vec<Option<std::result::Result<String, BrawlNetError>>>,
        ) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
            Self::scripted(incoming.into_iter().map(|item| (0, item)).collect())
        }

        fn scripted(
            incoming: Vec<Scripted>,
        ) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
            let sent = Arc::new(StdMutex::new(Vec::new()));
            let closed = Arc::new(AtomicBool::new(false));
            let transport = Self {
                incoming: VecDeque::from(incoming),
                sent: Arc::clone(&sent),
                closed: Arc::clone(&closed),
            };
            (transport, sent, closed)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, message: String) -> std::result::Result<(), BrawlNetError> {
            lock(&self.sent).push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, BrawlNetError>> {
            loop {
                match self.incoming.front() {
                    Some((gate, _)) if lock(&self.sent).len() >= *gate => {
                        // An explicit `None` item signals a clean transport
                        // close; `Some(result)` delivers the scripted message
                        // or error.
                        return self.incoming.pop_front().and_then(|(_, item)| item);
                    }
                    Some(_) => tokio::time::sleep(Duration::from_millis(2)).await,
                    // All scripted messages delivered — hang forever so the
                    // transport loop stays alive until shutdown.
                    None => std::future::pending().await,
                }
            }
        }

        async fn close(&mut self) -> std::result::Result<(), BrawlNetError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn auth_ok_json(user_id: &str) -> String {
        serde_json::to_string(&ServerMessage::Authenticated {
            user_id: user_id.into(),
        })
        .unwrap()
    }

    fn auth_failed_json(reason: &str) -> String {
        serde_json::to_string(&ServerMessage::AuthenticationFailed {
            reason: reason.into(),
            error_code: Some(crate::error_codes::ErrorCode::InvalidToken),
        })
        .unwrap()
    }

    fn room_joined_json(room_id: &str) -> String {
        serde_json::to_string(&ServerMessage::RoomJoined(Box::new(RoomData {
            id: room_id.into(),
            players: vec![],
            max_players: 4,
            stage: None,
            state: RoomState::Waiting,
        })))
        .unwrap()
    }

    fn player_joined_json(id: &str) -> String {
        serde_json::to_string(&ServerMessage::PlayerJoined {
            player: NetworkPlayer {
                id: id.into(),
                name: format!("Player {id}"),
                character: None,
                ready: false,
                connected: true,
                stats: PlayerStats::default(),
            },
        })
        .unwrap()
    }

    fn test_config() -> BrawlNetConfig {
        BrawlNetConfig::new()
            .with_auth_timeout(Duration::from_millis(200))
            .with_shutdown_timeout(Duration::from_millis(200))
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn connect_with_reaches_connected() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = BrawlNetClient::new(test_config());

        assert_eq!(client.state(), ConnectionState::Disconnected);
        client.connect_with(transport).unwrap();
        assert_eq!(client.state(), ConnectionState::Connected);
        assert_eq!(client.reconnect_attempts(), 0);

        let event = events.recv().await.unwrap();
        assert!(matches!(event, BrawlNetEvent::Connected));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn authenticate_success_sets_session_and_state() {
        // Released once the Authenticate message has been sent.
        let (transport, sent, _closed) =
            MockTransport::scripted(vec![(1, Some(Ok(auth_ok_json("u1"))))]);
        let (mut client, mut events) = BrawlNetClient::new(test_config());
        client.connect_with(transport).unwrap();

        let user_id = client.authenticate("tok-1").await.unwrap();
        assert_eq!(user_id, "u1");
        assert_eq!(client.state(), ConnectionState::Authenticated);
        assert!(client.is_authenticated());

        let session = client.session();
        assert_eq!(session.auth_token.as_deref(), Some("tok-1"));
        assert_eq!(session.user_id.as_deref(), Some("u1"));

        // The wire message was an `authenticate` envelope.
        {
            let messages = lock(&sent);
            let first: ClientMessage = serde_json::from_str(&messages[0]).unwrap();
            assert!(matches!(first, ClientMessage::Authenticate { .. }));
        }

        let _ = events.recv().await; // Connected
        let ev = events.recv().await.unwrap();
        assert!(matches!(ev, BrawlNetEvent::Authenticated { .. }));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn authenticate_rejection_records_critical_error() {
        let (transport, _sent, _closed) =
            MockTransport::scripted(vec![(1, Some(Ok(auth_failed_json("bad token"))))]);
        let (mut client, _events) = BrawlNetClient::new(test_config());
        client.connect_with(transport).unwrap();

        let err = client.authenticate("tok-bad").await.unwrap_err();
        assert!(matches!(err, BrawlNetError::AuthenticationFailed { .. }));

        // No state transition: still connected, not authenticated.
        assert_eq!(client.state(), ConnectionState::Connected);
        assert!(!client.is_authenticated());
        assert!(client.session().auth_token.is_none());

        let last = client.last_error().unwrap();
        assert_eq!(last.kind, ErrorKind::Authentication);
        assert!(last.critical);

        client.disconnect();
    }

    #[tokio::test]
    async fn authenticate_timeout_rejects_and_late_reply_is_ignored() {
        // Gate of 2: the reply is withheld until a second message is sent,
        // which happens only after the handshake has already timed out.
        let (transport, _sent, _closed) =
            MockTransport::scripted(vec![(2, Some(Ok(auth_ok_json("u-late"))))]);
        let config = BrawlNetConfig::new().with_auth_timeout(Duration::from_millis(50));
        let (mut client, _events) = BrawlNetClient::new(config);
        client.connect_with(transport).unwrap();

        let err = client.authenticate("tok-slow").await.unwrap_err();
        assert!(matches!(err, BrawlNetError::Timeout));
        assert_eq!(client.state(), ConnectionState::Connected);

        // Release the late reply and give the loop time to (not) process it.
        client.ping().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!client.is_authenticated());
        assert!(client.session().user_id.is_none());

        client.disconnect();
    }

    #[tokio::test]
    async fn authenticate_without_connection_is_a_precondition_error() {
        let (mut client, _events) = BrawlNetClient::new(test_config());
        let err = client.authenticate("tok").await.unwrap_err();
        assert!(matches!(err, BrawlNetError::NotConnected));
    }

    #[tokio::test]
    async fn connect_with_twice_is_a_noop() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (mut client, _events) = BrawlNetClient::new(test_config());
        client.connect_with(transport).unwrap();
        assert_eq!(client.state(), ConnectionState::Connected);

        // Second connect while connected: no-op, existing channel untouched.
        let (transport2, _sent2, closed2) = MockTransport::new(vec![]);
        client.connect_with(transport2).unwrap();
        assert_eq!(client.state(), ConnectionState::Connected);
        assert!(!closed2.load(Ordering::Relaxed));

        client.disconnect();
    }

    #[tokio::test]
    async fn disconnect_is_synchronous_and_idempotent() {
        let (transport, _sent, _closed) =
            MockTransport::scripted(vec![(1, Some(Ok(auth_ok_json("u1"))))]);
        let (mut client, _events) = BrawlNetClient::new(test_config());
        client.connect_with(transport).unwrap();
        client.authenticate("tok").await.unwrap();

        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.session().auth_token.is_none());
        assert!(client.session().user_id.is_none());
        assert!(!client.is_authenticated());
        assert!(client.current_room().is_none());

        // Second call: same observable effect.
        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn room_events_update_room_view() {
        let (transport, _sent, _closed) = MockTransport::new(vec![
            Some(Ok(room_joined_json("r1"))),
            Some(Ok(player_joined_json("p1"))),
            Some(Ok(serde_json::to_string(&ServerMessage::PlayerReadyChanged {
                player_id: "p1".into(),
                ready: true,
            })
            .unwrap())),
        ]);
        let (mut client, mut events) = BrawlNetClient::new(test_config());
        client.connect_with(transport).unwrap();

        let _ = events.recv().await; // Connected
        let _ = events.recv().await; // RoomJoined
        let _ = events.recv().await; // PlayerJoined
        let _ = events.recv().await; // PlayerReadyChanged

        let room = client.current_room().unwrap();
        assert_eq!(room.id, "r1");
        assert_eq!(room.players.len(), 1);
        assert!(room.players[0].ready);
        assert_eq!(room.state, RoomState::Waiting);

        client.shutdown().await;
    }

    #[tokio::test]
    async fn transport_recv_error_disconnects_and_records() {
        let (transport, _sent, _closed) = MockTransport::new(vec![Some(Err(
            BrawlNetError::TransportReceive("boom".into()),
        ))]);
        let (mut client, mut events) = BrawlNetClient::new(test_config());
        client.connect_with(transport).unwrap();

        let _ = events.recv().await; // Connected
        let event = events.recv().await.unwrap();
        let BrawlNetEvent::Disconnected { reason } = event else {
            panic!("expected Disconnected, got {event:?}");
        };
        assert!(reason.unwrap().contains("boom"));

        assert_eq!(client.state(), ConnectionState::Disconnected);
        let last = client.last_error().unwrap();
        assert_eq!(last.kind, ErrorKind::Connection);
        assert!(last.critical);

        client.disconnect();
    }

    #[tokio::test]
    async fn server_ping_is_answered_with_pong() {
        let (transport, sent, _closed) = MockTransport::new(vec![Some(Ok(
            serde_json::to_string(&ServerMessage::Ping).unwrap(),
        ))]);
        let (mut client, mut events) = BrawlNetClient::new(test_config());
        client.connect_with(transport).unwrap();

        let _ = events.recv().await; // Connected
        tokio::time::sleep(Duration::from_millis(50)).await;

        {
            let messages = lock(&sent);
            assert!(!messages.is_empty());
            let first: ClientMessage = serde_json::from_str(&messages[0]).unwrap();
            assert!(matches!(first, ClientMessage::Pong));
        }

        client.shutdown().await;
    }

    #[tokio::test]
    async fn probe_pong_updates_metrics() {
        let (transport, _sent, _closed) = MockTransport::scripted(vec![(
            1,
            Some(Ok(serde_json::to_string(&ServerMessage::Pong).unwrap())),
        )]);
        let (mut client, mut events) = BrawlNetClient::new(test_config());
        client.connect_with(transport).unwrap();

        let _ = events.recv().await; // Connected
        client.ping().unwrap();

        let ev = events.recv().await.unwrap();
        assert!(matches!(ev, BrawlNetEvent::Pong));

        let metrics = client.metrics();
        assert!(metrics.last_ping_time.is_some());
        assert!(metrics.average_latency_ms >= 0.0);

        client.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_emits_disconnected_and_closes_transport() {
        let (transport, _sent, closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = BrawlNetClient::new(test_config());
        client.connect_with(transport).unwrap();

        let _ = events.recv().await; // Connected
        client.shutdown().await;

        let event = events.recv().await.unwrap();
        let BrawlNetEvent::Disconnected { reason } = event else {
            panic!("expected Disconnected, got {event:?}");
        };
        assert_eq!(reason.as_deref(), Some("client shut down"));
        assert!(closed.load(Ordering::Relaxed));
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn send_after_disconnect_is_not_connected() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (mut client, _events) = BrawlNetClient::new(test_config());
        client.connect_with(transport).unwrap();
        client.disconnect();

        let result = client.join_queue();
        assert!(matches!(result, Err(BrawlNetError::NotConnected)));
    }

    #[tokio::test]
    async fn double_shutdown_does_not_panic() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (mut client, _events) = BrawlNetClient::new(test_config());
        client.connect_with(transport).unwrap();

        client.shutdown().await;
        client.shutdown().await; // should not panic
    }

    #[tokio::test]
    async fn config_defaults() {
        let config = BrawlNetConfig::new();
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.connect_timeout, Duration::from_secs(20));
        assert_eq!(config.auth_timeout, Duration::from_secs(10));
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn event_channel_capacity_is_clamped_to_one() {
        let config = BrawlNetConfig::new().with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    #[tokio::test]
    async fn can_reconnect_respects_cap() {
        let (client, _events) =
            BrawlNetClient::new(BrawlNetConfig::new().with_max_reconnect_attempts(2));
        assert!(client.can_reconnect());
        client.shared.begin_attempt();
        client.shared.begin_attempt();
        assert_eq!(client.reconnect_attempts(), 2);
        assert!(!client.can_reconnect());
    }

    #[tokio::test]
    async fn successful_connect_resets_reconnect_attempts() {
        let (mut client, _events) = BrawlNetClient::new(test_config());
        client.shared.begin_attempt();
        client.shared.begin_attempt();
        client.shared.set_state(ConnectionState::Error);
        assert_eq!(client.reconnect_attempts(), 2);

        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        client.connect_with(transport).unwrap();
        assert_eq!(client.reconnect_attempts(), 0);
        assert_eq!(client.state(), ConnectionState::Connected);

        client.disconnect();
    }

    #[tokio::test]
    async fn error_state_is_not_terminal() {
        let (mut client, _events) = BrawlNetClient::new(test_config());
        client.shared.set_state(ConnectionState::Error);

        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        client.connect_with(transport).unwrap();
        assert_eq!(client.state(), ConnectionState::Connected);

        client.disconnect();
    }

    #[tokio::test]
    async fn debug_impl_for_client() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (mut client, _events) = BrawlNetClient::new(test_config());
        client.connect_with(transport).unwrap();

        let debug_str = format!("{client:?}");
        assert!(debug_str.contains("BrawlNetClient"));
        assert!(debug_str.contains("state"));

        client.disconnect();
    }

    #[tokio::test]
    async fn drop_without_explicit_shutdown() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = BrawlNetClient::new(test_config());
        client.connect_with(transport).unwrap();

        let _ = events.recv().await; // Connected

        // Drop the client without calling shutdown. The transport loop must
        // exit; we just verify we don't hang or panic.
        drop(client);
        while let Some(_event) = events.recv().await {}
    }

    #[tokio::test]
    async fn event_channel_backpressure_does_not_block() {
        // More messages than the event channel can hold; the loop must keep
        // draining the transport (dropping events) without deadlocking.
        let pong = serde_json::to_string(&ServerMessage::QueueJoined).unwrap();
        let mut incoming: Vec<Option<std::result::Result<String, BrawlNetError>>> = Vec::new();
        for _ in 0..20 {
            incoming.push(Some(Ok(pong.clone())));
        }
        incoming.push(None);

        let (transport, _sent, _closed) = MockTransport::new(incoming);
        let config = test_config().with_event_channel_capacity(1);
        let (mut client, mut events) = BrawlNetClient::new(config);
        client.connect_with(transport).unwrap();

        // Let the channel fill up and events get dropped.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut count = 0;
        while let Some(_event) = events.recv().await {
            count += 1;
        }
        // At minimum: Connected (first try_send) and the final Disconnected
        // (blocking send). Some QueueJoined events are dropped.
        assert!(count >= 2, "expected at least 2 events, got {count}");
        assert!(
            count < 22,
            "expected backpressure to drop some events, but got all {count}"
        );

        client.shutdown().await;
    }
}
