//! # Custom Transport Example
//!
//! Shows how to implement the [`Transport`] trait with a simple in-process
//! loopback channel. This is useful for:
//!
//! - **Testing** — unit-test your game logic without a real server
//! - **Custom backends** — adapt any I/O layer (TCP, QUIC, WebRTC data channels)
//!
//! ## Running
//!
//! ```sh
//! cargo run --example custom_transport
//! ```

use async_trait::async_trait;
use brawlnet_client::{
    BrawlNetClient, BrawlNetConfig, BrawlNetError, BrawlNetEvent, Transport,
};
use tokio::sync::mpsc;

// ─────────────────────────────────────────────────────────────────────
// Step 1: Define a channel-based "loopback" transport
// ─────────────────────────────────────────────────────────────────────

/// A loopback transport that shuttles messages through in-process channels.
///
/// This transport consists of two halves:
/// - The **client half** (`LoopbackTransport`) implements [`Transport`] and is
///   handed to `BrawlNetClient::connect_with`.
/// - The **server half** (`LoopbackServer`) lets you inject responses and read
///   what the client sent — perfect for testing.
pub struct LoopbackTransport {
    /// Messages the client sends go here (server reads from the other end).
    tx: mpsc::UnboundedSender<String>,
    /// Messages the server sends arrive here (client reads them).
    rx: mpsc::UnboundedReceiver<String>,
}

/// The "server side" of the loopback — use this to drive the conversation.
pub struct LoopbackServer {
    /// Read what the client sent.
    pub rx: mpsc::UnboundedReceiver<String>,
    /// Send messages to the client (as if they came from a server).
    pub tx: mpsc::UnboundedSender<String>,
}

/// Create a connected `(transport, server)` pair.
fn loopback_pair() -> (LoopbackTransport, LoopbackServer) {
    // Client → Server channel
    let (client_tx, server_rx) = mpsc::unbounded_channel();
    // Server → Client channel
    let (server_tx, client_rx) = mpsc::unbounded_channel();

    let transport = LoopbackTransport {
        tx: client_tx,
        rx: client_rx,
    };
    let server = LoopbackServer {
        rx: server_rx,
        tx: server_tx,
    };

    (transport, server)
}

// ─────────────────────────────────────────────────────────────────────
// Step 2: Implement the Transport trait
// ─────────────────────────────────────────────────────────────────────

#[async_trait]
impl Transport for LoopbackTransport {
    /// Send a JSON message to the "server" side of the loopback.
    async fn send(&mut self, message: String) -> Result<(), BrawlNetError> {
        self.tx
            .send(message)
            .map_err(|e| BrawlNetError::TransportSend(e.to_string()))
    }

    /// Receive the next message from the "server" side.
    ///
    /// Returns `None` when the server channel is closed — this is how the
    /// client discovers that the connection has ended.
    ///
    /// This method is **cancel-safe** because `mpsc::UnboundedReceiver::recv`
    /// is cancel-safe.
    async fn recv(&mut self) -> Option<Result<String, BrawlNetError>> {
        self.rx.recv().await.map(Ok)
    }

    /// Close is a no-op for channels — dropping is sufficient.
    async fn close(&mut self) -> Result<(), BrawlNetError> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 3: Wire together the client and the fake server
// ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for readable output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Create the loopback pair.
    let (transport, mut server) = loopback_pair();

    // Adopt the loopback as the client's channel.
    let (mut client, mut event_rx) = BrawlNetClient::new(BrawlNetConfig::new());
    client.connect_with(transport)?;

    // ── Fake server: answer the handshake ───────────────────────────
    // Run the server half concurrently: read the authenticate message and
    // respond with a synthetic `authenticated` event (the JSON must match
    // the wire format — adjacently-tagged: {"type": "event", "data": {…}}).
    let server_task = tokio::spawn(async move {
        let Some(auth_msg) = server.rx.recv().await else {
            tracing::error!("server channel closed before authenticate was received");
            return;
        };
        tracing::info!("Server received: {auth_msg}");

        let auth_response = serde_json::json!({
            "type": "authenticated",
            "data": { "userId": "u-loopback" }
        });
        let _ = server.tx.send(auth_response.to_string());
    });

    // The handshake resolves once the fake server replies.
    let user_id = client.authenticate("loopback-token").await?;
    tracing::info!("Handshake complete — user_id={user_id}");
    server_task.await?;

    // ── Read events from the client ─────────────────────────────────
    // We expect Connected (synthetic) and then Authenticated.
    let mut events_seen = 0;
    while let Some(event) = event_rx.recv().await {
        match &event {
            BrawlNetEvent::Connected => {
                tracing::info!("Event: Connected (synthetic)");
            }
            BrawlNetEvent::Authenticated { user_id } => {
                tracing::info!("Event: Authenticated — user_id={user_id}");
            }
            BrawlNetEvent::Disconnected { reason } => {
                tracing::info!(
                    "Event: Disconnected — {}",
                    reason.as_deref().unwrap_or("clean")
                );
                break;
            }
            other => {
                tracing::info!("Event: {other:?}");
            }
        }

        events_seen += 1;
        // After seeing both events, shut down.
        if events_seen >= 2 {
            break;
        }
    }

    // ── Clean shutdown ──────────────────────────────────────────────
    client.shutdown().await;
    tracing::info!("Done — saw {events_seen} event(s). Custom transport works!");
    Ok(())
}
