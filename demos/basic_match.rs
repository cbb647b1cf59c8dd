//! # Basic Match Example
//!
//! Demonstrates a complete BrawlNet client lifecycle:
//!
//! 1. Connect to a match server via WebSocket
//! 2. Authenticate with a bearer token
//! 3. Join the matchmaking queue and enter the room the server finds
//! 4. React to lobby events (players joining, ready state, match starting)
//! 5. Shut down gracefully on Ctrl+C or disconnect
//!
//! ## Running
//!
//! ```sh
//! # Start a BrawlNet server on localhost:4000, then:
//! BRAWLNET_TOKEN=dev-token cargo run --example basic_match
//!
//! # Override the server URL:
//! BRAWLNET_URL=ws://my-server:4000/ws cargo run --example basic_match
//! ```

use brawlnet_client::protocol::CharacterType;
use brawlnet_client::{BrawlNetClient, BrawlNetConfig, BrawlNetEvent};

/// Default server URL when `BRAWLNET_URL` is not set.
const DEFAULT_URL: &str = "ws://localhost:4000/ws";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Initialize tracing. Set `RUST_LOG=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let url = std::env::var("BRAWLNET_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let token = std::env::var("BRAWLNET_TOKEN").unwrap_or_else(|_| "dev-token".to_string());
    tracing::info!("Connecting to {url}");

    // ── Connect and authenticate ────────────────────────────────────
    let (mut client, mut event_rx) = BrawlNetClient::new(BrawlNetConfig::new());

    client.connect(&url).await?;
    let user_id = client.authenticate(token).await?;
    tracing::info!("Authenticated as {user_id}");

    // Enter matchmaking right away.
    client.join_queue()?;
    tracing::info!("Joined the matchmaking queue, waiting for a match…");

    // ── Event loop ──────────────────────────────────────────────────
    // Use `tokio::select!` to listen for both server events and Ctrl+C.
    loop {
        tokio::select! {
            // Branch 1: Incoming event from the server (or transport layer).
            event = event_rx.recv() => {
                let Some(event) = event else {
                    // Channel closed — transport loop exited.
                    tracing::info!("Event channel closed, exiting");
                    break;
                };

                match event {
                    // ── Matchmaking ──────────────────────────────────
                    BrawlNetEvent::QueueJoined => {
                        tracing::info!("Queue entry confirmed");
                    }

                    BrawlNetEvent::MatchFound { room_id } => {
                        tracing::info!("Match found! Joining room {room_id}");
                        client.join_room(room_id)?;
                    }

                    // ── Room lifecycle ───────────────────────────────
                    BrawlNetEvent::RoomJoined { room } => {
                        tracing::info!(
                            "Joined room {} ({} player(s) present)",
                            room.id,
                            room.players.len()
                        );

                        // Pick a character and mark ourselves as ready.
                        client.select_character(CharacterType::Ember)?;
                        client.set_ready(true)?;
                        tracing::info!("Picked EMBER and set ready");
                    }

                    BrawlNetEvent::PlayerJoined { player } => {
                        tracing::info!("Player joined: {} ({})", player.name, player.id);
                    }

                    BrawlNetEvent::PlayerLeft { player_id } => {
                        tracing::info!("Player left: {player_id}");
                    }

                    BrawlNetEvent::PlayerReadyChanged { player_id, ready } => {
                        tracing::info!("Player {player_id} ready → {ready}");
                    }

                    BrawlNetEvent::GameStarting { countdown_ms } => {
                        tracing::info!(
                            "Match starting in {} ms!",
                            countdown_ms.unwrap_or(0)
                        );
                    }

                    BrawlNetEvent::GameStarted => {
                        tracing::info!("Match started!");
                        let metrics = client.metrics();
                        tracing::info!(
                            "Connection: {:?} (avg latency {:.1} ms)",
                            metrics.quality,
                            metrics.average_latency_ms
                        );
                    }

                    BrawlNetEvent::MatchEnded { result } => {
                        match result.winner_id {
                            Some(winner) => tracing::info!("Match over — winner: {winner}"),
                            None => tracing::info!("Match over — draw"),
                        }
                        break;
                    }

                    // ── Errors from the server ───────────────────────
                    BrawlNetEvent::AuthenticationFailed { reason, error_code } => {
                        tracing::error!("Auth failed [{error_code:?}]: {reason}");
                        break;
                    }

                    BrawlNetEvent::Error { message, error_code } => {
                        tracing::error!("Server error [{error_code:?}]: {message}");
                    }

                    // ── Disconnect ───────────────────────────────────
                    BrawlNetEvent::Disconnected { reason } => {
                        tracing::warn!("Disconnected: {}", reason.as_deref().unwrap_or("unknown"));
                        if client.can_reconnect() {
                            tracing::info!(
                                "Reconnect attempts used: {}/{}",
                                client.reconnect_attempts(),
                                client.max_reconnect_attempts()
                            );
                        }
                        break;
                    }

                    // ── Catch-all ────────────────────────────────────
                    other => {
                        tracing::debug!("Event: {other:?}");
                    }
                }
            }

            // Branch 2: Ctrl+C — shut down gracefully.
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down…");
                break;
            }
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    client.shutdown().await;
    tracing::info!("Client shut down. Goodbye!");
    Ok(())
}
