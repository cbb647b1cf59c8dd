//! # BrawlNet Client
//!
//! Transport-agnostic Rust client for the BrawlNet real-time match protocol.
//!
//! This crate provides a high-level async client that talks to a BrawlNet
//! match server using JSON text messages over any bidirectional, ordered
//! transport. It owns the hard part of a real-time game client — the
//! connection and session lifecycle: establishing and authenticating a
//! channel, surviving transient network loss with bounded retries, tracking
//! connection quality, and mirroring server-authoritative room/match state.
//!
//! ## Features
//!
//! - **Transport-agnostic** — implement the [`Transport`] trait for any backend
//! - **Wire-compatible** — all protocol types match the server's JSON format exactly
//! - **WebSocket built-in** — default `transport-websocket` feature provides `WebSocketTransport`
//! - **Event-driven** — receive typed `BrawlNetEvent`s via a channel
//! - **Server-authoritative** — the room view is a materialized view of the
//!   server's event stream, never a local guess
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use brawlnet_client::{BrawlNetClient, BrawlNetConfig, BrawlNetEvent};
//!
//! let (mut client, mut events) = BrawlNetClient::new(BrawlNetConfig::new());
//! client.connect("wss://play.brawlnet.dev/ws").await?;
//! client.authenticate(token).await?;
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

pub mod bootstrap;
pub mod error;
pub mod error_codes;
pub mod event;
pub mod metrics;
pub mod protocol;
pub mod room;
pub mod transport;

#[cfg(feature = "tokio-runtime")]
pub mod client;
pub mod transports;

// Re-export primary types for ergonomic imports.
#[cfg(feature = "tokio-runtime")]
pub use client::{BrawlNetClient, BrawlNetConfig, ConnectionState, CreateRoomParams, Session};
pub use error::BrawlNetError;
pub use error_codes::ErrorCode;
pub use event::BrawlNetEvent;
pub use metrics::{ConnectionMetrics, ConnectionQuality, ErrorKind, ErrorRecord};
pub use protocol::{ClientMessage, ServerMessage};
pub use room::RoomView;
pub use transport::Transport;

#[cfg(feature = "transport-websocket")]
pub use transports::WebSocketTransport;
