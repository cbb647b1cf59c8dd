//! Error codes for structured error handling in the BrawlNet protocol.
//!
//! These codes are wire-compatible with the server's `ErrorCode` enum and
//! serialize using `SCREAMING_SNAKE_CASE` to match the server's JSON format.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured error codes returned by the BrawlNet server.
///
/// Each variant corresponds to a specific error condition. The server sends these
/// as `"SCREAMING_SNAKE_CASE"` strings (e.g., `"ROOM_NOT_FOUND"`).
///
/// Use [`description()`](ErrorCode::description) for a human-readable explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication errors
    InvalidToken,
    TokenExpired,
    AuthenticationRequired,
    AlreadyAuthenticated,
    AuthenticationTimeout,

    // Validation errors
    InvalidInput,
    InvalidCharacter,
    InvalidStage,
    MessageTooLarge,

    // Queue errors
    AlreadyInQueue,
    NotInQueue,
    QueueUnavailable,

    // Room errors
    RoomNotFound,
    RoomFull,
    AlreadyInRoom,
    NotInRoom,
    RoomClosed,
    InvalidRoomState,
    NotRoomHost,

    // Match errors
    MatchAlreadyStarted,
    MatchNotStarted,
    PlayersNotReady,

    // Rate limiting
    RateLimitExceeded,
    TooManyConnections,

    // Server errors
    InternalError,
    ServiceUnavailable,
}

impl ErrorCode {
    /// Returns a human-readable description of this error code.
    ///
    /// These messages are suitable for display to end users or for debugging.
    pub fn description(&self) -> &'static str {
        match self {
            // Authentication errors
            Self::InvalidToken => {
                "The authentication token is invalid or malformed. Please obtain a new token."
            }
            Self::TokenExpired => {
                "The authentication token has expired. Please sign in again to obtain a new token."
            }
            Self::AuthenticationRequired => {
                "This operation requires authentication. Authenticate before joining a queue or room."
            }
            Self::AlreadyAuthenticated => {
                "This connection is already authenticated. Reconnect to authenticate as a different user."
            }
            Self::AuthenticationTimeout => {
                "Authentication took too long to complete. Please try again."
            }

            // Validation errors
            Self::InvalidInput => {
                "The provided input is invalid or malformed. Check your request parameters."
            }
            Self::InvalidCharacter => {
                "The selected character is not recognized or is not available in this room."
            }
            Self::InvalidStage => {
                "The selected stage is not recognized or is not available in this room."
            }
            Self::MessageTooLarge => {
                "The message size exceeds the maximum allowed limit. Please send a smaller message."
            }

            // Queue errors
            Self::AlreadyInQueue => {
                "You are already in the matchmaking queue. Leave the queue before joining again."
            }
            Self::NotInQueue => {
                "You are not currently in the matchmaking queue."
            }
            Self::QueueUnavailable => {
                "Matchmaking is temporarily unavailable. Please try again in a few moments."
            }

            // Room errors
            Self::RoomNotFound => {
                "The requested room could not be found. It may have been closed or the id is incorrect."
            }
            Self::RoomFull => {
                "The room has reached its maximum player capacity. Try joining a different room."
            }
            Self::AlreadyInRoom => {
                "You are already in a room. Leave the current room before joining another."
            }
            Self::NotInRoom => {
                "You are not currently in any room. Join a room before performing this action."
            }
            Self::RoomClosed => {
                "The room has been closed by the server. Join or create a new room."
            }
            Self::InvalidRoomState => {
                "The room is not in a state that allows this operation. Wait for the current phase to finish."
            }
            Self::NotRoomHost => {
                "Only the room host can perform this action."
            }

            // Match errors
            Self::MatchAlreadyStarted => {
                "The match has already started. Selections can no longer be changed."
            }
            Self::MatchNotStarted => {
                "The match has not started yet. This action is only available during play."
            }
            Self::PlayersNotReady => {
                "Not all players are ready. The match cannot start until every player is ready."
            }

            // Rate limiting
            Self::RateLimitExceeded => {
                "Too many requests in a short time. Please slow down and try again later."
            }
            Self::TooManyConnections => {
                "You have too many active connections. Close some connections before opening new ones."
            }

            // Server errors
            Self::InternalError => {
                "An internal server error occurred. Please try again or contact support if the issue persists."
            }
            Self::ServiceUnavailable => {
                "The service is temporarily unavailable. Please try again in a few moments."
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
