//! Connection-quality metrics and error history.
//!
//! [`LatencyTracker`] turns protocol-level ping/pong probes into a latency /
//! packet-loss estimate and a coarse [`ConnectionQuality`] bucket.
//! [`ErrorTracker`] keeps a bounded append-only history of [`ErrorRecord`]s
//! for UI feedback and telemetry.
//!
//! Both are purely observational: nothing in this module initiates
//! connection state transitions.

use std::collections::VecDeque;
use std::time::{Duration, Instant, SystemTime};

use serde::Serialize;

use crate::error_codes::ErrorCode;

/// Number of RTT samples in the moving-average window.
const LATENCY_WINDOW: usize = 10;

/// Probe counters are halved once this many pings have been recorded, so the
/// loss estimate tracks recent conditions instead of the whole session.
const LOSS_DECAY_INTERVAL: u32 = 16;

/// A probe is counted lost once this many newer probes are outstanding.
const MAX_OUTSTANDING_PROBES: usize = 2;

/// Maximum number of retained error records; oldest evicted first.
pub const ERROR_HISTORY_LIMIT: usize = 10;

// ── Quality ─────────────────────────────────────────────────────────

/// Coarse connection-quality bucket derived from latency and loss samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionQuality {
    #[default]
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ConnectionQuality {
    /// Bucket for an average latency in milliseconds.
    fn from_latency(avg_ms: f64) -> Self {
        if avg_ms < 60.0 {
            Self::Excellent
        } else if avg_ms < 120.0 {
            Self::Good
        } else if avg_ms < 250.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    /// Bucket for a packet-loss fraction in `[0.0, 1.0]`.
    fn from_loss(loss: f64) -> Self {
        if loss < 0.02 {
            Self::Excellent
        } else if loss < 0.05 {
            Self::Good
        } else if loss < 0.10 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

/// Snapshot of the connection's measured health.
///
/// Read-only outside the metrics tracker; recomputed on every probe sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectionMetrics {
    /// Most recent round-trip time, in milliseconds.
    pub latency_ms: f64,
    /// Estimated packet-loss fraction in `[0.0, 1.0]`.
    pub packet_loss: f64,
    /// Quality bucket: the worse of the latency bucket and the loss bucket.
    pub quality: ConnectionQuality,
    /// When the most recent probe was sent.
    pub last_ping_time: Option<Instant>,
    /// Moving average of the last [`LATENCY_WINDOW`] RTT samples, in milliseconds.
    pub average_latency_ms: f64,
}

/// Tracks ping/pong round trips and derives [`ConnectionMetrics`].
///
/// The transport loop is the single writer: it records a ping when the probe
/// is sent and a pong when the reply arrives. On an ordered channel a pong
/// always answers the oldest outstanding ping.
#[derive(Debug, Default)]
pub struct LatencyTracker {
    samples: VecDeque<f64>,
    outstanding: VecDeque<Instant>,
    pings_sent: u32,
    pongs_received: u32,
    metrics: ConnectionMetrics,
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current metrics snapshot.
    pub fn metrics(&self) -> ConnectionMetrics {
        self.metrics
    }

    /// Record that a probe ping was sent at `at`.
    pub fn record_ping_sent(&mut self, at: Instant) {
        self.outstanding.push_back(at);
        self.pings_sent += 1;
        self.metrics.last_ping_time = Some(at);

        // A probe with several newer probes behind it is not coming back.
        while self.outstanding.len() > MAX_OUTSTANDING_PROBES {
            self.outstanding.pop_front();
        }

        if self.pings_sent >= LOSS_DECAY_INTERVAL {
            self.pings_sent /= 2;
            self.pongs_received /= 2;
        }

        self.recompute();
    }

    /// Record that a probe reply arrived at `at`.
    ///
    /// A pong with no outstanding ping (e.g. one that raced a reconnect) is
    /// ignored.
    pub fn record_pong(&mut self, at: Instant) {
        let Some(sent) = self.outstanding.pop_front() else {
            return;
        };
        self.pongs_received += 1;

        let rtt_ms = duration_ms(at.saturating_duration_since(sent));
        self.samples.push_back(rtt_ms);
        while self.samples.len() > LATENCY_WINDOW {
            self.samples.pop_front();
        }

        self.metrics.latency_ms = rtt_ms;
        self.recompute();
    }

    /// Reset all probe state, e.g. after a reconnect.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn recompute(&mut self) {
        if !self.samples.is_empty() {
            self.metrics.average_latency_ms =
                self.samples.iter().sum::<f64>() / self.samples.len() as f64;
        }

        self.metrics.packet_loss = if self.pings_sent == 0 {
            0.0
        } else {
            let lost = self.pings_sent.saturating_sub(self.pongs_received)
                // Probes still in flight are undecided, not lost.
                .saturating_sub(self.outstanding.len() as u32);
            f64::from(lost) / f64::from(self.pings_sent)
        };

        self.metrics.quality = ConnectionQuality::from_latency(self.metrics.average_latency_ms)
            .max(ConnectionQuality::from_loss(self.metrics.packet_loss));
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

// ── Errors ──────────────────────────────────────────────────────────

/// Classification of a recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Transport-level failures and connect timeouts.
    Connection,
    /// Handshake rejection or timeout.
    Authentication,
    /// Inconsistent room events; non-fatal.
    Room,
    /// Gameplay-layer faults, opaque to the connection core.
    Game,
}

/// A single recorded failure. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    /// Structured code, when the server supplied one.
    pub code: Option<ErrorCode>,
    pub at: SystemTime,
    /// Critical errors force or accompany a state transition; non-critical
    /// ones are recorded for observability only.
    pub critical: bool,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>, critical: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            at: SystemTime::now(),
            critical,
        }
    }

    /// Attach a structured server error code.
    #[must_use]
    pub fn with_code(mut self, code: Option<ErrorCode>) -> Self {
        self.code = code;
        self
    }
}

/// Bounded append-only error history.
///
/// Holds at most [`ERROR_HISTORY_LIMIT`] records; the oldest is evicted
/// first. The newest record is always available via [`last`](Self::last),
/// so presentation layers can show a reconnect affordance immediately.
#[derive(Debug, Default)]
pub struct ErrorTracker {
    history: VecDeque<ErrorRecord>,
}

impl ErrorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, evicting the oldest entry once the cap is reached.
    pub fn record(&mut self, record: ErrorRecord) {
        tracing::debug!(
            kind = ?record.kind,
            critical = record.critical,
            message = %record.message,
            "error recorded"
        );
        self.history.push_back(record);
        while self.history.len() > ERROR_HISTORY_LIMIT {
            self.history.pop_front();
        }
    }

    /// The most recent record, if any.
    pub fn last(&self) -> Option<&ErrorRecord> {
        self.history.back()
    }

    /// All retained records, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Drop the entire history.
    pub fn clear(&mut self) {
        self.history.clear();
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn quality_from_low_latency_low_loss_is_excellent() {
        let mut tracker = LatencyTracker::new();
        let t0 = Instant::now();
        tracker.record_ping_sent(t0);
        tracker.record_pong(t0 + Duration::from_millis(20));
        let m = tracker.metrics();
        assert_eq!(m.quality, ConnectionQuality::Excellent);
        assert!(m.average_latency_ms >= 19.0 && m.average_latency_ms <= 21.0);
    }

    #[test]
    fn quality_steps_down_with_latency() {
        let mut tracker = LatencyTracker::new();
        let t0 = Instant::now();
        tracker.record_ping_sent(t0);
        tracker.record_pong(t0 + Duration::from_millis(300));
        assert_eq!(tracker.metrics().quality, ConnectionQuality::Poor);
    }

    #[test]
    fn quality_takes_worse_of_latency_and_loss() {
        let mut tracker = LatencyTracker::new();
        let mut now = Instant::now();

        // Fast replies, but most probes go unanswered.
        for i in 0..8 {
            tracker.record_ping_sent(now);
            if i == 0 {
                tracker.record_pong(now + Duration::from_millis(10));
            }
            now += Duration::from_secs(1);
        }

        let m = tracker.metrics();
        assert!(m.packet_loss > 0.10, "loss was {}", m.packet_loss);
        assert_eq!(m.quality, ConnectionQuality::Poor);
    }

    #[test]
    fn average_latency_is_windowed_mean() {
        let mut tracker = LatencyTracker::new();
        let mut now = Instant::now();
        for rtt in [10u64, 20, 30] {
            tracker.record_ping_sent(now);
            tracker.record_pong(now + Duration::from_millis(rtt));
            now += Duration::from_secs(1);
        }
        let avg = tracker.metrics().average_latency_ms;
        assert!((avg - 20.0).abs() < 0.5, "avg was {avg}");
    }

    #[test]
    fn unanswered_probes_in_flight_are_not_lost() {
        let mut tracker = LatencyTracker::new();
        tracker.record_ping_sent(Instant::now());
        // One outstanding probe, no reply yet: undecided, not lost.
        assert_eq!(tracker.metrics().packet_loss, 0.0);
    }

    #[test]
    fn stray_pong_is_ignored() {
        let mut tracker = LatencyTracker::new();
        tracker.record_pong(Instant::now());
        let m = tracker.metrics();
        assert_eq!(m.latency_ms, 0.0);
        assert_eq!(m.packet_loss, 0.0);
    }

    #[test]
    fn reset_clears_probe_state() {
        let mut tracker = LatencyTracker::new();
        let t0 = Instant::now();
        tracker.record_ping_sent(t0);
        tracker.record_pong(t0 + Duration::from_millis(100));
        tracker.reset();
        let m = tracker.metrics();
        assert_eq!(m.average_latency_ms, 0.0);
        assert!(m.last_ping_time.is_none());
    }

    #[test]
    fn error_history_caps_at_limit() {
        let mut tracker = ErrorTracker::new();
        for i in 0..12 {
            tracker.record(ErrorRecord::new(
                ErrorKind::Connection,
                format!("error {i}"),
                false,
            ));
        }
        assert_eq!(tracker.len(), ERROR_HISTORY_LIMIT);
        // Oldest two evicted; newest is the 12th.
        assert_eq!(tracker.last().unwrap().message, "error 11");
        assert_eq!(tracker.history().next().unwrap().message, "error 2");
    }

    #[test]
    fn clear_empties_history_and_last() {
        let mut tracker = ErrorTracker::new();
        tracker.record(ErrorRecord::new(ErrorKind::Room, "oops", false));
        assert!(tracker.last().is_some());
        tracker.clear();
        assert!(tracker.last().is_none());
        assert!(tracker.is_empty());
    }

    #[test]
    fn record_with_code_keeps_code() {
        let record = ErrorRecord::new(ErrorKind::Authentication, "bad token", true)
            .with_code(Some(ErrorCode::InvalidToken));
        assert_eq!(record.code, Some(ErrorCode::InvalidToken));
        assert!(record.critical);
    }
}
