//! Wire DTOs for the WebSocket event contract and the HTTP surface.

use time::OffsetDateTime;

/// Health endpoint payloads.
pub mod health;
/// Party-session snapshots and action payloads.
pub mod party;
/// Room, question, and leaderboard snapshots.
pub mod room;
/// Validation helpers for inbound payloads.
pub mod validation;
/// Inbound and outbound WebSocket messages.
pub mod ws;

/// Timestamps cross the wire as unix milliseconds.
pub(crate) fn unix_ms(time: OffsetDateTime) -> i64 {
    (time.unix_timestamp_nanos() / 1_000_000) as i64
}
