//! Timed playback: lanes, the loop policy, listeners and the player state machine.

/// Frame index and loop-count bookkeeping.
pub mod cursor;
/// Single-threaded executors shared round-robin between sessions.
pub mod lanes;
/// Render notifications.
pub mod listener;
/// The playback session.
pub mod player;
