//! seance-capture: output segmentation, sanitization, and command history.
//!
//! This crate holds the pure state of the proxy — no descriptors, no I/O.
//! The relay loop in `seance-pty` feeds it keystrokes and raw output chunks;
//! it decides when an output segment closes and what the published
//! [`Snapshot`] looks like.
//!
//! # Architecture
//!
//! - [`HistoryRing`] — bounded FIFO of submitted commands.
//! - [`sanitize_output`] — raw shell output bytes to a cleaned display string.
//! - [`CaptureMachine`] — segment boundary detection driving both of the above.
//! - [`Snapshot`] — the `{history, stdout}` value published per segment.

pub mod capture;
pub mod history;
pub mod sanitize;
pub mod snapshot;

pub use capture::CaptureMachine;
pub use history::{HistoryRing, HISTORY_LIMIT};
pub use sanitize::{sanitize_output, OUTPUT_LIMIT};
pub use snapshot::Snapshot;

/// Sentinel embedded in the shell prompt via the session rc file.
///
/// Segment boundaries are detected by a raw substring search for this token
/// in the output stream. If a command happens to echo the token itself, a
/// spurious boundary is produced; this is a known limitation of prompt-based
/// framing.
pub const MARKER: &str = "(seance)";
