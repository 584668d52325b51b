//! seance-ipc: the one-way snapshot channel between proxy and consumer.
//!
//! Messages are newline-delimited UTF-8 JSON objects, one per completed
//! output segment:
//!
//! ```text
//! { "history": [string, ...],   // chronological, oldest first, length <= 10
//!   "stdout":  string }         // sanitized, length <= 2048
//! ```
//!
//! Direction is proxy -> consumer only; there is no acknowledgement channel.
//!
//! - [`PipePublisher`] — writer side, one flushed line per snapshot.
//! - [`StateMirror`] — reader side, a line loop replacing mirrored state
//!   for downstream readers, stoppable from the reading side.

pub mod mirror;
pub mod publish;

pub use mirror::{MirroredState, StateMirror};
pub use publish::{PipePublisher, SnapshotSink};
