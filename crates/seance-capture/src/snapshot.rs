use serde::{Deserialize, Serialize};

/// The `{history, stdout}` value published once per completed output segment.
///
/// Field order matches the wire schema: `history` is chronological, oldest
/// first, at most [`crate::HISTORY_LIMIT`] entries; `stdout` is the sanitized
/// segment, at most [`crate::OUTPUT_LIMIT`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub history: Vec<String>,
    pub stdout: String,
}
