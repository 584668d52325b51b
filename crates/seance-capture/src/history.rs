use std::collections::VecDeque;

/// Maximum number of commands retained for a snapshot.
pub const HISTORY_LIMIT: usize = 10;

/// Bounded FIFO of submitted command strings, oldest first.
///
/// Pushing into a full ring evicts the oldest entry, so the ring always holds
/// the most recent `HISTORY_LIMIT` submissions in chronological order.
#[derive(Debug, Clone, Default)]
pub struct HistoryRing {
    entries: VecDeque<String>,
}

impl HistoryRing {
    /// Create an empty ring.
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(HISTORY_LIMIT),
        }
    }

    /// Append a command, evicting the oldest entry if the ring is full.
    pub fn push(&mut self, entry: impl Into<String>) {
        if self.entries.len() >= HISTORY_LIMIT {
            self.entries.pop_front();
        }
        self.entries.push_back(entry.into());
    }

    /// Number of retained commands.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no command has been retained yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The retained commands, oldest first, as used verbatim in a snapshot.
    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_under_capacity() {
        let mut ring = HistoryRing::new();
        ring.push("ls");
        ring.push("pwd");

        assert_eq!(ring.len(), 2);
        assert_eq!(ring.to_vec(), vec!["ls", "pwd"]);
    }

    #[test]
    fn test_push_evicts_oldest_at_capacity() {
        let mut ring = HistoryRing::new();
        for i in 0..HISTORY_LIMIT {
            ring.push(format!("cmd{i}"));
        }
        assert_eq!(ring.len(), HISTORY_LIMIT);

        ring.push("newest");
        assert_eq!(ring.len(), HISTORY_LIMIT);
        assert_eq!(ring.to_vec()[0], "cmd1");
        assert_eq!(ring.to_vec()[HISTORY_LIMIT - 1], "newest");
    }

    #[test]
    fn test_retains_last_ten_of_many_in_order() {
        let mut ring = HistoryRing::new();
        for i in 0..37 {
            ring.push(format!("cmd{i}"));
        }

        let expected: Vec<String> = (27..37).map(|i| format!("cmd{i}")).collect();
        assert_eq!(ring.to_vec(), expected);
    }

    #[test]
    fn test_length_is_min_of_pushes_and_capacity() {
        for n in [0usize, 1, 9, 10, 11, 25] {
            let mut ring = HistoryRing::new();
            for i in 0..n {
                ring.push(format!("cmd{i}"));
            }
            assert_eq!(ring.len(), n.min(HISTORY_LIMIT), "after {n} pushes");
        }
    }

    #[test]
    fn test_empty_ring() {
        let ring = HistoryRing::new();
        assert!(ring.is_empty());
        assert!(ring.to_vec().is_empty());
    }
}
