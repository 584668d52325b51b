use std::io::{self, Write};

use seance_capture::Snapshot;

/// Seam between the capture pipeline and whatever carries snapshots
/// downstream. Invoked once per completed output segment.
pub trait SnapshotSink {
    fn publish(&mut self, snapshot: &Snapshot) -> io::Result<()>;
}

/// Writes each snapshot as one newline-terminated JSON line and flushes
/// immediately, so the consumer observes it promptly.
pub struct PipePublisher<W: Write> {
    writer: W,
}

impl<W: Write> PipePublisher<W> {
    /// Wrap the write end of the snapshot channel.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> SnapshotSink for PipePublisher<W> {
    fn publish(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        let line = serde_json::to_string(snapshot)?;
        log::debug!("publishing snapshot line: {line}");
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        Snapshot {
            history: vec!["ls".into(), "pwd".into()],
            stdout: "done".into(),
        }
    }

    #[test]
    fn test_publishes_exact_wire_line() {
        let mut publisher = PipePublisher::new(Vec::new());
        publisher.publish(&sample()).unwrap();

        assert_eq!(
            publisher.writer,
            b"{\"history\":[\"ls\",\"pwd\"],\"stdout\":\"done\"}\n"
        );
    }

    #[test]
    fn test_wire_line_round_trips() {
        let mut publisher = PipePublisher::new(Vec::new());
        publisher.publish(&sample()).unwrap();

        let line = String::from_utf8(publisher.writer.clone()).unwrap();
        let parsed: Snapshot = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_one_line_per_snapshot() {
        let mut publisher = PipePublisher::new(Vec::new());
        publisher.publish(&sample()).unwrap();
        publisher
            .publish(&Snapshot {
                history: vec![],
                stdout: String::new(),
            })
            .unwrap();

        let text = String::from_utf8(publisher.writer.clone()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.ends_with('\n'));
    }
}
