use std::io;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use std::os::unix::io::{AsFd, OwnedFd};

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::unistd;

use seance_capture::Snapshot;

/// Latest mirrored `{history, stdout}`, replaced wholesale on each good line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirroredState {
    pub history: Vec<String>,
    pub stdout: String,
}

/// Consumer side of the snapshot channel.
///
/// Runs a dedicated thread reading the channel's read end line by line.
/// Each well-formed line replaces the mirrored state atomically; a
/// malformed line is logged and discarded, never fatal. End-of-stream ends
/// the loop.
///
/// The loop waits on the channel and an internal wake pipe together, so
/// [`StateMirror::stop`] can interrupt a pending read even while the
/// producer is alive: it wakes the loop, which closes the reading side on
/// exit, then joins.
pub struct StateMirror {
    state: Arc<Mutex<MirroredState>>,
    stop_tx: Option<OwnedFd>,
    handle: Option<JoinHandle<()>>,
}

impl StateMirror {
    /// Start mirroring from the read end of the snapshot channel.
    pub fn from_fd(channel: OwnedFd) -> io::Result<Self> {
        let (stop_rx, stop_tx) = unistd::pipe()?;
        let state = Arc::new(Mutex::new(MirroredState::default()));

        let thread_state = Arc::clone(&state);
        let handle = thread::Builder::new()
            .name("snapshot-mirror".to_string())
            .spawn(move || read_loop(channel, stop_rx, thread_state))
            .expect("failed to spawn mirror thread");

        Ok(Self {
            state,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Clone of the latest mirrored state, for downstream readers polled at
    /// arbitrary times.
    pub fn state(&self) -> MirroredState {
        match self.state.lock() {
            Ok(state) => state.clone(),
            Err(_) => MirroredState::default(), // Poisoned lock
        }
    }

    /// Close the channel from the reading side and wait for the loop to exit.
    ///
    /// Dropping the wake pipe's write end makes its read end report hangup,
    /// so a loop blocked waiting for the producer returns promptly; the
    /// channel descriptor is dropped as the loop exits.
    pub fn stop(&mut self) {
        self.stop_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StateMirror {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_loop(channel: OwnedFd, stop_rx: OwnedFd, state: Arc<Mutex<MirroredState>>) {
    log::info!("snapshot mirror loop started");

    let mut buf = [0u8; 4096];
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let mut poll_fds = [
            PollFd::new(channel.as_fd(), PollFlags::POLLIN),
            PollFd::new(stop_rx.as_fd(), PollFlags::POLLIN),
        ];

        match poll(&mut poll_fds, PollTimeout::NONE) {
            Ok(_) => {}
            Err(Errno::EINTR) => continue,
            Err(errno) => {
                log::error!("snapshot channel poll failed: {errno}");
                break;
            }
        }

        let channel_revents = poll_fds[0].revents().unwrap_or(PollFlags::empty());
        let stop_revents = poll_fds[1].revents().unwrap_or(PollFlags::empty());

        if channel_revents.intersects(PollFlags::POLLIN | PollFlags::POLLHUP) {
            match unistd::read(channel.as_fd(), &mut buf) {
                Ok(0) => break, // EOF, producer closed its end
                Ok(n) => {
                    pending.extend_from_slice(&buf[..n]);
                    drain_lines(&mut pending, &state);
                }
                Err(Errno::EINTR) | Err(Errno::EAGAIN) => {}
                Err(errno) => {
                    log::error!("snapshot channel read failed: {errno}");
                    break;
                }
            }
            continue;
        }

        if !stop_revents.is_empty() {
            log::info!("snapshot mirror stop requested");
            break;
        }
    }

    // A final unterminated line still applies.
    if !pending.is_empty() {
        apply_line(&pending, &state);
    }
    log::info!("snapshot mirror loop exiting");
    // `channel` drops here, closing the reading side.
}

/// Apply every complete line buffered so far, leaving any partial tail.
fn drain_lines(pending: &mut Vec<u8>, state: &Mutex<MirroredState>) {
    while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = pending.drain(..=pos).collect();
        apply_line(&line[..pos], state);
    }
}

fn apply_line(line: &[u8], state: &Mutex<MirroredState>) {
    match serde_json::from_slice::<Snapshot>(line) {
        Ok(snapshot) => {
            log::debug!(
                "mirroring snapshot: {} history entries, {} output chars",
                snapshot.history.len(),
                snapshot.stdout.chars().count()
            );
            if let Ok(mut mirrored) = state.lock() {
                *mirrored = MirroredState {
                    history: snapshot.history,
                    stdout: snapshot.stdout,
                };
            }
        }
        Err(err) => {
            log::error!("discarding malformed snapshot line: {err}");
        }
    }
}
