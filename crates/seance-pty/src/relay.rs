use std::io::{self, Write};
use std::os::unix::io::{AsRawFd, BorrowedFd, RawFd};

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::unistd;

use seance_capture::CaptureMachine;
use seance_ipc::SnapshotSink;

use crate::session::{SessionError, ShellSession};

/// Read size for pty master output.
pub const READ_CHUNK: usize = 1024;

const CR: u8 = b'\r';
const BACKSPACE: u8 = 0x08;
const DEL: u8 = 0x7f;
const ERASE_SEQ: &[u8] = b"\x08 \x08";

/// Keystroke and output handling between the real terminal and the shell.
///
/// Owns the input buffer, the capture machine, and the snapshot sink. The
/// descriptors stay outside so the handling logic can be driven from the
/// poll loop or from tests.
pub struct Relay<S: SnapshotSink> {
    capture: CaptureMachine,
    input: String,
    sink: S,
}

impl<S: SnapshotSink> Relay<S> {
    pub fn new(capture: CaptureMachine, sink: S) -> Self {
        Self {
            capture,
            input: String::new(),
            sink,
        }
    }

    /// Handle one chunk read from the pty master.
    ///
    /// The chunk is forwarded byte-for-byte to the real terminal first,
    /// unconditionally — pass-through does not depend on capture state.
    /// Capture processing runs after, publishing a snapshot if the chunk
    /// closed a segment.
    pub fn on_shell_output(&mut self, chunk: &[u8], term_out: &mut impl Write) -> io::Result<()> {
        term_out.write_all(chunk)?;
        term_out.flush()?;

        if let Some(snapshot) = self.capture.observe(chunk) {
            self.sink.publish(&snapshot)?;
        }
        Ok(())
    }

    /// Handle a single byte read from the real terminal's input.
    ///
    /// Raw mode disables kernel echo, so every printable byte is echoed to
    /// the shell by the relay itself.
    pub fn on_keystroke(&mut self, byte: u8, master_in: &mut impl Write) -> io::Result<()> {
        match byte {
            CR => {
                master_in.write_all(b"\n")?;
                log::debug!("submitting command: {:?}", self.input);
                self.capture.submit(&self.input);
                self.input.clear();
            }
            BACKSPACE | DEL => {
                if self.input.pop().is_some() {
                    master_in.write_all(ERASE_SEQ)?;
                }
                // Empty buffer: nothing is sent to the shell.
            }
            other => {
                // The buffer is decoded byte-at-a-time, so a byte outside
                // ASCII cannot be mapped to its character; it is recorded as
                // U+FFFD while passing through to the shell unchanged.
                if other.is_ascii() {
                    self.input.push(other as char);
                } else {
                    self.input.push(char::REPLACEMENT_CHARACTER);
                }
                master_in.write_all(&[other])?;
            }
        }
        master_in.flush()
    }

    /// Characters accumulated since the last submission.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// True strictly between a submission and the next boundary.
    pub fn is_capturing(&self) -> bool {
        self.capture.is_capturing()
    }
}

/// Drive the relay until the shell exits.
///
/// A single-threaded poll loop over exactly two descriptors — the real
/// terminal's stdin and the pty master — blocking indefinitely until either
/// is readable. EOF (or `EIO`, the pty-close errno) on the master means the
/// shell exited; EOF on stdin means the terminal is gone. Any other error
/// surfaces to the caller's teardown.
pub fn run<S: SnapshotSink>(
    session: &mut ShellSession,
    relay: &mut Relay<S>,
) -> Result<(), SessionError> {
    let master_raw = session.master_fd().ok_or_else(|| {
        SessionError::SpawnFailed("pty master exposes no file descriptor".to_string())
    })?;
    let stdin_raw = io::stdin().as_raw_fd();
    let stdout_raw = io::stdout().as_raw_fd();

    let mut master_in = FdWriter(master_raw);
    let mut term_out = FdWriter(stdout_raw);
    let mut buf = [0u8; READ_CHUNK];

    loop {
        // SAFETY: master_raw lives as long as `session`, stdin_raw as long
        // as the process; both borrows end before the next loop turn.
        let master_fd = unsafe { BorrowedFd::borrow_raw(master_raw) };
        let stdin_fd = unsafe { BorrowedFd::borrow_raw(stdin_raw) };
        let mut poll_fds = [
            PollFd::new(master_fd, PollFlags::POLLIN),
            PollFd::new(stdin_fd, PollFlags::POLLIN),
        ];

        match poll(&mut poll_fds, PollTimeout::NONE) {
            Ok(_) => {}
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(errno.into()),
        }

        let master_revents = poll_fds[0].revents().unwrap_or(PollFlags::empty());
        let stdin_revents = poll_fds[1].revents().unwrap_or(PollFlags::empty());

        if master_revents.contains(PollFlags::POLLIN) {
            match read_fd(master_raw, &mut buf) {
                Ok(0) => {
                    log::info!("shell session ended");
                    return Ok(());
                }
                Ok(n) => relay.on_shell_output(&buf[..n], &mut term_out)?,
                Err(Errno::EINTR) | Err(Errno::EAGAIN) => {}
                Err(Errno::EIO) => {
                    // Linux reports pty closure as EIO on the master.
                    log::info!("shell session ended");
                    return Ok(());
                }
                Err(errno) => return Err(errno.into()),
            }
        } else if master_revents.contains(PollFlags::POLLHUP) {
            log::info!("pty master hung up");
            return Ok(());
        }

        if stdin_revents.contains(PollFlags::POLLIN) {
            let mut byte = [0u8; 1];
            match read_fd(stdin_raw, &mut byte) {
                Ok(0) => {
                    log::info!("stdin closed, ending session");
                    return Ok(());
                }
                Ok(_) => relay.on_keystroke(byte[0], &mut master_in)?,
                Err(Errno::EINTR) | Err(Errno::EAGAIN) => {}
                Err(errno) => return Err(errno.into()),
            }
        }
    }
}

fn read_fd(fd: RawFd, buf: &mut [u8]) -> Result<usize, Errno> {
    // SAFETY: fd is open for the duration of the relay loop.
    unistd::read(unsafe { BorrowedFd::borrow_raw(fd) }, buf)
}

/// `Write` over a borrowed raw descriptor.
struct FdWriter(RawFd);

impl Write for FdWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        loop {
            // SAFETY: the descriptor outlives the relay loop that owns this writer.
            match unistd::write(unsafe { BorrowedFd::borrow_raw(self.0) }, buf) {
                Ok(n) => return Ok(n),
                Err(Errno::EINTR) => continue,
                Err(errno) => return Err(errno.into()),
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
