//! seance: a transparent shell proxy that publishes `{history, stdout}`
//! snapshots to a consumer process.
//!
//! The launcher creates a pipe, hands this process the write end's numeric
//! descriptor via `SEANCE_PIPE_FD`, and consumes snapshots on the read end
//! (see `seance_ipc::StateMirror`). Everything the user types and everything
//! the shell prints passes through unmodified; capture and publishing happen
//! on the side.

use std::fs::File;
use std::os::unix::io::FromRawFd;
use std::path::PathBuf;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use seance_capture::{CaptureMachine, MARKER};
use seance_ipc::{PipePublisher, SnapshotSink};
use seance_pty::relay::run as run_relay;
use seance_pty::{RawModeGuard, Relay, SessionError, ShellSession};

/// Environment variable carrying the snapshot pipe's write-end descriptor.
const PIPE_FD_ENV: &str = "SEANCE_PIPE_FD";
/// Environment variable overriding the proxied shell command.
const SHELL_ENV: &str = "SEANCE_SHELL";
/// Environment variable overriding the log file path.
const LOG_ENV: &str = "SEANCE_LOG";

fn main() {
    init_logging();

    let pipe_fd = match std::env::var(PIPE_FD_ENV).ok().and_then(|v| v.parse::<i32>().ok()) {
        Some(fd) if fd >= 0 => fd,
        _ => {
            eprintln!("fatal: {PIPE_FD_ENV} must carry the snapshot pipe's write descriptor");
            std::process::exit(1);
        }
    };
    log::debug!("snapshot pipe descriptor: {pipe_fd}");

    // SAFETY: the launcher opened pipe_fd for writing and transfers sole
    // ownership to this process via the environment.
    let pipe = unsafe { File::from_raw_fd(pipe_fd) };
    let publisher = PipePublisher::new(pipe);

    let shell = std::env::var(SHELL_ENV).ok();
    if let Err(err) = run_session(shell.as_deref(), publisher) {
        log::error!("session failed: {err}");
        eprintln!("seance: {err}");
        std::process::exit(1);
    }
}

/// Spawn the shell, enter raw mode, and relay until the shell exits.
///
/// Teardown order matters: the raw-mode guard restores the terminal before
/// the session drop closes the master and removes the rc directory. Both
/// also run on the error path and on panic, via `Drop`.
fn run_session(shell: Option<&str>, sink: impl SnapshotSink) -> Result<(), SessionError> {
    let mut session = ShellSession::spawn(shell, 80, 24)?;
    let mut guard = RawModeGuard::enter()?;

    let mut relay = Relay::new(CaptureMachine::new(MARKER), sink);
    let result = run_relay(&mut session, &mut relay);

    guard.restore();
    if let Some(code) = session.try_wait() {
        log::info!("shell exited with code {code}");
    }
    result
}

/// File-backed logging: stdout belongs to the shell pass-through, so log
/// records can never go to the terminal.
fn init_logging() {
    let path = std::env::var(LOG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_log_path());

    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let Ok(file) = File::create(&path) else {
        return;
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
    // Route `log` records from the library crates into the subscriber.
    let _ = tracing_log::LogTracer::init();
}

fn default_log_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".seance")
        .join("seance.log")
}
