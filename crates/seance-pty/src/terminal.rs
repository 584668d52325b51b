use std::io;

use nix::sys::termios::{cfmakeraw, tcgetattr, tcsetattr, SetArg, Termios};
use nix::unistd::isatty;

use crate::session::SessionError;

/// Saved termios of the controlling terminal, restored exactly once.
///
/// Entering raw mode disables line buffering and kernel echo for the whole
/// session; keystroke echo becomes the relay loop's job. Restoration runs on
/// drop, so panics and error returns restore the terminal too.
pub struct RawModeGuard {
    saved: Option<Termios>,
}

impl RawModeGuard {
    /// Switch the controlling terminal's input to raw mode, remembering the
    /// attributes to restore.
    pub fn enter() -> Result<Self, SessionError> {
        let stdin = io::stdin();
        let saved = tcgetattr(&stdin)?;

        let mut raw = saved.clone();
        cfmakeraw(&mut raw);
        tcsetattr(&stdin, SetArg::TCSANOW, &raw)?;

        log::debug!("controlling terminal switched to raw mode");
        Ok(Self { saved: Some(saved) })
    }

    /// Restore the saved attributes now.
    ///
    /// Safe to call more than once; only the first call restores. A stdin
    /// that is no longer a tty is logged as an error and skipped — the
    /// session teardown continues.
    pub fn restore(&mut self) {
        let Some(saved) = self.saved.take() else {
            return;
        };

        let stdin = io::stdin();
        if !isatty(&stdin).unwrap_or(false) {
            log::error!("stdin is not a tty, skipping terminal restore");
            return;
        }

        match tcsetattr(&stdin, SetArg::TCSADRAIN, &saved) {
            Ok(()) => log::info!("terminal attributes restored"),
            Err(err) => log::error!("failed to restore terminal attributes: {err}"),
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        self.restore();
    }
}
