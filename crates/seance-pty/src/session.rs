use std::fs;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tempfile::TempDir;

use seance_capture::MARKER;

/// Errors from session and relay operations.
#[derive(Debug)]
pub enum SessionError {
    SpawnFailed(String),
    IoError(std::io::Error),
    Sys(nix::errno::Errno),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::SpawnFailed(msg) => write!(f, "shell spawn failed: {msg}"),
            SessionError::IoError(err) => write!(f, "session I/O error: {err}"),
            SessionError::Sys(errno) => write!(f, "system call failed: {errno}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::IoError(err)
    }
}

impl From<nix::errno::Errno> for SessionError {
    fn from(errno: nix::errno::Errno) -> Self {
        SessionError::Sys(errno)
    }
}

/// Owns the child shell, the pty master, and the session rc directory.
///
/// The rc directory (and with it the prompt override) is removed when the
/// session is dropped; the master descriptor closes with it.
pub struct ShellSession {
    master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
    rc_dir: TempDir,
}

impl ShellSession {
    /// Spawn the shell attached to a fresh PTY pair.
    ///
    /// If `shell` is `None`, `zsh` is launched as an interactive login shell
    /// with `ZDOTDIR` pointing at a temporary directory whose `.zshrc` copies
    /// the user's own rc file and appends the prompt-marker override.
    pub fn spawn(shell: Option<&str>, cols: u16, rows: u16) -> Result<Self, SessionError> {
        let rc_dir = write_session_rc()?;

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| SessionError::SpawnFailed(format!("failed to open PTY: {e}")))?;

        // An explicit override is launched bare; the default is an
        // interactive zsh login shell so the prompt override applies.
        let mut cmd = match shell {
            Some(s) => CommandBuilder::new(s),
            None => {
                let mut cmd = CommandBuilder::new("zsh");
                cmd.args(["--login", "-i"]);
                cmd
            }
        };
        cmd.env("ZDOTDIR", rc_dir.path());

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| SessionError::SpawnFailed(format!("failed to spawn shell: {e}")))?;

        // Only the child holds the subordinate side.
        drop(pair.slave);

        log::info!("started a new shell session");
        Ok(Self {
            master: pair.master,
            child,
            rc_dir,
        })
    }

    /// Raw descriptor of the pty master, for the poll loop.
    pub fn master_fd(&self) -> Option<RawFd> {
        self.master.as_raw_fd()
    }

    /// Path of the session rc directory handed to the shell via `ZDOTDIR`.
    pub fn rc_dir(&self) -> &Path {
        self.rc_dir.path()
    }

    /// Exit code of the shell, if it has exited.
    pub fn try_wait(&mut self) -> Option<u32> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.exit_code()),
            _ => None,
        }
    }

    /// Check if the shell is still running.
    pub fn is_alive(&mut self) -> bool {
        self.try_wait().is_none()
    }
}

/// Create the session rc directory: the user's `.zshrc` (when readable) plus
/// the prompt override embedding the boundary marker.
fn write_session_rc() -> Result<TempDir, SessionError> {
    let dir = tempfile::Builder::new()
        .prefix("seance-rc-")
        .tempdir()?;

    let mut content = match user_zshrc().map(fs::read_to_string) {
        Some(Ok(content)) => content,
        Some(Err(err)) => {
            log::warn!("could not read user .zshrc, starting from empty: {err}");
            String::new()
        }
        None => {
            log::warn!("HOME is not set, starting from an empty rc");
            String::new()
        }
    };

    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(&format!("export PS1=\"{MARKER} $PS1\"\n"));

    fs::write(dir.path().join(".zshrc"), content)?;
    Ok(dir)
}

fn user_zshrc() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".zshrc"))
}
