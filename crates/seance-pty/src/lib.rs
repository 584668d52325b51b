//! seance-pty: PTY session lifecycle and the terminal relay loop.
//!
//! This crate sits between the real terminal and the shell running inside a
//! PTY. It spawns the shell with a marker-bearing prompt, switches the
//! controlling terminal to raw mode for the session's lifetime, and runs a
//! single-threaded poll loop relaying keystrokes and output while driving the
//! capture pipeline from `seance-capture`.
//!
//! # Architecture
//!
//! - [`ShellSession`] — owns the child shell, the pty master, and the
//!   session rc directory.
//! - [`RawModeGuard`] — saved termios of the controlling terminal, restored
//!   exactly once on every exit path.
//! - [`Relay`] + [`relay::run`] — the readiness-multiplexed I/O loop.

pub mod relay;
pub mod session;
pub mod terminal;

pub use relay::{Relay, READ_CHUNK};
pub use session::{SessionError, ShellSession};
pub use terminal::RawModeGuard;
