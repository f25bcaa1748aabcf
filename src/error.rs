//! Error types for SetuPad
//!
//! # Error Recovery Strategies
//!
//! Different error types require different recovery approaches:
//!
//! ## Registration Errors (Caller Decides)
//!
//! - **`ServerFull`**: All four DSU slots are occupied. Register the device
//!   with another server instance or wait for a slot to free up.
//!
//! - **`AlreadyServing`**: The same device handle was registered twice with
//!   one server. Registering a device with two *different* servers is fine.
//!
//! ## Transient Errors (Log and Continue)
//!
//! - **`Io`**: Socket receive/send error. UDP is lossy by contract; the
//!   server logs these as warnings and keeps running. Only the initial bind
//!   surfaces `Io` to the caller.
//!
//! ## Configuration Errors (Fix and Restart)
//!
//! - **`Config`**: Configuration file is invalid. Fix the configuration and
//!   restart.
//!
//! # Protocol Noise
//!
//! Malformed inbound datagrams (bad magic, version, length or CRC) are not
//! errors at all: they are dropped with a debug log, since a UDP port
//! collects stray traffic. See [`crate::protocol::header::ParseError`].

use thiserror::Error;

/// Errors that can occur in SetuPad
///
/// See module-level documentation for recovery strategies.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server full: all {0} slots are occupied")]
    ServerFull(usize),

    #[error("Device is already registered with this server")]
    AlreadyServing,

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
