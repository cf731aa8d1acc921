//! Error types for the POP3 session engine.

use std::io;

use crate::backend::{AuthError, BackendError};

/// Result type alias for POP3 session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// POP3 session engine error types.
///
/// Handlers return these to the session loop. [`Error::Io`] is fatal to
/// the session; every other variant yields a generic `-ERR` reply and
/// the session continues with its state unchanged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error on the client connection.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Command issued in a state where it is not permitted.
    #[error("invalid state")]
    InvalidState,

    /// Wrong number of arguments for a command.
    #[error("invalid arguments count: {0}")]
    InvalidArguments(usize),

    /// Argument failed to parse (message numbers, line counts).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// USER/PASS attempted on an unencrypted transport with insecure
    /// authentication disabled.
    #[error("plaintext authentication not allowed on this connection")]
    AuthNotAllowed,

    /// Backend operation failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Authorizator failure other than bad credentials.
    #[error("authorization error: {0}")]
    Auth(#[from] AuthError),
}

impl Error {
    /// Returns true if this error must terminate the session.
    ///
    /// Transport failures cannot be reported to the client; everything
    /// else is surfaced as a `-ERR` line and the session continues.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
