//! Session state types.
//!
//! This module defines the states a POP3 session passes through,
//! following RFC 1939 section 3.

/// Session state as defined by RFC 1939.
///
/// A session moves forward only: `Authorization` → `Transaction` →
/// `Update`. A failed USER or PASS keeps the session in
/// `Authorization`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Waiting for credentials.
    ///
    /// In this state, only these commands are valid:
    /// - USER
    /// - PASS
    /// - QUIT
    /// - CAPA
    #[default]
    Authorization,

    /// Authenticated, maildrop locked and ready.
    ///
    /// In this state, these additional commands are valid:
    /// - STAT
    /// - LIST
    /// - RETR
    /// - DELE
    /// - NOOP
    /// - RSET
    /// - UIDL
    /// - TOP
    Transaction,

    /// Terminal state, entered while processing QUIT from
    /// `Transaction`: deletions are committed and the maildrop lock
    /// released before the connection closes.
    Update,
}

impl SessionState {
    /// Returns `true` if the session has not authenticated yet.
    #[must_use]
    pub const fn is_authorization(self) -> bool {
        matches!(self, Self::Authorization)
    }

    /// Returns `true` if the maildrop is locked and ready.
    #[must_use]
    pub const fn is_transaction(self) -> bool {
        matches!(self, Self::Transaction)
    }
}
