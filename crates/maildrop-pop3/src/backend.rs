//! Storage and authorization contracts.
//!
//! The session engine never touches message storage or credentials
//! directly; it drives implementations of [`Backend`] and
//! [`Authorizator`] supplied at session construction. Both traits are
//! synchronous: the session's read loop is its sole suspension point,
//! so contract calls run to completion between reads.
//!
//! Message numbers are 1-based positions in the maildrop, as reported
//! by [`Backend::list`]. Implementations must keep that order stable
//! while a session holds the maildrop lock.

use std::fmt;
use std::sync::Arc;

use crate::connection::Transport;

/// Identity of an authenticated mailbox owner.
///
/// Opaque to the engine: produced by the [`Authorizator`] on successful
/// verification and passed back to every [`Backend`] call as the
/// per-user key. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct User(Arc<str>);

impl User {
    /// Creates an identity from a mailbox name.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// Returns the mailbox name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maildrop statistics as reported by `STAT`.
///
/// Messages marked as deleted are excluded from both totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaildropStat {
    /// Number of messages in the maildrop.
    pub messages: usize,
    /// Total maildrop size in octets.
    pub octets: u64,
}

/// Backend operation errors.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The maildrop is already locked by a live session.
    #[error("maildrop is locked by another session")]
    Locked,

    /// No message exists at the given number.
    #[error("no such message: {0}")]
    NoSuchMessage(usize),

    /// The message is already marked as deleted in this session.
    #[error("message {0} already deleted")]
    AlreadyDeleted(usize),

    /// The identity has no maildrop in this store.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Credential verification errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The username/password pair did not verify.
    ///
    /// Reported to the client as a soft `-ERR`; the session stays in
    /// the AUTHORIZATION state.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The verification service itself failed.
    #[error("authorization unavailable: {0}")]
    Unavailable(String),
}

/// Message store contract, keyed by an authenticated [`User`].
///
/// Deletion is two-phase: [`Backend::dele`] marks a message, and from
/// that point the marked message must be hidden from `stat`, `list`,
/// `retr`, `top` and `uidl`; [`Backend::commit`] applies the marks
/// durably, [`Backend::rset`] discards them.
pub trait Backend: Send + Sync {
    /// Returns message count and total size, excluding deleted messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the maildrop cannot be read.
    fn stat(&self, user: &User) -> Result<MaildropStat, BackendError>;

    /// Returns per-message sizes in octets, in maildrop order.
    ///
    /// # Errors
    ///
    /// Returns an error if the maildrop cannot be read.
    fn list(&self, user: &User) -> Result<Vec<u64>, BackendError>;

    /// Reports the size of one message, or `None` if it does not exist
    /// (or is marked as deleted).
    ///
    /// # Errors
    ///
    /// Returns an error if the maildrop cannot be read.
    fn list_message(&self, user: &User, msg_id: usize) -> Result<Option<u64>, BackendError>;

    /// Retrieves the full content of one message.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NoSuchMessage`] for an unknown or
    /// deleted message.
    fn retr(&self, user: &User, msg_id: usize) -> Result<String, BackendError>;

    /// Marks one message as deleted.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::AlreadyDeleted`] if the message is
    /// already marked, [`BackendError::NoSuchMessage`] if it does not
    /// exist.
    fn dele(&self, user: &User, msg_id: usize) -> Result<(), BackendError>;

    /// Unmarks every message marked as deleted in this session.
    ///
    /// # Errors
    ///
    /// Returns an error if the maildrop cannot be updated.
    fn rset(&self, user: &User) -> Result<(), BackendError>;

    /// Returns per-message unique identifiers, in maildrop order.
    ///
    /// Unique identifiers are 1–70 printable ASCII characters and
    /// persist across sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the maildrop cannot be read.
    fn uidl(&self, user: &User) -> Result<Vec<String>, BackendError>;

    /// Reports the unique identifier of one message, or `None` if it
    /// does not exist (or is marked as deleted).
    ///
    /// # Errors
    ///
    /// Returns an error if the maildrop cannot be read.
    fn uidl_message(&self, user: &User, msg_id: usize) -> Result<Option<String>, BackendError>;

    /// Returns the headers, the blank separator line, and the first `n`
    /// body lines of one message (the entire body if it has fewer than
    /// `n` lines).
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NoSuchMessage`] for an unknown or
    /// deleted message.
    fn top(&self, user: &User, msg_id: usize, n: usize) -> Result<Vec<String>, BackendError>;

    /// Applies all deletion marks durably.
    ///
    /// # Errors
    ///
    /// Returns an error if some marked messages could not be removed.
    fn commit(&self, user: &User) -> Result<(), BackendError>;

    /// Acquires exclusive access to the user's maildrop.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Locked`] if another live session holds
    /// the lock.
    fn lock(&self, user: &User) -> Result<(), BackendError>;

    /// Releases exclusive access to the user's maildrop.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock state cannot be updated.
    fn unlock(&self, user: &User) -> Result<(), BackendError>;
}

/// Credential verification contract.
pub trait Authorizator: Send + Sync {
    /// Verifies a username/password pair, returning the authenticated
    /// identity.
    ///
    /// The transport is provided so implementations may refuse
    /// mechanisms based on the connection's encryption state.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] when the pair does not
    /// verify, [`AuthError::Unavailable`] when verification itself
    /// failed.
    fn authorize(
        &self,
        transport: &Transport,
        username: &str,
        password: &str,
    ) -> Result<User, AuthError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn user_name_accessor() {
        let user = User::new("mrose");
        assert_eq!(user.name(), "mrose");
        assert_eq!(user.to_string(), "mrose");
    }

    #[test]
    fn user_equality() {
        assert_eq!(User::new("a"), User::new("a"));
        assert_ne!(User::new("a"), User::new("b"));
    }
}
