//! Command registry and dispatch.
//!
//! The registry maps uppercase verb strings to [`Verb`] variants; it is
//! built once and shared read-only by every session, so dispatch is a
//! plain lookup with no locking. Each verb's handler validates the
//! session state first, talks to the backend, writes its reply, and
//! returns the next session state; the session loop applies it.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::connection::Session;
use crate::error::{Error, Result};
use crate::protocol::SessionState;

mod authorization;
mod transaction;

/// Capabilities announced by CAPA (RFC 2449).
const CAPABILITIES: &[&str] = &["USER", "UIDL", "TOP", "IMPLEMENTATION maildrop"];

/// The twelve POP3 command verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// End the session, committing deletions from TRANSACTION.
    Quit,
    /// Name the mailbox to open.
    User,
    /// Authenticate and lock the maildrop.
    Pass,
    /// Drop listing: message count and total octets.
    Stat,
    /// Scan listing: per-message sizes.
    List,
    /// Retrieve a full message.
    Retr,
    /// Mark a message as deleted.
    Dele,
    /// Do nothing, successfully.
    Noop,
    /// Unmark all deletions made in this session.
    Rset,
    /// Unique-id listing.
    Uidl,
    /// Announce server capabilities (RFC 2449).
    Capa,
    /// Headers plus the first lines of a message body.
    Top,
}

impl Verb {
    /// Returns the wire name of the verb.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quit => "QUIT",
            Self::User => "USER",
            Self::Pass => "PASS",
            Self::Stat => "STAT",
            Self::List => "LIST",
            Self::Retr => "RETR",
            Self::Dele => "DELE",
            Self::Noop => "NOOP",
            Self::Rset => "RSET",
            Self::Uidl => "UIDL",
            Self::Capa => "CAPA",
            Self::Top => "TOP",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The verb → handler mapping, constructed once per process.
#[derive(Debug)]
pub struct Registry {
    commands: HashMap<&'static str, Verb>,
}

static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

impl Registry {
    fn new() -> Self {
        let mut commands = HashMap::new();
        for verb in [
            Verb::Quit,
            Verb::User,
            Verb::Pass,
            Verb::Stat,
            Verb::List,
            Verb::Retr,
            Verb::Dele,
            Verb::Noop,
            Verb::Rset,
            Verb::Uidl,
            Verb::Capa,
            Verb::Top,
        ] {
            commands.insert(verb.as_str(), verb);
        }
        Self { commands }
    }

    /// Returns the process-wide registry shared by all sessions.
    #[must_use]
    pub fn shared() -> &'static Self {
        &REGISTRY
    }

    /// Looks up an uppercase verb string. `None` means unknown command
    /// (an empty verb always fails the lookup).
    #[must_use]
    pub fn lookup(&self, verb: &str) -> Option<Verb> {
        self.commands.get(verb).copied()
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Invokes the handler for `verb`, returning the next session
    /// state. The caller applies the state and records the verb as the
    /// last executed command only on success.
    pub(crate) async fn execute(&mut self, verb: Verb, args: &[String]) -> Result<SessionState> {
        match verb {
            Verb::Quit => self.quit().await,
            Verb::User => self.user(args).await,
            Verb::Pass => self.pass(args).await,
            Verb::Stat => self.stat().await,
            Verb::List => self.list(args).await,
            Verb::Retr => self.retr(args).await,
            Verb::Dele => self.dele(args).await,
            Verb::Noop => self.noop().await,
            Verb::Rset => self.rset().await,
            Verb::Uidl => self.uidl(args).await,
            Verb::Capa => self.capa().await,
            Verb::Top => self.top(args).await,
        }
    }

    /// QUIT: valid in any state.
    ///
    /// From TRANSACTION the session enters UPDATE: deletions are
    /// committed, then the maildrop is unlocked. The unlock is
    /// attempted even when the commit failed, and the session's user is
    /// taken first so teardown never unlocks twice. The connection
    /// closes regardless of the outcome.
    async fn quit(&mut self) -> Result<SessionState> {
        self.alive = false;
        let mut next = self.state;

        if self.state.is_transaction() {
            next = SessionState::Update;
            let user = self.user.take().ok_or(Error::InvalidState)?;
            let committed = self.backend.commit(&user);
            let unlocked = self.backend.unlock(&user);
            committed?;
            unlocked?;
        }

        self.write_ok("Goodbye").await?;
        Ok(next)
    }

    /// CAPA: valid in any state; the capability list is static.
    async fn capa(&mut self) -> Result<SessionState> {
        self.write_ok("Capability list follows").await?;
        self.write_multi_line(CAPABILITIES).await?;
        Ok(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_every_verb() {
        let registry = Registry::shared();
        for name in [
            "QUIT", "USER", "PASS", "STAT", "LIST", "RETR", "DELE", "NOOP", "RSET", "UIDL",
            "CAPA", "TOP",
        ] {
            let verb = registry.lookup(name);
            assert_eq!(verb.map(Verb::as_str), Some(name));
        }
    }

    #[test]
    fn registry_rejects_unknown_and_empty() {
        let registry = Registry::shared();
        assert_eq!(registry.lookup("FOO"), None);
        assert_eq!(registry.lookup(""), None);
        // Lookup is exact: the parser uppercases before dispatch.
        assert_eq!(registry.lookup("quit"), None);
    }
}
