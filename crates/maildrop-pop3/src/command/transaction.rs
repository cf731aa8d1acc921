//! TRANSACTION-state handlers: STAT, LIST, RETR, DELE, NOOP, RSET,
//! UIDL and TOP.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::backend::{BackendError, User};
use crate::connection::Session;
use crate::error::{Error, Result};
use crate::protocol::SessionState;

/// Parses a 1-based message number argument.
fn message_id(arg: &str) -> Result<usize> {
    arg.parse()
        .map_err(|_| Error::InvalidArgument(arg.to_string()))
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Common precondition: TRANSACTION state, which implies an
    /// authenticated user holding the maildrop lock.
    fn require_transaction(&self) -> Result<User> {
        match (&self.state, &self.user) {
            (SessionState::Transaction, Some(user)) => Ok(user.clone()),
            _ => Err(Error::InvalidState),
        }
    }

    /// STAT: drop listing with message count and total octets.
    pub(crate) async fn stat(&mut self) -> Result<SessionState> {
        let user = self.require_transaction()?;
        let stat = self.backend.stat(&user)?;
        self.write_ok(&format!("{} {}", stat.messages, stat.octets))
            .await?;
        Ok(SessionState::Transaction)
    }

    /// LIST: scan listing for one message, or for the whole maildrop.
    pub(crate) async fn list(&mut self, args: &[String]) -> Result<SessionState> {
        let user = self.require_transaction()?;

        if let Some(arg) = args.first() {
            let msg_id = message_id(arg)?;
            match self.backend.list_message(&user, msg_id)? {
                Some(octets) => self.write_ok(&format!("{msg_id} {octets}")).await?,
                None => self.write_err("no such message").await?,
            }
        } else {
            let octets = self.backend.list(&user)?;
            self.write_ok(&format!("{} messages", octets.len())).await?;
            let listing: Vec<String> = octets
                .iter()
                .enumerate()
                .map(|(i, octets)| format!("{} {octets}", i + 1))
                .collect();
            self.write_multi_line(&listing).await?;
        }

        Ok(SessionState::Transaction)
    }

    /// RETR: full message content as a multi-line block.
    pub(crate) async fn retr(&mut self, args: &[String]) -> Result<SessionState> {
        let user = self.require_transaction()?;
        let arg = args.first().ok_or(Error::InvalidArguments(0))?;
        let msg_id = message_id(arg)?;

        let message = self.backend.retr(&user, msg_id)?;
        self.write_ok("").await?;
        self.write_multi_line(message.split('\n')).await?;
        Ok(SessionState::Transaction)
    }

    /// DELE: marks a message as deleted; the mark is applied at QUIT.
    ///
    /// Deleting a message twice is a soft error; the backend reports
    /// the already-deleted condition distinctly and the session
    /// continues.
    pub(crate) async fn dele(&mut self, args: &[String]) -> Result<SessionState> {
        let user = self.require_transaction()?;
        let arg = args.first().ok_or(Error::InvalidArguments(0))?;
        let msg_id = message_id(arg)?;

        match self.backend.dele(&user, msg_id) {
            Ok(()) => {
                self.write_ok(&format!("Message {msg_id} deleted")).await?;
            }
            Err(BackendError::AlreadyDeleted(id)) => {
                self.write_err(&format!("message {id} already deleted"))
                    .await?;
            }
            Err(err) => return Err(err.into()),
        }
        Ok(SessionState::Transaction)
    }

    /// NOOP: does nothing, successfully.
    pub(crate) async fn noop(&mut self) -> Result<SessionState> {
        self.require_transaction()?;
        self.write_ok("").await?;
        Ok(SessionState::Transaction)
    }

    /// RSET: unmarks every message marked as deleted in this session.
    pub(crate) async fn rset(&mut self) -> Result<SessionState> {
        let user = self.require_transaction()?;
        self.backend.rset(&user)?;
        self.write_ok("").await?;
        Ok(SessionState::Transaction)
    }

    /// UIDL: unique-id listing for one message, or the whole maildrop.
    pub(crate) async fn uidl(&mut self, args: &[String]) -> Result<SessionState> {
        let user = self.require_transaction()?;

        if let Some(arg) = args.first() {
            let msg_id = message_id(arg)?;
            match self.backend.uidl_message(&user, msg_id)? {
                Some(uid) => self.write_ok(&format!("{msg_id} {uid}")).await?,
                None => self.write_err("no such message").await?,
            }
        } else {
            let uids = self.backend.uidl(&user)?;
            self.write_ok(&format!("{} messages", uids.len())).await?;
            let listing: Vec<String> = uids
                .iter()
                .enumerate()
                .map(|(i, uid)| format!("{} {uid}", i + 1))
                .collect();
            self.write_multi_line(&listing).await?;
        }

        Ok(SessionState::Transaction)
    }

    /// TOP: headers plus the first `n` lines of the body.
    pub(crate) async fn top(&mut self, args: &[String]) -> Result<SessionState> {
        let user = self.require_transaction()?;
        if args.len() != 2 {
            return Err(Error::InvalidArguments(args.len()));
        }
        let msg_id = message_id(&args[0])?;
        let lines: usize = args[1]
            .parse()
            .map_err(|_| Error::InvalidArgument(args[1].clone()))?;

        let content = self.backend.top(&user, msg_id, lines)?;
        self.write_ok("").await?;
        self.write_multi_line(&content).await?;
        Ok(SessionState::Transaction)
    }
}
