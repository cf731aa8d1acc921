//! AUTHORIZATION-state handlers: USER and PASS.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::Verb;
use crate::backend::AuthError;
use crate::connection::Session;
use crate::error::{Error, Result};
use crate::protocol::SessionState;

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// USER: stores the mailbox name for the PASS that must follow.
    ///
    /// The reply is a tentative accept either way; mailbox existence
    /// is never revealed at this point (RFC 1939 section 13 guidance).
    pub(crate) async fn user(&mut self, args: &[String]) -> Result<SessionState> {
        if !self.state.is_authorization() {
            return Err(Error::InvalidState);
        }
        if !self.auth_allowed() {
            return Err(Error::AuthNotAllowed);
        }
        if args.len() != 1 {
            return Err(Error::InvalidArguments(args.len()));
        }

        self.pending_username = Some(args[0].clone());
        self.write_ok("").await?;
        Ok(SessionState::Authorization)
    }

    /// PASS: verifies credentials and locks the maildrop.
    ///
    /// Only valid immediately after USER; the stored username is taken
    /// (cleared) on every attempt, successful or not. Bad credentials
    /// are a soft failure: the session stays in AUTHORIZATION and the
    /// client may retry with a fresh USER.
    pub(crate) async fn pass(&mut self, args: &[String]) -> Result<SessionState> {
        if !self.state.is_authorization() {
            return Err(Error::InvalidState);
        }
        if !self.auth_allowed() {
            return Err(Error::AuthNotAllowed);
        }
        if self.last_command != Some(Verb::User) {
            self.write_err("PASS can be executed only directly after USER command")
                .await?;
            return Ok(SessionState::Authorization);
        }
        if args.len() != 1 {
            return Err(Error::InvalidArguments(args.len()));
        }

        let Some(username) = self.pending_username.take() else {
            self.write_err("PASS can be executed only directly after USER command")
                .await?;
            return Ok(SessionState::Authorization);
        };

        match self
            .authorizator
            .authorize(&self.transport, &username, &args[0])
        {
            Ok(user) => {
                self.backend.lock(&user)?;
                info!(user = %user, "user logged in");
                self.user = Some(user);
                self.write_ok("User Successfully Logged on").await?;
                Ok(SessionState::Transaction)
            }
            Err(AuthError::InvalidCredentials) => {
                debug!(username, "authentication failed");
                self.write_err("Invalid username or password").await?;
                Ok(SessionState::Authorization)
            }
            Err(err) => Err(err.into()),
        }
    }
}
