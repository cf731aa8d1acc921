//! The per-connection session state machine.
//!
//! One [`Session`] is created per accepted connection and owns the
//! stream for its lifetime. It sends the greeting, then loops: read one
//! line, parse it, look the verb up in the command registry, invoke the
//! handler, apply the state the handler returns. The read is the only
//! suspension point; handlers run to completion before the next line is
//! read, so no cross-session synchronization happens inside the
//! engine; exclusive maildrop access is entirely the backend lock's
//! job.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{SessionConfig, Transport};
use crate::backend::{Authorizator, Backend, User};
use crate::command::{Registry, Verb};
use crate::error::Result;
use crate::protocol::{Request, SessionState, response};

/// A POP3 session over one accepted byte stream.
///
/// Generic over the stream so the same engine drives plain TCP, TLS,
/// and in-memory test transports.
pub struct Session<S> {
    pub(crate) stream: BufReader<S>,
    pub(crate) transport: Transport,
    pub(crate) config: SessionConfig,
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) authorizator: Arc<dyn Authorizator>,
    pub(crate) state: SessionState,
    pub(crate) pending_username: Option<String>,
    pub(crate) user: Option<User>,
    pub(crate) last_command: Option<Verb>,
    pub(crate) alive: bool,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a session for an accepted connection.
    #[must_use]
    pub fn new(
        stream: S,
        transport: Transport,
        backend: Arc<dyn Backend>,
        authorizator: Arc<dyn Authorizator>,
        config: SessionConfig,
    ) -> Self {
        Self {
            stream: BufReader::new(stream),
            transport,
            config,
            backend,
            authorizator,
            state: SessionState::default(),
            pending_username: None,
            user: None,
            last_command: None,
            alive: false,
        }
    }

    /// Drives the session from greeting to termination.
    ///
    /// Returns when QUIT has been executed, the peer closed the
    /// connection, the idle timeout expired, or the transport failed.
    /// If a user is still authenticated on any of those paths, the
    /// maildrop is unlocked best-effort before returning.
    ///
    /// # Errors
    ///
    /// Returns an error only for transport failures; protocol and
    /// backend errors are reported to the client in-band and the
    /// session continues.
    pub async fn run(mut self) -> Result<()> {
        let result = self.serve().await;
        self.release_maildrop();
        result
    }

    async fn serve(&mut self) -> Result<()> {
        self.alive = true;
        let greeting = response::ok(&self.config.greeting);
        self.write_line(&greeting).await?;

        while self.alive {
            let line = match timeout(self.config.idle_timeout, self.read_line()).await {
                Ok(Ok(Some(line))) => line,
                Ok(Ok(None)) => {
                    debug!("connection closed by client");
                    return Ok(());
                }
                Ok(Err(err)) => {
                    debug!(%err, "error reading input");
                    return Err(err.into());
                }
                Err(_) => {
                    debug!("session timed out waiting for input");
                    return Ok(());
                }
            };

            let request = Request::parse(&line);
            let Some(verb) = Registry::shared().lookup(request.verb()) else {
                debug!(verb = request.verb(), "invalid command");
                self.write_line(&response::err(&format!(
                    "Invalid command {}",
                    request.verb()
                )))
                .await?;
                continue;
            };

            match self.execute(verb, request.args()).await {
                Ok(next) => {
                    self.last_command = Some(verb);
                    self.state = next;
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    debug!(%verb, %err, "error executing command");
                    self.write_line(&response::err(&format!("Error executing command {verb}")))
                        .await?;
                }
            }
        }

        Ok(())
    }

    /// Reads one newline-terminated line, or `None` at end of stream.
    async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        let read = self.stream.read_line(&mut line).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }

    /// Best-effort unlock on teardown. A no-op once QUIT has released
    /// the maildrop, so the lock is never released twice.
    fn release_maildrop(&mut self) {
        if let Some(user) = self.user.take() {
            debug!(user = %user, "unlocking maildrop on session teardown");
            if let Err(err) = self.backend.unlock(&user) {
                warn!(user = %user, %err, "failed to unlock maildrop");
            }
        }
    }

    /// Whether USER/PASS may run on this connection, evaluated per
    /// invocation: plaintext credentials need either an encrypted
    /// transport or explicit configuration.
    pub(crate) fn auth_allowed(&self) -> bool {
        self.config.allow_insecure_auth || self.transport.is_secure()
    }

    pub(crate) async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        self.stream.get_mut().write_all(line.as_bytes()).await?;
        self.stream.get_mut().flush().await
    }

    pub(crate) async fn write_ok(&mut self, text: &str) -> std::io::Result<()> {
        let line = response::ok(text);
        self.write_line(&line).await
    }

    pub(crate) async fn write_err(&mut self, text: &str) -> std::io::Result<()> {
        let line = response::err(text);
        self.write_line(&line).await
    }

    pub(crate) async fn write_multi_line<I, T>(&mut self, lines: I) -> std::io::Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let block = response::multi_line(lines);
        self.write_line(&block).await
    }
}
