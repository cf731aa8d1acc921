//! Listener and per-connection session spawning.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

use maildrop_pop3::{Authorizator, Backend, Session, SessionConfig, Transport};

use crate::config::ServerConfig;
use crate::tls;

/// Accepts connections and runs one POP3 session task per connection.
pub struct Server {
    config: ServerConfig,
    backend: Arc<dyn Backend>,
    authorizator: Arc<dyn Authorizator>,
    acceptor: Option<TlsAcceptor>,
}

impl Server {
    /// Wires a server from configuration and store implementations,
    /// building the TLS acceptor when configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS material cannot be loaded.
    pub fn new(
        config: ServerConfig,
        backend: Arc<dyn Backend>,
        authorizator: Arc<dyn Authorizator>,
    ) -> anyhow::Result<Self> {
        let acceptor = config.tls.as_ref().map(tls::acceptor).transpose()?;
        Ok(Self {
            config,
            backend,
            authorizator,
            acceptor,
        })
    }

    /// Binds the listener and accepts connections until the process is
    /// stopped. Accept failures are logged and do not stop the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the listen address cannot be bound.
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.config.listen)
            .await
            .with_context(|| format!("binding {}", self.config.listen))?;
        info!(
            listen = %self.config.listen,
            tls = self.acceptor.is_some(),
            "POP3 server listening"
        );

        loop {
            let (stream, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!(%err, "could not accept connection");
                    continue;
                }
            };
            debug!(%peer, "connection accepted");

            let session_config = SessionConfig::new()
                .greeting(self.config.greeting.clone())
                .allow_insecure_auth(self.config.allow_insecure_auth)
                .idle_timeout(self.config.idle_timeout());
            let backend = self.backend.clone();
            let authorizator = self.authorizator.clone();
            let acceptor = self.acceptor.clone();

            tokio::spawn(async move {
                if let Err(err) =
                    handle_connection(stream, peer, acceptor, backend, authorizator, session_config)
                        .await
                {
                    debug!(%peer, %err, "session ended with error");
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: std::net::SocketAddr,
    acceptor: Option<TlsAcceptor>,
    backend: Arc<dyn Backend>,
    authorizator: Arc<dyn Authorizator>,
    config: SessionConfig,
) -> maildrop_pop3::Result<()> {
    if let Some(acceptor) = acceptor {
        let tls_stream = acceptor.accept(stream).await?;
        let transport = Transport::new(true, Some(peer));
        Session::new(tls_stream, transport, backend, authorizator, config)
            .run()
            .await
    } else {
        let transport = Transport::new(false, Some(peer));
        Session::new(stream, transport, backend, authorizator, config)
            .run()
            .await
    }
}
