//! # maildrop-pop3
//!
//! A production-quality POP3 server library implementing RFC 1939 with
//! the RFC 2449 capability (CAPA) extension.
//!
//! ## Features
//!
//! - **Per-connection session engine**: one [`Session`] per accepted
//!   stream, driving the AUTHORIZATION → TRANSACTION → UPDATE state
//!   machine from greeting to termination
//! - **Full command set**: USER, PASS, STAT, LIST, RETR, DELE, NOOP,
//!   RSET, UIDL, TOP, CAPA, QUIT
//! - **Pluggable storage**: message stores implement the [`Backend`]
//!   trait; credential verification implements [`Authorizator`]
//! - **Transport agnostic**: sessions are generic over any
//!   `AsyncRead + AsyncWrite` stream, plain TCP or TLS
//! - **Maildrop locking**: exclusive per-user access acquired on login
//!   and released on QUIT or connection loss, even on error paths
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use maildrop_pop3::{Session, SessionConfig, Transport};
//!
//! #[tokio::main]
//! async fn main() -> maildrop_pop3::Result<()> {
//!     let backend = Arc::new(MyBackend::new());
//!     let authorizator = Arc::new(MyAuthorizator::new());
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:110").await?;
//!     loop {
//!         let (stream, peer) = listener.accept().await?;
//!         let session = Session::new(
//!             stream,
//!             Transport::new(false, Some(peer)),
//!             backend.clone(),
//!             authorizator.clone(),
//!             SessionConfig::default(),
//!         );
//!         tokio::spawn(session.run());
//!     }
//! }
//! ```
//!
//! ## Session States
//!
//! ```text
//! ┌───────────────┐
//! │ AUTHORIZATION │ ─── USER + PASS ───→ TRANSACTION
//! └───────────────┘
//!         │                                   │
//!         └────────── QUIT ───────────────────┤
//!                                             ▼
//!                                          UPDATE
//! ```
//!
//! ## Modules
//!
//! - [`backend`]: storage and authorization contracts
//! - [`command`]: command registry and per-verb handlers
//! - [`connection`]: session state machine and read loop
//! - [`protocol`]: wire parsing and response formatting

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod command;
pub mod connection;
mod error;
pub mod protocol;

pub use backend::{AuthError, Authorizator, Backend, BackendError, MaildropStat, User};
pub use command::{Registry, Verb};
pub use connection::{Session, SessionConfig, Transport};
pub use error::{Error, Result};
pub use protocol::{Request, SessionState};

/// POP3 protocol version supported.
pub const POP3_VERSION: &str = "POP3 (RFC 1939)";
