//! Integration tests for the POP3 session engine.
//!
//! These tests drive full sessions over a mock stream that scripts the
//! client's side of the conversation and captures everything the
//! server writes, without requiring a real connection.

use std::collections::HashSet;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use maildrop_pop3::{
    AuthError, Authorizator, Backend, BackendError, MaildropStat, Session, SessionConfig,
    Transport, User,
};

/// Mock stream that feeds scripted input and captures output.
struct MockStream {
    /// Client lines to feed (in order).
    input: Cursor<Vec<u8>>,
    /// Captured server output, shared with the test.
    sent: Arc<Mutex<Vec<u8>>>,
    /// When true, the stream stays open (pending) after the script is
    /// exhausted instead of signalling end-of-stream.
    hold_open: bool,
}

impl MockStream {
    fn new(input: &str) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let stream = Self {
            input: Cursor::new(input.as_bytes().to_vec()),
            sent: sent.clone(),
            hold_open: false,
        };
        (stream, sent)
    }

    fn held_open(input: &str) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let (mut stream, sent) = Self::new(input);
        stream.hold_open = true;
        (stream, sent)
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let data = self.input.get_ref();
        let pos = usize::try_from(self.input.position()).unwrap();

        if pos >= data.len() {
            if self.hold_open {
                // Idle client: let the session's read timeout fire.
                return Poll::Pending;
            }
            return Poll::Ready(Ok(()));
        }

        let remaining = &data[pos..];
        let to_read = remaining.len().min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.input.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Fixture backend: five messages of ten octets each, with real
/// deletion marks and lock/unlock/commit counters.
#[derive(Default)]
struct FixtureBackend {
    deleted: Mutex<HashSet<usize>>,
    locks: AtomicUsize,
    unlocks: AtomicUsize,
    commits: AtomicUsize,
    fail_lock: bool,
}

impl FixtureBackend {
    const MESSAGES: usize = 5;
    const OCTETS: u64 = 10;
    const CONTENT: &'static str = "Subject: test\r\n\r\nthis is dummy message";

    fn failing_lock() -> Self {
        Self {
            fail_lock: true,
            ..Self::default()
        }
    }

    fn exists(&self, msg_id: usize) -> bool {
        (1..=Self::MESSAGES).contains(&msg_id) && !self.deleted.lock().unwrap().contains(&msg_id)
    }

    fn visible(&self) -> Vec<usize> {
        (1..=Self::MESSAGES)
            .filter(|id| !self.deleted.lock().unwrap().contains(id))
            .collect()
    }
}

impl Backend for FixtureBackend {
    fn stat(&self, _user: &User) -> Result<MaildropStat, BackendError> {
        let visible = self.visible().len();
        Ok(MaildropStat {
            messages: visible,
            octets: visible as u64 * Self::OCTETS,
        })
    }

    fn list(&self, _user: &User) -> Result<Vec<u64>, BackendError> {
        Ok(self.visible().iter().map(|_| Self::OCTETS).collect())
    }

    fn list_message(&self, _user: &User, msg_id: usize) -> Result<Option<u64>, BackendError> {
        Ok(self.exists(msg_id).then_some(Self::OCTETS))
    }

    fn retr(&self, _user: &User, msg_id: usize) -> Result<String, BackendError> {
        if !self.exists(msg_id) {
            return Err(BackendError::NoSuchMessage(msg_id));
        }
        Ok(Self::CONTENT.to_string())
    }

    fn dele(&self, _user: &User, msg_id: usize) -> Result<(), BackendError> {
        if !(1..=Self::MESSAGES).contains(&msg_id) {
            return Err(BackendError::NoSuchMessage(msg_id));
        }
        if !self.deleted.lock().unwrap().insert(msg_id) {
            return Err(BackendError::AlreadyDeleted(msg_id));
        }
        Ok(())
    }

    fn rset(&self, _user: &User) -> Result<(), BackendError> {
        self.deleted.lock().unwrap().clear();
        Ok(())
    }

    fn uidl(&self, _user: &User) -> Result<Vec<String>, BackendError> {
        Ok(self.visible().iter().map(ToString::to_string).collect())
    }

    fn uidl_message(&self, _user: &User, msg_id: usize) -> Result<Option<String>, BackendError> {
        Ok(self.exists(msg_id).then(|| msg_id.to_string()))
    }

    fn top(&self, _user: &User, msg_id: usize, n: usize) -> Result<Vec<String>, BackendError> {
        if !self.exists(msg_id) {
            return Err(BackendError::NoSuchMessage(msg_id));
        }
        let mut lines = vec!["Subject: test".to_string(), String::new()];
        lines.extend(
            ["this is dummy message"]
                .iter()
                .take(n)
                .map(ToString::to_string),
        );
        Ok(lines)
    }

    fn commit(&self, _user: &User) -> Result<(), BackendError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn lock(&self, _user: &User) -> Result<(), BackendError> {
        if self.fail_lock {
            return Err(BackendError::Locked);
        }
        self.locks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unlock(&self, _user: &User) -> Result<(), BackendError> {
        self.unlocks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Fixture authorizator: accepts bob/secret only.
struct FixtureAuthorizator;

impl Authorizator for FixtureAuthorizator {
    fn authorize(
        &self,
        _transport: &Transport,
        username: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        if username == "bob" && password == "secret" {
            Ok(User::new(username))
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

fn session_over(stream: MockStream, backend: Arc<FixtureBackend>) -> Session<MockStream> {
    Session::new(
        stream,
        Transport::new(false, None),
        backend,
        Arc::new(FixtureAuthorizator),
        SessionConfig::new().allow_insecure_auth(true),
    )
}

/// Runs a scripted session to completion and returns the output.
async fn run_script(input: &str, backend: Arc<FixtureBackend>) -> String {
    let (stream, sent) = MockStream::new(input);
    session_over(stream, backend).run().await.unwrap();
    let sent = sent.lock().unwrap();
    String::from_utf8(sent.clone()).unwrap()
}

const GREETING: &str = "+OK maildrop POP3 server ready\r\n";

#[tokio::test]
async fn full_session_flow() {
    let backend = Arc::new(FixtureBackend::default());
    let output = run_script(
        "STAT\r\nUSER bob\r\nPASS secret\r\nSTAT\r\nQUIT\r\n",
        backend.clone(),
    )
    .await;

    let expected = format!(
        "{GREETING}\
         -ERR Error executing command STAT\r\n\
         +OK\r\n\
         +OK User Successfully Logged on\r\n\
         +OK 5 50\r\n\
         +OK Goodbye\r\n"
    );
    assert_eq!(output, expected);
    assert_eq!(backend.locks.load(Ordering::SeqCst), 1);
    assert_eq!(backend.commits.load(Ordering::SeqCst), 1);
    assert_eq!(backend.unlocks.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_command_keeps_session_open() {
    let backend = Arc::new(FixtureBackend::default());
    let output = run_script("FOO\r\nQUIT\r\n", backend).await;

    let expected = format!(
        "{GREETING}\
         -ERR Invalid command FOO\r\n\
         +OK Goodbye\r\n"
    );
    assert_eq!(output, expected);
}

#[tokio::test]
async fn pass_without_user_is_rejected() {
    let backend = Arc::new(FixtureBackend::default());
    let output = run_script("PASS secret\r\nQUIT\r\n", backend.clone()).await;

    assert!(output.contains("-ERR PASS can be executed only directly after USER command\r\n"));
    assert_eq!(backend.locks.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn pass_after_failed_pass_never_authenticates() {
    let backend = Arc::new(FixtureBackend::default());
    let output = run_script(
        "USER bob\r\nPASS wrong\r\nPASS secret\r\nQUIT\r\n",
        backend.clone(),
    )
    .await;

    let expected = format!(
        "{GREETING}\
         +OK\r\n\
         -ERR Invalid username or password\r\n\
         -ERR PASS can be executed only directly after USER command\r\n\
         +OK Goodbye\r\n"
    );
    assert_eq!(output, expected);
    assert_eq!(backend.locks.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn transaction_commands_rejected_before_authentication() {
    let backend = Arc::new(FixtureBackend::default());
    let output = run_script(
        "STAT\r\nLIST\r\nRETR 1\r\nDELE 1\r\nNOOP\r\nRSET\r\nUIDL\r\nTOP 1 1\r\nQUIT\r\n",
        backend,
    )
    .await;

    for verb in ["STAT", "LIST", "RETR", "DELE", "NOOP", "RSET", "UIDL", "TOP"] {
        assert!(
            output.contains(&format!("-ERR Error executing command {verb}\r\n")),
            "expected invalid-state error for {verb}, got: {output}"
        );
    }
}

#[tokio::test]
async fn user_rejected_in_transaction_state() {
    let backend = Arc::new(FixtureBackend::default());
    let output = run_script("USER bob\r\nPASS secret\r\nUSER bob\r\nQUIT\r\n", backend).await;

    assert!(output.contains("-ERR Error executing command USER\r\n"));
}

#[tokio::test]
async fn list_all_messages() {
    let backend = Arc::new(FixtureBackend::default());
    let output = run_script("USER bob\r\nPASS secret\r\nLIST\r\nQUIT\r\n", backend).await;

    assert!(
        output.contains("+OK 5 messages\r\n1 10\r\n2 10\r\n3 10\r\n4 10\r\n5 10\r\n.\r\n"),
        "unexpected scan listing: {output}"
    );
}

#[tokio::test]
async fn list_nonexistent_message_is_soft_error() {
    let backend = Arc::new(FixtureBackend::default());
    let output = run_script(
        "USER bob\r\nPASS secret\r\nLIST 99\r\nSTAT\r\nQUIT\r\n",
        backend,
    )
    .await;

    assert!(output.contains("-ERR no such message\r\n"));
    // The session stays usable after the soft error.
    assert!(output.contains("+OK 5 50\r\n"));
    assert!(output.contains("+OK Goodbye\r\n"));
}

#[tokio::test]
async fn list_malformed_argument_is_handler_error() {
    let backend = Arc::new(FixtureBackend::default());
    let output = run_script("USER bob\r\nPASS secret\r\nLIST abc\r\nQUIT\r\n", backend).await;

    assert!(output.contains("-ERR Error executing command LIST\r\n"));
}

#[tokio::test]
async fn retr_streams_message_with_terminator() {
    let backend = Arc::new(FixtureBackend::default());
    let output = run_script("USER bob\r\nPASS secret\r\nRETR 1\r\nQUIT\r\n", backend).await;

    assert!(output.contains("+OK\r\nSubject: test\r\n\r\nthis is dummy message\r\n.\r\n"));
}

#[tokio::test]
async fn retr_unknown_message_is_handler_error() {
    let backend = Arc::new(FixtureBackend::default());
    let output = run_script("USER bob\r\nPASS secret\r\nRETR 99\r\nQUIT\r\n", backend).await;

    assert!(output.contains("-ERR Error executing command RETR\r\n"));
}

#[tokio::test]
async fn dele_and_rset_restore_pre_deletion_view() {
    let backend = Arc::new(FixtureBackend::default());
    let output = run_script(
        "USER bob\r\nPASS secret\r\nDELE 1\r\nSTAT\r\nDELE 1\r\nRSET\r\nSTAT\r\nQUIT\r\n",
        backend,
    )
    .await;

    let expected = format!(
        "{GREETING}\
         +OK\r\n\
         +OK User Successfully Logged on\r\n\
         +OK Message 1 deleted\r\n\
         +OK 4 40\r\n\
         -ERR message 1 already deleted\r\n\
         +OK\r\n\
         +OK 5 50\r\n\
         +OK Goodbye\r\n"
    );
    assert_eq!(output, expected);
}

#[tokio::test]
async fn uidl_lists_unique_ids() {
    let backend = Arc::new(FixtureBackend::default());
    let output = run_script(
        "USER bob\r\nPASS secret\r\nUIDL\r\nUIDL 3\r\nQUIT\r\n",
        backend,
    )
    .await;

    assert!(output.contains("+OK 5 messages\r\n1 1\r\n2 2\r\n3 3\r\n4 4\r\n5 5\r\n.\r\n"));
    assert!(output.contains("+OK 3 3\r\n"));
}

#[tokio::test]
async fn top_returns_headers_and_partial_body() {
    let backend = Arc::new(FixtureBackend::default());
    let output = run_script(
        "USER bob\r\nPASS secret\r\nTOP 1 1\r\nTOP 1\r\nQUIT\r\n",
        backend,
    )
    .await;

    assert!(output.contains("+OK\r\nSubject: test\r\n\r\nthis is dummy message\r\n.\r\n"));
    // Wrong argument count is a handler error.
    assert!(output.contains("-ERR Error executing command TOP\r\n"));
}

#[tokio::test]
async fn capa_announces_capabilities_in_any_state() {
    let backend = Arc::new(FixtureBackend::default());
    let output = run_script("CAPA\r\nQUIT\r\n", backend).await;

    assert!(output.contains(
        "+OK Capability list follows\r\nUSER\r\nUIDL\r\nTOP\r\nIMPLEMENTATION maildrop\r\n.\r\n"
    ));
}

#[tokio::test]
async fn insecure_auth_disallowed_rejects_user() {
    let backend = Arc::new(FixtureBackend::default());
    let (stream, sent) = MockStream::new("USER bob\r\nQUIT\r\n");
    let session = Session::new(
        stream,
        Transport::new(false, None),
        backend,
        Arc::new(FixtureAuthorizator),
        SessionConfig::new(),
    );
    session.run().await.unwrap();

    let output = String::from_utf8(sent.lock().unwrap().clone()).unwrap();
    assert!(output.contains("-ERR Error executing command USER\r\n"));
}

#[tokio::test]
async fn lock_failure_keeps_authorization_state() {
    let backend = Arc::new(FixtureBackend::failing_lock());
    let output = run_script(
        "USER bob\r\nPASS secret\r\nSTAT\r\nQUIT\r\n",
        backend.clone(),
    )
    .await;

    assert!(output.contains("-ERR Error executing command PASS\r\n"));
    // Still in AUTHORIZATION: STAT stays invalid.
    assert!(output.contains("-ERR Error executing command STAT\r\n"));
    assert_eq!(backend.unlocks.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn quit_before_authentication_skips_backend() {
    let backend = Arc::new(FixtureBackend::default());
    let output = run_script("QUIT\r\n", backend.clone()).await;

    assert_eq!(output, format!("{GREETING}+OK Goodbye\r\n"));
    assert_eq!(backend.commits.load(Ordering::SeqCst), 0);
    assert_eq!(backend.unlocks.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn end_of_stream_unlocks_maildrop() {
    let backend = Arc::new(FixtureBackend::default());
    run_script("USER bob\r\nPASS secret\r\n", backend.clone()).await;

    assert_eq!(backend.locks.load(Ordering::SeqCst), 1);
    assert_eq!(backend.unlocks.load(Ordering::SeqCst), 1);
    assert_eq!(backend.commits.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn idle_timeout_unlocks_maildrop() {
    let backend = Arc::new(FixtureBackend::default());
    let (stream, sent) = MockStream::held_open("USER bob\r\nPASS secret\r\n");
    let session = session_over(stream, backend.clone());

    session.run().await.unwrap();

    let output = String::from_utf8(sent.lock().unwrap().clone()).unwrap();
    assert!(output.contains("+OK User Successfully Logged on\r\n"));
    assert_eq!(backend.locks.load(Ordering::SeqCst), 1);
    assert_eq!(backend.unlocks.load(Ordering::SeqCst), 1);
    assert_eq!(backend.commits.load(Ordering::SeqCst), 0);
}
