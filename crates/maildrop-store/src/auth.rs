//! Static credential table.

use std::collections::HashMap;

use tracing::debug;

use maildrop_pop3::{AuthError, Authorizator, Transport, User};

/// [`Authorizator`] backed by a fixed username → password table.
#[derive(Debug, Default)]
pub struct MemoryAuthorizator {
    credentials: HashMap<String, String>,
}

impl MemoryAuthorizator {
    /// Creates an empty table (every login fails).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user to the table.
    #[must_use]
    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials.insert(username.into(), password.into());
        self
    }
}

impl Authorizator for MemoryAuthorizator {
    fn authorize(
        &self,
        transport: &Transport,
        username: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        match self.credentials.get(username) {
            Some(stored) if stored == password => {
                debug!(username, secure = transport.is_secure(), "credentials verified");
                Ok(User::new(username))
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}
