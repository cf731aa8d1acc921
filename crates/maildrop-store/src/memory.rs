//! In-memory maildrop storage.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use maildrop_pop3::{Backend, BackendError, MaildropStat, User};

/// One stored message: a persistent unique id, the full content, and
/// the session-scoped deletion mark.
#[derive(Debug, Clone)]
struct StoredMessage {
    uid: String,
    content: String,
    deleted: bool,
}

impl StoredMessage {
    fn octets(&self) -> u64 {
        self.content.len() as u64
    }
}

/// One user's maildrop.
#[derive(Debug, Default)]
struct Maildrop {
    messages: Vec<StoredMessage>,
    locked: bool,
}

impl Maildrop {
    /// Messages not marked as deleted, with their 1-based numbers.
    fn visible(&self) -> impl Iterator<Item = (usize, &StoredMessage)> {
        self.messages
            .iter()
            .enumerate()
            .filter(|(_, message)| !message.deleted)
            .map(|(index, message)| (index + 1, message))
    }

    fn message(&self, msg_id: usize) -> Option<&StoredMessage> {
        msg_id
            .checked_sub(1)
            .and_then(|index| self.messages.get(index))
    }

    fn visible_message(&self, msg_id: usize) -> Option<&StoredMessage> {
        self.message(msg_id).filter(|message| !message.deleted)
    }
}

/// In-memory [`Backend`]: a map of user name → maildrop behind a
/// mutex.
///
/// Message numbers are positions in the maildrop as loaded; deletion
/// marks hide a message from every read operation without renumbering
/// the rest until [`Backend::commit`] removes the marked messages.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    maildrops: Mutex<HashMap<String, Maildrop>>,
}

impl MemoryBackend {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the user's maildrop if absent.
    pub fn add_user(&self, username: &str) {
        self.with_store(|maildrops| {
            maildrops.entry(username.to_string()).or_default();
        });
    }

    /// Appends a message to the user's maildrop, creating the maildrop
    /// if absent. The unique id must persist across sessions.
    pub fn add_message(&self, username: &str, uid: impl Into<String>, content: impl Into<String>) {
        self.with_store(|maildrops| {
            maildrops
                .entry(username.to_string())
                .or_default()
                .messages
                .push(StoredMessage {
                    uid: uid.into(),
                    content: content.into(),
                    deleted: false,
                });
        });
    }

    fn with_store<T>(&self, f: impl FnOnce(&mut HashMap<String, Maildrop>) -> T) -> T {
        let mut maildrops = self
            .maildrops
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut maildrops)
    }

    fn with_maildrop<T>(
        &self,
        user: &User,
        f: impl FnOnce(&mut Maildrop) -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        self.with_store(|maildrops| {
            let maildrop = maildrops
                .get_mut(user.name())
                .ok_or_else(|| BackendError::UnknownUser(user.name().to_string()))?;
            f(maildrop)
        })
    }
}

impl Backend for MemoryBackend {
    fn stat(&self, user: &User) -> Result<MaildropStat, BackendError> {
        self.with_maildrop(user, |maildrop| {
            let (messages, octets) = maildrop
                .visible()
                .fold((0, 0), |(count, size), (_, message)| {
                    (count + 1, size + message.octets())
                });
            Ok(MaildropStat { messages, octets })
        })
    }

    fn list(&self, user: &User) -> Result<Vec<u64>, BackendError> {
        self.with_maildrop(user, |maildrop| {
            Ok(maildrop
                .visible()
                .map(|(_, message)| message.octets())
                .collect())
        })
    }

    fn list_message(&self, user: &User, msg_id: usize) -> Result<Option<u64>, BackendError> {
        self.with_maildrop(user, |maildrop| {
            Ok(maildrop.visible_message(msg_id).map(StoredMessage::octets))
        })
    }

    fn retr(&self, user: &User, msg_id: usize) -> Result<String, BackendError> {
        self.with_maildrop(user, |maildrop| {
            maildrop
                .visible_message(msg_id)
                .map(|message| message.content.clone())
                .ok_or(BackendError::NoSuchMessage(msg_id))
        })
    }

    fn dele(&self, user: &User, msg_id: usize) -> Result<(), BackendError> {
        self.with_maildrop(user, |maildrop| {
            let index = msg_id
                .checked_sub(1)
                .ok_or(BackendError::NoSuchMessage(msg_id))?;
            let message = maildrop
                .messages
                .get_mut(index)
                .ok_or(BackendError::NoSuchMessage(msg_id))?;
            if message.deleted {
                return Err(BackendError::AlreadyDeleted(msg_id));
            }
            message.deleted = true;
            Ok(())
        })
    }

    fn rset(&self, user: &User) -> Result<(), BackendError> {
        self.with_maildrop(user, |maildrop| {
            for message in &mut maildrop.messages {
                message.deleted = false;
            }
            Ok(())
        })
    }

    fn uidl(&self, user: &User) -> Result<Vec<String>, BackendError> {
        self.with_maildrop(user, |maildrop| {
            Ok(maildrop
                .visible()
                .map(|(_, message)| message.uid.clone())
                .collect())
        })
    }

    fn uidl_message(&self, user: &User, msg_id: usize) -> Result<Option<String>, BackendError> {
        self.with_maildrop(user, |maildrop| {
            Ok(maildrop
                .visible_message(msg_id)
                .map(|message| message.uid.clone()))
        })
    }

    fn top(&self, user: &User, msg_id: usize, n: usize) -> Result<Vec<String>, BackendError> {
        self.with_maildrop(user, |maildrop| {
            let message = maildrop
                .visible_message(msg_id)
                .ok_or(BackendError::NoSuchMessage(msg_id))?;

            let all: Vec<&str> = message
                .content
                .split('\n')
                .map(|line| line.trim_end_matches('\r'))
                .collect();
            // Headers end at the first blank line; a message without
            // one is all headers.
            let body_start = all
                .iter()
                .position(|line| line.is_empty())
                .map_or(all.len(), |blank| blank + 1);

            let mut lines: Vec<String> =
                all[..body_start].iter().map(ToString::to_string).collect();
            lines.extend(
                all[body_start..]
                    .iter()
                    .take(n)
                    .map(ToString::to_string),
            );
            Ok(lines)
        })
    }

    fn commit(&self, user: &User) -> Result<(), BackendError> {
        self.with_maildrop(user, |maildrop| {
            maildrop.messages.retain(|message| !message.deleted);
            Ok(())
        })
    }

    fn lock(&self, user: &User) -> Result<(), BackendError> {
        self.with_maildrop(user, |maildrop| {
            if maildrop.locked {
                return Err(BackendError::Locked);
            }
            maildrop.locked = true;
            debug!(user = %user, "maildrop locked");
            Ok(())
        })
    }

    fn unlock(&self, user: &User) -> Result<(), BackendError> {
        self.with_maildrop(user, |maildrop| {
            maildrop.locked = false;
            debug!(user = %user, "maildrop unlocked");
            Ok(())
        })
    }
}
