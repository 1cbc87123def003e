//! In-memory session store

use super::model::{Message, Session, SessionId};
use tracing::debug;

/// Holds every session of the running process plus the active pointer.
///
/// The list is kept newest first. The displayed conversation is never
/// stored separately: [`SessionStore::displayed`] always reads the active
/// session's messages, so the view cannot drift from the store.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Vec<Session>,
    active: Option<SessionId>,
}

impl SessionStore {
    /// Create an empty store with no active session
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session, put it at the top of the list and make it active
    pub fn create_session(&mut self) -> &Session {
        let session = Session::new();
        debug!(session_id = %session.id, "Created session");
        self.active = Some(session.id.clone());
        self.sessions.insert(0, session);
        &self.sessions[0]
    }

    /// Make `id` the active session.
    ///
    /// Unknown ids leave the store untouched and return `false`.
    pub fn select_session(&mut self, id: &SessionId) -> bool {
        if self.get(id).is_none() {
            debug!(session_id = %id, "Ignoring selection of unknown session");
            return false;
        }
        self.active = Some(id.clone());
        true
    }

    /// Replace the messages of the session matching `session_id`.
    ///
    /// Unknown ids are a no-op and return `false`.
    pub fn append_messages(&mut self, session_id: &SessionId, messages: Vec<Message>) -> bool {
        match self.get_mut(session_id) {
            Some(session) => {
                session.messages = messages;
                true
            }
            None => false,
        }
    }

    /// Append a single message to the session matching `session_id`
    pub fn push_message(&mut self, session_id: &SessionId, message: Message) -> bool {
        let Some(current) = self.get(session_id) else {
            return false;
        };
        let mut messages = current.messages.clone();
        messages.push(message);
        self.append_messages(session_id, messages)
    }

    /// All sessions, newest first
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| &s.id == id)
    }

    fn get_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| &s.id == id)
    }

    pub fn active_id(&self) -> Option<&SessionId> {
        self.active.as_ref()
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.active.as_ref().and_then(|id| self.get(id))
    }

    /// Messages of the active session, or nothing when none is active
    pub fn displayed(&self) -> &[Message] {
        self.active_session()
            .map(|s| s.messages.as_slice())
            .unwrap_or(&[])
    }

    /// Position of a session in the newest-first list
    pub fn position(&self, id: &SessionId) -> Option<usize> {
        self.sessions.iter().position(|s| &s.id == id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
