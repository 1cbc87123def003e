//! Conversation controller: the single owner of session state

use concierge_core::session::{Message, SessionId, SessionStore};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::endpoint::ChatEndpoint;
use crate::error::{portal_failure_message, ChatError};

/// Identifies one dispatched request
pub type Ticket = u64;

/// A user message waiting for its reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub ticket: Ticket,
    pub session_id: SessionId,
    pub message: String,
}

/// Owns the [`SessionStore`] and every request made on its behalf.
///
/// Requests are serialized per session: while one is outstanding, later
/// messages for the same session are echoed immediately but their
/// requests wait in a queue. Replies therefore always land in send order.
/// Different sessions do not wait on each other.
///
/// Front ends that must keep drawing while a request runs use the
/// IO-free [`Concierge::submit`] / [`Concierge::complete`] pair and run
/// the network call themselves; everything else can simply await
/// [`Concierge::send_message`].
pub struct Concierge {
    store: SessionStore,
    endpoint: Arc<dyn ChatEndpoint>,
    next_ticket: Ticket,
    in_flight: HashMap<SessionId, Ticket>,
    queued: HashMap<SessionId, VecDeque<PendingRequest>>,
}

impl Concierge {
    pub fn new(endpoint: Arc<dyn ChatEndpoint>) -> Self {
        Self {
            store: SessionStore::new(),
            endpoint,
            next_ticket: 1,
            in_flight: HashMap::new(),
            queued: HashMap::new(),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn endpoint(&self) -> Arc<dyn ChatEndpoint> {
        Arc::clone(&self.endpoint)
    }

    /// Start a new journey and make it active
    pub fn create_session(&mut self) -> SessionId {
        self.store.create_session().id.clone()
    }

    pub fn select_session(&mut self, id: &SessionId) -> bool {
        self.store.select_session(id)
    }

    pub fn append_messages(&mut self, session_id: &SessionId, messages: Vec<Message>) -> bool {
        self.store.append_messages(session_id, messages)
    }

    /// Whether any reply is still outstanding
    pub fn is_loading(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn is_session_loading(&self, session_id: &SessionId) -> bool {
        self.in_flight.contains_key(session_id)
    }

    /// Record a user message and hand back the request to dispatch.
    ///
    /// Returns `None` when there is nothing to dispatch right now: blank
    /// text or an unknown session (no state change at all), or a request
    /// already outstanding for this session (the new one is queued).
    pub fn submit(&mut self, session_id: &SessionId, text: &str) -> Option<PendingRequest> {
        if text.trim().is_empty() {
            return None;
        }
        if !self.store.push_message(session_id, Message::user(text)) {
            warn!(session_id = %session_id, "Dropping message for unknown session");
            return None;
        }

        let request = PendingRequest {
            ticket: self.next_ticket,
            session_id: session_id.clone(),
            message: text.to_string(),
        };
        self.next_ticket += 1;

        if self.in_flight.contains_key(session_id) {
            debug!(session_id = %session_id, ticket = request.ticket, "Queueing request behind outstanding reply");
            self.queued
                .entry(session_id.clone())
                .or_default()
                .push_back(request);
            return None;
        }

        self.in_flight.insert(session_id.clone(), request.ticket);
        Some(request)
    }

    /// Apply the outcome of a dispatched request.
    ///
    /// Appends exactly one assistant message (the reply, or the portal
    /// failure text) and returns the next queued request for the same
    /// session, if any. Completions for tickets that are not outstanding
    /// are ignored.
    pub fn complete(
        &mut self,
        request: PendingRequest,
        outcome: Result<String, ChatError>,
    ) -> Option<PendingRequest> {
        if self.in_flight.get(&request.session_id) != Some(&request.ticket) {
            warn!(ticket = request.ticket, "Ignoring completion for request that is not outstanding");
            return None;
        }

        let text = match outcome {
            Ok(reply) => reply,
            Err(e) => {
                warn!(session_id = %request.session_id, "Chat request failed: {}", e);
                portal_failure_message(&e)
            }
        };
        self.store
            .push_message(&request.session_id, Message::assistant(text));
        self.in_flight.remove(&request.session_id);

        let next = self
            .queued
            .get_mut(&request.session_id)
            .and_then(VecDeque::pop_front);
        if self
            .queued
            .get(&request.session_id)
            .is_some_and(VecDeque::is_empty)
        {
            self.queued.remove(&request.session_id);
        }

        if let Some(next) = &next {
            self.in_flight.insert(next.session_id.clone(), next.ticket);
        }
        next
    }

    /// Send `text` on `session_id` and wait for the reply.
    ///
    /// Never fails: endpoint errors become an assistant message.
    pub async fn send_message(&mut self, session_id: &SessionId, text: &str) {
        let mut next = self.submit(session_id, text);
        while let Some(request) = next {
            info!(session_id = %request.session_id, ticket = request.ticket, "Consulting the time streams");
            let outcome = self.endpoint.send(&request.message).await;
            next = self.complete(request, outcome);
        }
    }
}
