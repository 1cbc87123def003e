//! Chat client for the Time Travel Concierge
//!
//! [`HttpChatEndpoint`] talks to the remote `/chat` endpoint and
//! [`Concierge`] owns the conversation state, turning every send into
//! exactly one user message and one assistant message.

pub mod concierge;
pub mod endpoint;
pub mod error;

pub use concierge::{Concierge, PendingRequest, Ticket};
pub use endpoint::{ChatEndpoint, HttpChatEndpoint};
pub use error::{portal_failure_message, ChatError, PORTAL_FAILURE_PREFIX};
