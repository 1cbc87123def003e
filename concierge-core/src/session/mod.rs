//! Session management for conversation history
//!
//! Sessions live in memory only and vanish with the process.

pub mod model;
pub mod store;

pub use model::{Message, Role, Session, SessionId, DEFAULT_SESSION_TITLE};
pub use store::SessionStore;
