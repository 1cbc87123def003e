//! The `/chat` endpoint the concierge client talks to
//!
//! Each message is answered by an OpenAI-compatible completion model,
//! sometimes with a witty persona.

pub mod completion;
pub mod handlers;
pub mod persona;
pub mod server;
pub mod state;

pub use completion::{CompletionBackend, CompletionError, OpenAiCompletion};
pub use persona::{Persona, PersonaPicker};
pub use server::{router, run_server};
pub use state::{AppState, ChatRequest, ChatResponse};
