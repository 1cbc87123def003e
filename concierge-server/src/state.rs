use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::completion::CompletionBackend;
use crate::persona::PersonaPicker;

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn CompletionBackend>,
    pub personas: PersonaPicker,
}

impl AppState {
    pub fn new(backend: Arc<dyn CompletionBackend>, personas: PersonaPicker) -> Self {
        Self { backend, personas }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    pub reply: String,
}
