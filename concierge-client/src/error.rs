//! Chat endpoint errors and their user-visible rendering

use reqwest::StatusCode;
use thiserror::Error;

/// Leading text of every synthetic failure message
pub const PORTAL_FAILURE_PREFIX: &str = "⚠️ Time portal connection failed.";

const NO_RESPONSE_DETAIL: &str = "no response from the time portal";
const UNREADABLE_REPLY_DETAIL: &str = "unreadable reply";

/// Error type for chat endpoint calls
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// The request never produced a response (DNS, connect, reset, ...)
    #[error("Transport error: {0}")]
    Transport(String),

    /// A response arrived but was not a usable reply
    #[error("Server error (HTTP {status}): {}", .detail.as_deref().unwrap_or("no detail"))]
    Server {
        status: u16,
        /// Diagnostic text supplied by the server, if any
        detail: Option<String>,
    },
}

impl ChatError {
    /// Text shown in parentheses after the failure prefix
    pub fn detail(&self) -> String {
        match self {
            ChatError::Transport(_) => NO_RESPONSE_DETAIL.to_string(),
            ChatError::Server {
                detail: Some(detail),
                ..
            } => detail.clone(),
            ChatError::Server { status, .. } => {
                match StatusCode::from_u16(*status) {
                    Ok(code) if code.is_success() => UNREADABLE_REPLY_DETAIL.to_string(),
                    _ => format!("HTTP {}", status),
                }
            }
        }
    }
}

/// Build the assistant message that stands in for a failed reply
pub fn portal_failure_message(err: &ChatError) -> String {
    format!("{} ({})", PORTAL_FAILURE_PREFIX, err.detail())
}
