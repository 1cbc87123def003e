use axum::{extract::State, http::StatusCode, Json};

use crate::state::{AppState, ChatRequest, ChatResponse};

/// `POST /chat`: one message in, one reply out.
///
/// Every failure is answered with 500 and `{"reply": "Error: ..."}` so the
/// client can show what went wrong.
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> (StatusCode, Json<ChatResponse>) {
    let Some(message) = payload.message.filter(|m| !m.trim().is_empty()) else {
        tracing::warn!("Chat request without a message");
        return error_reply("message is required");
    };

    let persona = state.personas.pick();
    tracing::info!(?persona, "Answering chat message");

    match state
        .backend
        .complete(persona.system_prompt(), &message)
        .await
    {
        Ok(reply) => (StatusCode::OK, Json(ChatResponse { reply })),
        Err(e) => {
            tracing::error!("Completion failed: {}", e);
            error_reply(&e.to_string())
        }
    }
}

fn error_reply(description: &str) -> (StatusCode, Json<ChatResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ChatResponse {
            reply: format!("Error: {}", description),
        }),
    )
}
