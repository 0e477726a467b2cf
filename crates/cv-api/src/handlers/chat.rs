//! Chat endpoint
//!
//! The full request pipeline: the raw body is validated (size before parse),
//! the challenge session or inline token is checked, context is read from
//! the record store, the system prompt is composed, and the hosted LLM
//! produces the reply. All steps are sequential; nothing here retries.

use crate::error::AppError;
use crate::middleware::{client_ip, SessionStatus};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::HeaderMap,
    Extension, Json,
};
use cv_core::{validate_chat_body, ChatMessage, CoreError};
use cv_rag::{compose_prompt, retrieve_context};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Assistant reply text
    pub response: String,

    /// Whether any stored context backed the reply
    #[serde(rename = "contextUsed")]
    pub context_used: bool,
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    session: Option<Extension<SessionStatus>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ChatResponse>, AppError> {
    let message = validate_chat_body(&body)?;

    let session_verified = session.map(|Extension(s)| s.verified).unwrap_or(false);
    if !session_verified {
        admit_with_inline_token(&state, &message, &headers, peer.as_ref()).await?;
    }

    let chunks = retrieve_context(state.store.as_ref(), state.config.retrieval.max_records)
        .await
        .map_err(|e| state.app_error(e))?;
    let context_used = !chunks.is_empty();

    let system_prompt = compose_prompt(&chunks, &state.identity);

    tracing::debug!(
        chunks = chunks.len(),
        message_chars = message.message.chars().count(),
        "forwarding chat request to LLM"
    );

    let response = state
        .llm
        .complete(&system_prompt, &message.message)
        .await
        .map_err(|e| state.app_error(e))?;

    Ok(Json(ChatResponse {
        response,
        context_used,
    }))
}

/// Admit a request with no valid session by verifying its inline token.
async fn admit_with_inline_token(
    state: &AppState,
    message: &ChatMessage,
    headers: &HeaderMap,
    peer: Option<&ConnectInfo<SocketAddr>>,
) -> Result<(), AppError> {
    let Some(token) = message.turnstile_token.as_deref() else {
        return Err(AppError::ChallengeRequired);
    };

    let ip = client_ip(headers, peer);
    // The chat surface reports verifier outages as an internal failure;
    // only the dedicated verification endpoints answer with 502.
    let outcome = state
        .verifier
        .verify(token, &ip)
        .await
        .map_err(|e| match e {
            CoreError::ChallengeService(msg) => state.app_error(CoreError::Upstream(msg)),
            other => state.app_error(other),
        })?;

    if !outcome.success {
        return Err(state.app_error(CoreError::ChallengeRejected {
            codes: outcome.error_codes,
        }));
    }
    Ok(())
}
