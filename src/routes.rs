//! Route definitions for the chat gateway.
//!
//! Chat endpoints (proxy to the completion provider plus session queries) and
//! the unrelated Google login flow. The two share a router but no state.

use crate::config::{ChatConfig, Config};
use crate::error::Error;
use crate::oauth::OAuthFlow;
use crate::provider::{ChatRequest, OpenAIProvider, Provider, TranscriptMessage};
use crate::session::{ChatSession, Message, SessionStore};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Json, Redirect},
    routing::{delete, get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Fixed system instruction sent with every transcript.
const SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Always respond to the user in a friendly, professional tone.";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: SessionStore,
    pub provider: Arc<dyn Provider>,
    pub oauth: OAuthFlow,
    pub chat: ChatConfig,
}

/// Chat request body.
#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Chat response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponseBody {
    pub response: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Deletion acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

/// Identity claims returned from the OAuth callback.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: serde_json::Value,
}

/// OAuth callback query parameters.
#[derive(Debug, Deserialize)]
pub struct AuthCallbackQuery {
    pub code: String,
    #[serde(default)]
    pub state: String,
}

/// Map a gateway error onto the HTTP error envelope.
fn error_response(err: &Error) -> (StatusCode, Json<ErrorResponse>) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: err.code().into(),
        }),
    )
}

/// Build the full router from configuration.
pub fn build_all_routes(config: &Config) -> Router {
    let api_key = config.chat.openai_api_key.clone().unwrap_or_default();
    let provider: Arc<dyn Provider> = Arc::new(OpenAIProvider::new(api_key));

    let state = AppState {
        store: SessionStore::new(),
        provider,
        oauth: OAuthFlow::new(config.oauth.clone(), &config.public_base_url()),
        chat: config.chat.clone(),
    };

    build_all_routes_with_state(state)
}

/// Build the router from pre-constructed state. Used by tests to inject a
/// fake provider and an isolated store.
pub fn build_all_routes_with_state(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/sessions", get(list_sessions_handler))
        .route("/api/sessions/:id", get(get_session_handler))
        .route("/api/sessions/:id", delete(delete_session_handler))
        .route("/login", get(login_handler))
        .route("/auth", get(auth_handler))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Proxy a user message to the completion provider.
async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequestBody>,
) -> Result<Json<ChatResponseBody>, (StatusCode, Json<ErrorResponse>)> {
    let session_id = state
        .store
        .resolve_or_create(request.session_id.as_deref(), &request.message)
        .await;

    state
        .store
        .append(&session_id, Message::user(&request.message))
        .await
        .map_err(|e| error_response(&e))?;

    let history = state
        .store
        .tail(&session_id, state.chat.history_window)
        .await
        .map_err(|e| error_response(&e))?;

    let transcript = history
        .iter()
        .map(|m| {
            let role = if m.is_user { "user" } else { "assistant" };
            TranscriptMessage::new(role, m.text.clone())
        })
        .collect();

    let completion = state
        .provider
        .chat(ChatRequest {
            model: state.chat.model.clone(),
            messages: transcript,
            max_tokens: Some(state.chat.max_tokens),
            temperature: Some(state.chat.temperature),
            system: Some(SYSTEM_PROMPT.into()),
        })
        .await;

    let response = match completion {
        Ok(reply) => {
            tracing::debug!(
                session_id = %session_id,
                model = %reply.model,
                latency_ms = reply.latency_ms,
                output_tokens = reply.usage.output_tokens,
                "Completion succeeded"
            );
            state
                .store
                .append(&session_id, Message::assistant(&reply.content))
                .await
                .map_err(|e| error_response(&e))?;
            reply.content
        }
        // Provider failures are reported in-band as the reply text. The
        // synthesized message is not recorded in the session history.
        Err(e) => {
            tracing::warn!(
                session_id = %session_id,
                provider = %e.provider,
                status_code = ?e.status_code,
                error = %e.message,
                "Completion call failed"
            );
            format!("AI error: {}", e.message)
        }
    };

    Ok(Json(ChatResponseBody {
        response,
        session_id,
        timestamp: Utc::now(),
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// List all sessions with their full message history.
async fn list_sessions_handler(State(state): State<AppState>) -> Json<Vec<ChatSession>> {
    Json(state.store.list().await)
}

/// Get a session by id.
async fn get_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChatSession>, (StatusCode, Json<ErrorResponse>)> {
    state
        .store
        .get(&id)
        .await
        .map(Json)
        .map_err(|e| error_response(&e))
}

/// Delete a session. Succeeds whether or not the id existed.
async fn delete_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<DeleteResponse> {
    let removed = state.store.delete(&id).await;
    tracing::debug!(session_id = %id, removed, "Session delete");
    Json(DeleteResponse {
        message: "Session deleted".into(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity Login Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Redirect the caller to the identity provider's authorization endpoint.
async fn login_handler(
    State(state): State<AppState>,
) -> Result<Redirect, (StatusCode, Json<ErrorResponse>)> {
    let url = state.oauth.authorize_url().map_err(|e| error_response(&e))?;
    Ok(Redirect::temporary(&url))
}

/// Complete the identity exchange and return the decoded claims.
async fn auth_handler(
    State(state): State<AppState>,
    Query(query): Query<AuthCallbackQuery>,
) -> Result<Json<AuthResponse>, (StatusCode, Json<ErrorResponse>)> {
    let user = state
        .oauth
        .exchange_code(&query.code, &query.state)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "OAuth code exchange failed");
            error_response(&e)
        })?;

    Ok(Json(AuthResponse { user }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Misc Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Static welcome payload.
async fn root_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Welcome! Visit /login to sign in with Google"
    }))
}

/// Health check handler.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        service: "chat-gateway".into(),
    })
}
