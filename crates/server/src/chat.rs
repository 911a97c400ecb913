//! Conversation and request routes.
//!
//! - `POST /api/conversations/{id}/messages` — one text turn; answers with the
//!   full transcript so thin clients can re-render the whole chat
//! - `POST /api/conversations/{id}/audio`    — one audio turn (raw bytes);
//!   mounted only when the speech capability is configured
//! - `GET  /api/requests`                    — stored requests, most recent first

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use expensebot_core::dialogue::{DialogueSession, Stage, TurnOutcome};
use expensebot_core::domain::message::Message;
use expensebot_core::domain::request::ExpenseRequest;
use expensebot_core::extract::FieldExtractor;
use expensebot_db::{DbPool, RequestStore, SqlRequestStore};
use expensebot_speech::{AudioSource, HttpTranscriber, TranscriptionProvider};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

type SessionMap = HashMap<String, Arc<Mutex<DialogueSession>>>;

#[derive(Clone)]
pub struct ChatState {
    sessions: Arc<Mutex<SessionMap>>,
    extractor: Arc<FieldExtractor>,
    store: Arc<dyn RequestStore>,
    transcriber: Option<Arc<HttpTranscriber>>,
}

impl ChatState {
    pub fn new(store: Arc<dyn RequestStore>, transcriber: Option<Arc<HttpTranscriber>>) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(SessionMap::new())),
            extractor: Arc::new(FieldExtractor::new()),
            store,
            transcriber,
        }
    }

    /// Gets or creates the session for one conversation. The map lock is held
    /// only for the lookup; turns lock the session itself, so a slow store
    /// write in one conversation never stalls the others.
    async fn session(&self, conversation_id: &str) -> Arc<Mutex<DialogueSession>> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(DialogueSession::new())))
            .clone()
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub stage: Stage,
    pub messages: Vec<Message>,
    pub transcribed_text: Option<String>,
    pub stored_request_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatError {
    pub error: String,
}

pub fn router(db_pool: DbPool, transcriber: Option<Arc<HttpTranscriber>>) -> Router {
    let state = ChatState::new(Arc::new(SqlRequestStore::new(db_pool)), transcriber.clone());

    let mut router = Router::new()
        .route("/api/conversations/{id}/messages", post(post_message))
        .route("/api/requests", get(list_requests));

    if transcriber.is_some() {
        router = router.route("/api/conversations/{id}/audio", post(post_audio));
    }

    router.with_state(state)
}

pub async fn post_message(
    State(state): State<ChatState>,
    Path(conversation_id): Path<String>,
    Json(request): Json<MessageRequest>,
) -> Json<TurnResponse> {
    Json(run_turn(&state, &conversation_id, &request.text, None).await)
}

pub async fn post_audio(
    State(state): State<ChatState>,
    Path(conversation_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TurnResponse>, (StatusCode, Json<ChatError>)> {
    let Some(transcriber) = state.transcriber.clone() else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ChatError { error: "speech capability is not configured".to_string() }),
        ));
    };

    let file_name = headers
        .get("x-file-name")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("audio")
        .to_string();
    let audio = AudioSource::new(file_name, body.to_vec());

    match transcriber.transcribe(&audio).await {
        Ok(text) => Ok(Json(run_turn(&state, &conversation_id, &text, Some(text.clone())).await)),
        Err(failure) => {
            warn!(
                event_name = "chat.transcription_failed",
                conversation_id = %conversation_id,
                error = %failure,
                "audio turn produced no usable text"
            );

            let session = state.session(&conversation_id).await;
            let mut session = session.lock().await;
            session.transcription_failed();

            Ok(Json(TurnResponse {
                stage: session.stage(),
                messages: session.messages().to_vec(),
                transcribed_text: None,
                stored_request_id: None,
            }))
        }
    }
}

pub async fn list_requests(
    State(state): State<ChatState>,
) -> Result<Json<Vec<ExpenseRequest>>, (StatusCode, Json<ChatError>)> {
    state.store.list_all().await.map(Json).map_err(|failure| {
        error!(event_name = "chat.list_requests_failed", error = %failure, "request listing failed");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(ChatError { error: failure.to_string() }))
    })
}

async fn run_turn(
    state: &ChatState,
    conversation_id: &str,
    text: &str,
    transcribed_text: Option<String>,
) -> TurnResponse {
    let session = state.session(conversation_id).await;
    let mut session = session.lock().await;

    let outcome = session.handle_utterance(&state.extractor, text);

    let mut stored_request_id = None;
    if let TurnOutcome::Submit(draft) = outcome {
        match state.store.append(&draft).await {
            Ok(request) => {
                info!(
                    event_name = "chat.request_stored",
                    conversation_id = %conversation_id,
                    request_id = %request.id.0,
                    "expense request stored"
                );
                stored_request_id = Some(request.id.0.clone());
                session.submission_succeeded();
            }
            Err(failure) => {
                error!(
                    event_name = "chat.request_store_failed",
                    conversation_id = %conversation_id,
                    error = %failure,
                    "expense request write failed"
                );
                session.submission_failed(&failure.to_string());
            }
        }
    }

    TurnResponse {
        stage: session.stage(),
        messages: session.messages().to_vec(),
        transcribed_text,
        stored_request_id,
    }
}
