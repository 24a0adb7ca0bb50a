//! HTTP server for the Nutrify web UI.
//!
//! Sessions are created on demand and addressed by id; each session owns its
//! uploaded image and chat transcript. Handlers lock only their own session
//! for the interaction, so the model call blocks that session's turn (the
//! UI's spinner is purely cosmetic) without holding up other sessions.

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

use crate::analysis::{image_parts, meal_suggestion_prompt, AnalysisKind, UploadedImage};
use crate::config::Config;
use crate::error::AppError;
use crate::gemini::GenerativeBackend;
use crate::render;
use crate::session::{ChatTurn, SessionStore};

/// Interval between idle-session sweeps.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(RustEmbed)]
#[folder = "assets/web/"]
struct Assets;

pub struct Server {
    config: Config,
    backend: Arc<dyn GenerativeBackend>,
}

struct AppState {
    config: Config,
    backend: Arc<dyn GenerativeBackend>,
    sessions: SessionStore,
    started_at: chrono::DateTime<chrono::Utc>,
}

impl Server {
    pub fn new(config: &Config, backend: Arc<dyn GenerativeBackend>) -> Self {
        Self {
            config: config.clone(),
            backend,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let state = Arc::new(AppState {
            config: self.config.clone(),
            backend: self.backend.clone(),
            sessions: SessionStore::new(&self.config.session),
            started_at: chrono::Utc::now(),
        });

        let cleanup_state = state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                cleanup_state.sessions.cleanup_expired().await;
            }
        });

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let app = Router::new()
            .route("/", get(index))
            .route("/{*path}", get(static_asset))
            .route("/health", get(health_check))
            .route("/api/status", get(status))
            .route("/api/upload", post(upload))
            .route("/api/analyze", post(analyze))
            .route("/api/chat", post(chat))
            .route("/api/transcript", get(transcript))
            .layer(DefaultBodyLimit::max(
                self.config.session.max_image_bytes + 1024 * 1024,
            ))
            .layer(cors)
            .layer(tower_http::trace::TraceLayer::new_for_http())
            .with_state(state);

        let addr: SocketAddr =
            format!("{}:{}", self.config.server.bind, self.config.server.port).parse()?;

        info!("Starting Nutrify on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

// Uniform error body; the UI switches on `kind` to distinguish the
// missing-upload warning from hard failures.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

fn error_response(err: AppError) -> Response {
    let status = match &err {
        AppError::NoUpload | AppError::UnsupportedImage(_) | AppError::UploadFailed(_) => {
            StatusCode::BAD_REQUEST
        }
        AppError::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        AppError::Transport(_) | AppError::ProviderRejection { .. } | AppError::EmptyResponse => {
            StatusCode::BAD_GATEWAY
        }
        AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = ErrorBody {
        error: err.to_string(),
        kind: err.kind(),
    };
    (status, Json(body)).into_response()
}

async fn health_check() -> &'static str {
    "OK"
}

async fn index() -> Response {
    serve_asset("index.html")
}

async fn static_asset(Path(path): Path<String>) -> Response {
    serve_asset(&path)
}

fn serve_asset(path: &str) -> Response {
    match Assets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                [(header::CONTENT_TYPE, mime.as_ref())],
                content.data.into_owned(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

#[derive(Serialize)]
struct StatusResponse {
    version: String,
    model: String,
    active_sessions: usize,
    started_at: chrono::DateTime<chrono::Utc>,
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.config.gemini.model.clone(),
        active_sessions: state.sessions.active_count().await,
        started_at: state.started_at,
    })
}

#[derive(Serialize)]
struct UploadResponse {
    session_id: String,
    mime_type: String,
    size: usize,
}

async fn upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut session_id: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            // A truncated or malformed stream is its own failure, not a
            // missing upload.
            Err(e) => return error_response(AppError::UploadFailed(e.to_string())),
        };

        match field.name() {
            Some("session_id") => {
                if let Ok(text) = field.text().await {
                    if !text.is_empty() {
                        session_id = Some(text);
                    }
                }
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                match field.bytes().await {
                    Ok(bytes) => file = Some((filename, bytes.to_vec())),
                    Err(e) => return error_response(AppError::UploadFailed(e.to_string())),
                }
            }
            _ => {}
        }
    }

    let (filename, data) = match file {
        Some(f) => f,
        None => return error_response(AppError::NoUpload),
    };

    let image =
        match UploadedImage::from_upload(&filename, data, state.config.session.max_image_bytes) {
            Ok(img) => img,
            Err(e) => return error_response(e),
        };

    let (session_id, session) = state.sessions.get_or_create(session_id).await;

    debug!(
        "Stored {} upload ({} bytes) for session {}",
        image.mime_type,
        image.size(),
        session_id
    );

    let response = UploadResponse {
        session_id,
        mime_type: image.mime_type.clone(),
        size: image.size(),
    };
    session.lock().await.set_image(image);

    Json(response).into_response()
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    session_id: String,
    analysis_type: AnalysisKind,
    custom_prompt: Option<String>,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    analysis: String,
    analysis_html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestions_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestions_error: Option<String>,
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Response {
    let session = match state.sessions.get(&request.session_id).await {
        Some(s) => s,
        // An unknown session has never uploaded anything.
        None => return error_response(AppError::NoUpload),
    };
    let session = session.lock().await;

    let parts = match image_parts(session.image()) {
        Ok(p) => p,
        Err(e) => return error_response(e),
    };

    let instruction = request
        .analysis_type
        .instruction(request.custom_prompt.as_deref());

    // The instruction travels in the prompt slot; the input slot stays empty.
    let analysis = match state.backend.generate("", &parts, &instruction).await {
        Ok(text) => text,
        Err(e) => return error_response(e),
    };

    // The analysis stands on its own; a failed follow-up only costs the
    // suggestions.
    let (suggestions, suggestions_error) = match state
        .backend
        .generate(&meal_suggestion_prompt(&analysis), &[], "")
        .await
    {
        Ok(text) => (Some(text), None),
        Err(e) => (None, Some(e.to_string())),
    };

    Json(AnalyzeResponse {
        analysis_html: render::analysis_block(&analysis),
        suggestions_html: suggestions.as_deref().map(render::suggestion_block),
        analysis,
        suggestions,
        suggestions_error,
    })
    .into_response()
}

#[derive(Deserialize)]
struct ChatRequest {
    session_id: Option<String>,
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    session_id: String,
    response: String,
    response_html: String,
    turns: usize,
}

async fn chat(State(state): State<Arc<AppState>>, Json(request): Json<ChatRequest>) -> Response {
    let (session_id, session) = state.sessions.get_or_create(request.session_id).await;
    let mut session = session.lock().await;

    // The user turn lands in the transcript before the call, as observed
    // upstream; it stays there even if the call fails.
    session.push_user(&request.message);

    // With no uploaded image the chat still goes out, image list empty. The
    // message travels in the input slot, never the prompt slot.
    let parts = match session.image() {
        Some(img) => match image_parts(Some(img)) {
            Ok(p) => p,
            Err(e) => return error_response(e),
        },
        None => Vec::new(),
    };

    match state.backend.generate(&request.message, &parts, "").await {
        Ok(response) => {
            session.push_assistant(&response);
            let turn = ChatTurn {
                role: crate::session::ChatRole::Assistant,
                content: response.clone(),
            };
            Json(ChatResponse {
                session_id,
                response_html: render::chat_bubble(&turn),
                response,
                turns: session.transcript().len(),
            })
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
struct TranscriptQuery {
    session_id: String,
}

#[derive(Serialize)]
struct TranscriptResponse {
    session_id: String,
    turns: Vec<ChatTurn>,
}

async fn transcript(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TranscriptQuery>,
) -> Response {
    match state.sessions.get(&query.session_id).await {
        Some(session) => {
            let session = session.lock().await;
            Json(TranscriptResponse {
                session_id: query.session_id.clone(),
                turns: session.transcript().to_vec(),
            })
            .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: "Session not found".to_string(),
                kind: "session",
            }),
        )
            .into_response(),
    }
}
