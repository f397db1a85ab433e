//! HTTP endpoint layer.
//!
//! Thin axum handlers over the repository and workflows. Handlers
//! authenticate, run the sync workflow code on `spawn_blocking` (including
//! any retry sleeps), and translate the error taxonomy into JSON responses.
//! Internal detail is logged here and never leaks to the client.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{self, TokenVerifier};
use crate::chat::sessions::ChatSessions;
use crate::chat::ChatWorkflow;
use crate::completion::CompletionProvider;
use crate::config::OneiroConfig;
use crate::dreams::repo::DreamRepository;
use crate::dreams::types::{Dream, DreamPatch};
use crate::enrich::prompts::{ImageQuality, ImageStyle, IntelligenceLevel};
use crate::enrich::retry::FixedDelay;
use crate::enrich::{EnrichOptions, Enricher};
use crate::error::AuthError;

/// Per-user image generation preferences, process-local.
#[derive(Debug, Clone, Copy)]
struct ImagePrefs {
    style: ImageStyle,
    quality: ImageQuality,
}

#[derive(Clone)]
pub struct AppState {
    repo: DreamRepository,
    enricher: Arc<Enricher>,
    chat: Arc<ChatWorkflow>,
    verifier: Arc<dyn TokenVerifier>,
    prefs: Arc<Mutex<HashMap<String, ImagePrefs>>>,
    /// Fallback for users who never set preferences, from config.
    default_prefs: ImagePrefs,
}

/// JSON error response with a short, non-leaking message.
enum ApiError {
    Unauthorized(String),
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    /// Log the real failure, answer with a generic message.
    fn internal(context: &str, detail: impl std::fmt::Display) -> Self {
        tracing::error!(context, error = %detail, "request failed");
        Self::Internal(context.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        tracing::warn!(error = %e, "authorization rejected");
        let message = match e {
            AuthError::MissingToken => "missing bearer token",
            _ => "invalid identity token",
        };
        Self::Unauthorized(message.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m),
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            Self::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Run sync workflow code off the async runtime.
async fn blocking<T, F>(context: &'static str, f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(context, e))
}

/// Resolve the caller's verified email from the bearer header, falling back
/// to an `id_token` field on the body where the wire contract carries one.
async fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    body_token: Option<String>,
) -> Result<String, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(auth::extract_bearer)
        .map(str::to_string)
        .or(body_token)
        .ok_or(AuthError::MissingToken)?;

    let verifier = Arc::clone(&state.verifier);
    blocking("token verification failed", move || verifier.verify(&token))
        .await?
        .map_err(ApiError::from)
}

// ── Request bodies ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CreateDreamRequest {
    title: String,
    date: String,
    entry: String,
    id_token: Option<String>,
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
}

#[derive(Deserialize)]
struct SearchChatRequest {
    function_name: String,
    prompt: String,
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Deserialize)]
struct StyleRequest {
    style: String,
}

#[derive(Deserialize)]
struct QualityRequest {
    quality: String,
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn create_dream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateDreamRequest>,
) -> Result<Json<Dream>, ApiError> {
    let email = authorize(&state, &headers, body.id_token.clone()).await?;

    let repo = state.repo.clone();
    let dream = blocking("dream creation failed", move || {
        repo.create(&body.title, &body.date, &body.entry, &email)
    })
    .await?
    .map_err(|e| ApiError::internal("dream creation failed", e))?;

    Ok(Json(dream))
}

async fn list_dreams(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Dream>>, ApiError> {
    let email = authorize(&state, &headers, None).await?;

    let repo = state.repo.clone();
    let dreams = blocking("failed to list dreams", move || repo.list_by_owner(&email))
        .await?
        .map_err(|e| ApiError::internal("failed to list dreams", e))?;

    Ok(Json(dreams))
}

/// Fetch a dream if it exists and belongs to `email`.
async fn owned_dream(
    state: &AppState,
    id: &str,
    email: &str,
) -> Result<Option<Dream>, ApiError> {
    let repo = state.repo.clone();
    let id = id.to_string();
    let dream = blocking("failed to fetch dream", move || repo.get(&id))
        .await?
        .map_err(|e| ApiError::internal("failed to fetch dream", e))?;

    Ok(dream.filter(|d| d.owner_email == email))
}

async fn get_dream(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Dream>, ApiError> {
    let email = authorize(&state, &headers, None).await?;

    match owned_dream(&state, &id, &email).await? {
        Some(dream) => Ok(Json(dream)),
        None => Err(ApiError::NotFound(format!("dream with id {id} not found"))),
    }
}

async fn update_dream(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<DreamPatch>,
) -> Result<Json<Dream>, ApiError> {
    let email = authorize(&state, &headers, None).await?;

    if owned_dream(&state, &id, &email).await?.is_none() {
        return Err(ApiError::NotFound(format!("dream with id {id} not found")));
    }

    let enricher = Arc::clone(&state.enricher);
    let dream = blocking("dream update failed", move || {
        enricher.update_enrichment(&id, patch.analysis, patch.image)
    })
    .await?
    .map_err(|e| ApiError::internal("dream update failed", e))?;

    Ok(Json(dream))
}

async fn delete_dream(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email = authorize(&state, &headers, None).await?;

    if owned_dream(&state, &id, &email).await?.is_none() {
        return Err(ApiError::Unauthorized("unauthorized access".to_string()));
    }

    let repo = state.repo.clone();
    let deleted = {
        let id = id.clone();
        blocking("dream deletion failed", move || repo.delete(&id)).await?
    };

    if deleted {
        Ok(Json(json!({ "message": format!("dream with id {id} deleted") })))
    } else {
        Err(ApiError::Internal(format!("failed to delete dream with id {id}")))
    }
}

async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<String>, ApiError> {
    let email = authorize(&state, &headers, None).await?;

    if owned_dream(&state, &id, &email).await?.is_none() {
        return Err(ApiError::Unauthorized("unauthorized access".to_string()));
    }

    let enricher = Arc::clone(&state.enricher);
    let analysis = blocking("analysis generation failed", move || {
        enricher.ensure_analysis(&id)
    })
    .await?
    .map_err(|e| ApiError::internal("analysis generation failed", e))?;

    Ok(Json(analysis))
}

async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email = authorize(&state, &headers, None).await?;

    if owned_dream(&state, &id, &email).await?.is_none() {
        return Err(ApiError::NotFound(format!("dream with id {id} not found")));
    }

    let prefs = {
        let map = state.prefs.lock().unwrap_or_else(|e| e.into_inner());
        map.get(&email).copied().unwrap_or(state.default_prefs)
    };

    let enricher = Arc::clone(&state.enricher);
    let url = blocking("image generation failed", move || {
        enricher.ensure_image(&id, prefs.style, prefs.quality)
    })
    .await?
    .map_err(|e| ApiError::internal("image generation failed", e))?;

    Ok(Json(json!({ "image": url })))
}

async fn search_dreams(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SearchRequest>,
) -> Result<Json<Vec<Dream>>, ApiError> {
    let email = authorize(&state, &headers, None).await?;

    let repo = state.repo.clone();
    let dreams = blocking("dream search failed", move || {
        repo.search(&body.query, &email)
    })
    .await?
    .map_err(|e| ApiError::internal("dream search failed", e))?;

    Ok(Json(dreams))
}

async fn search_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SearchChatRequest>,
) -> Result<Response, ApiError> {
    let email = authorize(&state, &headers, None).await?;

    let chat = Arc::clone(&state.chat);
    let response = blocking("search chat failed", move || {
        chat.search_chat(&body.function_name, &body.prompt, &email)
    })
    .await?
    .map_err(|e| ApiError::internal("search chat failed", e))?;

    Ok(Json(response).into_response())
}

async fn regular_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChatRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email = authorize(&state, &headers, None).await?;

    let chat = Arc::clone(&state.chat);
    let reply = blocking("chat failed", move || chat.chat(&body.message, &email))
        .await?
        .map_err(|e| ApiError::internal("chat failed", e))?;

    Ok(Json(json!({ "response": reply })))
}

async fn set_image_style(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<StyleRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email = authorize(&state, &headers, None).await?;

    let style: ImageStyle = body
        .style
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid image style value".to_string()))?;

    let mut map = state.prefs.lock().unwrap_or_else(|e| e.into_inner());
    map.entry(email).or_insert(state.default_prefs).style = style;

    Ok(Json(json!({ "message": "image style updated" })))
}

async fn set_image_quality(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<QualityRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email = authorize(&state, &headers, None).await?;

    let quality: ImageQuality = body
        .quality
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid image quality value".to_string()))?;

    let mut map = state.prefs.lock().unwrap_or_else(|e| e.into_inner());
    map.entry(email).or_insert(state.default_prefs).quality = quality;

    Ok(Json(json!({ "message": "image quality updated" })))
}

async fn export_pdf(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let email = authorize(&state, &headers, None).await?;

    let repo = state.repo.clone();
    let bytes = blocking("pdf export failed", move || -> anyhow::Result<Vec<u8>> {
        let dreams = repo.list_by_owner(&email)?;
        crate::export::export_pdf(&dreams)
    })
    .await?
    .map_err(|e| ApiError::internal("pdf export failed", e))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"dreams.pdf\"",
            ),
        ],
        bytes,
    )
        .into_response())
}

// ── Wiring ────────────────────────────────────────────────────────────────────

/// Build the full route table over an [`AppState`].
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/dreams", post(create_dream).get(list_dreams))
        .route(
            "/api/dreams/{id}",
            get(get_dream).put(update_dream).delete(delete_dream),
        )
        .route("/api/dreams/{id}/analysis", get(get_analysis))
        .route("/api/dreams/{id}/image", get(get_image))
        .route("/api/dreams/search", post(search_dreams))
        .route("/api/dreams/search-chat", post(search_chat))
        .route("/api/dreams/export/pdf", get(export_pdf))
        .route("/api/chat", post(regular_chat))
        .route("/api/user/image-style", post(set_image_style))
        .route("/api/user/image-quality", post(set_image_quality))
        .with_state(state)
}

/// Shared setup: open DB, create providers, wire repository and workflows.
pub fn build_state(config: &OneiroConfig) -> anyhow::Result<AppState> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    // Vectors embedded under a different model are useless for search
    if let Ok(Some(stored_model)) = crate::db::migrations::get_embedding_model(&conn) {
        if stored_model != config.embedding.model {
            tracing::warn!(
                stored = %stored_model,
                configured = %config.embedding.model,
                "embedding model changed — stored vectors will not match new queries"
            );
        }
    }

    let provider = crate::embedding::create_provider(&config.completion, &config.embedding)?;
    let store = Arc::new(crate::store::sqlite::SqliteStore::new(conn, Arc::from(provider)));
    let repo = DreamRepository::new(store);

    let completion: Arc<dyn CompletionProvider> =
        Arc::new(crate::completion::openai::OpenAiProvider::new(&config.completion));

    let retry = FixedDelay::new(
        config.enrichment.max_retries,
        std::time::Duration::from_secs(config.enrichment.retry_delay_secs),
    );
    let options = EnrichOptions {
        force_regenerate: config.enrichment.force_regenerate,
        intelligence: IntelligenceLevel::from_config(&config.enrichment.intelligence_level),
    };
    let enricher = Arc::new(Enricher::new(
        repo.clone(),
        Arc::clone(&completion),
        Box::new(retry),
        options,
    ));

    let sessions = Arc::new(ChatSessions::new(config.chat.history_limit));
    let chat = Arc::new(ChatWorkflow::new(
        repo.clone(),
        Arc::clone(&completion),
        sessions,
    ));

    let verifier: Arc<dyn TokenVerifier> =
        Arc::new(crate::auth::JwksVerifier::new(&config.auth));

    // Unrecognized config values fall back like unrecognized request values
    let default_prefs = ImagePrefs {
        style: config.enrichment.default_style.parse().unwrap_or_default(),
        quality: config.enrichment.default_quality.parse().unwrap_or_default(),
    };

    Ok(AppState {
        repo,
        enricher,
        chat,
        verifier,
        prefs: Arc::new(Mutex::new(HashMap::new())),
        default_prefs,
    })
}

/// Start the HTTP server and run until ctrl-c.
pub async fn serve(config: OneiroConfig) -> anyhow::Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    // State setup opens the database and constructs blocking HTTP clients
    let state = tokio::task::spawn_blocking(move || build_state(&config)).await??;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "dream journal server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl-c");
            tracing::info!("shutting down server");
        })
        .await?;

    Ok(())
}
