//! HTTP JSON API over the query pipeline.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version and model names) |
//! | `GET`    | `/sensors` | Latest normalized snapshots and trend summary |
//! | `POST`   | `/ask` | `{"query": "..."}` → `{"response": "...", "degraded": bool}` |
//! | `GET`    | `/history` | Recent questions and answers, oldest first |
//! | `DELETE` | `/history` | Clear the conversation history |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `no_sensor_data` (404).
//!
//! Model and retrieval failures are not HTTP errors: `/ask` still answers
//! 200 with the fallback text and `"degraded": true`.
//!
//! # Concurrency
//!
//! Pipeline runs are serialized behind one async mutex, so at most one
//! index build or model call is in flight. History has its own mutex and
//! stays readable while a query runs.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::assistant::Pipeline;
use crate::config::Config;
use crate::history::ConversationHistory;
use crate::models::ConversationEntry;
use crate::progress::ProgressMode;
use crate::sensors;
use crate::status_cmd::{sensor_report, SensorReport};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    pipeline: Arc<Mutex<Pipeline>>,
    history: Arc<Mutex<ConversationHistory>>,
    embedding_model: String,
    chat_model: String,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        let config = Arc::new(pipeline.config().clone());
        let embedding_model = pipeline
            .retriever()
            .indexer()
            .provider()
            .model_name()
            .to_string();
        let chat_model = pipeline.assistant().model_name().to_string();
        Self {
            history: Arc::new(Mutex::new(ConversationHistory::new(
                config.history.max_entries,
            ))),
            config,
            pipeline: Arc::new(Mutex::new(pipeline)),
            embedding_model,
            chat_model,
        }
    }
}

/// Build the router with CORS and request tracing.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/sensors", get(handle_sensors))
        .route("/ask", axum::routing::post(handle_ask))
        .route("/history", get(handle_history).delete(handle_clear_history))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until the process is
/// terminated.
pub async fn run_server(config: &Config, progress: ProgressMode) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config_with_progress(config.clone(), progress.reporter())?;
    let app = router(AppState::new(pipeline));

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "farm assistant listening");
    println!("Farm assistant listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn no_sensor_data(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "no_sensor_data",
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    embedding_model: String,
    chat_model: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        embedding_model: state.embedding_model.clone(),
        chat_model: state.chat_model.clone(),
    })
}

// ============ GET /sensors ============

async fn handle_sensors(State(state): State<AppState>) -> Result<Json<SensorReport>, AppError> {
    let path = &state.config.sensors.log_path;
    let snapshots = sensors::get_latest_sensor_data(path, state.config.sensors.num_entries);
    if snapshots.is_empty() {
        return Err(no_sensor_data(format!(
            "No sensor data found. Please ensure '{}' exists and contains valid data.",
            path.display()
        )));
    }
    Ok(Json(sensor_report(&snapshots)))
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    query: String,
}

#[derive(Serialize)]
struct AskResponse {
    response: String,
    degraded: bool,
}

async fn handle_ask(
    State(state): State<AppState>,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    let Json(request) = body.map_err(|e| bad_request(e.body_text()))?;
    let query = request.query.trim();
    if query.is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let answer = {
        let mut pipeline = state.pipeline.lock().await;
        pipeline.ask(query).await
    };
    state
        .history
        .lock()
        .await
        .push(query, answer.response.clone());

    Ok(Json(AskResponse {
        response: answer.response,
        degraded: answer.degraded,
    }))
}

// ============ /history ============

#[derive(Serialize)]
struct HistoryResponse {
    entries: Vec<ConversationEntry>,
}

async fn handle_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    Json(HistoryResponse {
        entries: state.history.lock().await.to_vec(),
    })
}

async fn handle_clear_history(State(state): State<AppState>) -> StatusCode {
    state.history.lock().await.clear();
    StatusCode::NO_CONTENT
}
