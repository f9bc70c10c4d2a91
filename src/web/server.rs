use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::orchestrator::{ExtractSource, ExtractionReport};
use crate::core::types::EntityType;
use crate::service::{GraphStatistics, IngestSummary, KnowledgeGraphService};
use crate::store::QueryRow;
use crate::store::query::{CanonicalQuery, DEFAULT_TOP_LIMIT};

#[derive(Clone)]
pub struct AppState {
    pub service: KnowledgeGraphService,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeTextRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzePathRequest {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct EntitiesParams {
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PathParams {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InfluentialParams {
    pub limit: Option<usize>,
}

/// Either canonical Cypher text (with parameters) or a typed query.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    pub canonical: Option<CanonicalQuery>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/analyze/text", post(analyze_text))
        .route("/analyze/file", post(analyze_file))
        .route("/analyze/codebase", post(analyze_codebase))
        .route("/graph", delete(clear_graph))
        .route("/graph/stats", get(stats))
        .route("/graph/entities", get(entities))
        .route("/graph/entities/{id}/neighbors", get(neighbors))
        .route("/graph/relationships", get(relationships))
        .route("/graph/path", get(find_path))
        .route("/graph/influential", get(influential))
        .route("/graph/query", post(query))
        .with_state(Arc::new(state))
}

fn rows_response(rows: Vec<QueryRow>) -> Json<Value> {
    Json(json!({ "count": rows.len(), "rows": rows }))
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "status": "ok", "backend": state.service.store().backend_name() }))
}

async fn analyze_text(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeTextRequest>, JsonRejection>,
) -> Result<Json<ExtractionReport>, ApiError> {
    let Json(payload) = payload.map_err(|_e| ApiError::unprocessable("invalid json body"))?;
    if payload.text.trim().is_empty() {
        return Err(ApiError::unprocessable("text must be non-empty"));
    }
    let report = state
        .service
        .analyze_text(payload.text)
        .await
        .map_err(ApiError::internal_from)?;
    Ok(Json(report))
}

async fn ingest_path(state: &AppState, raw: &str, want_dir: bool) -> Result<IngestSummary, ApiError> {
    if raw.trim().is_empty() {
        return Err(ApiError::unprocessable("path must be non-empty"));
    }
    let path = PathBuf::from(raw);
    let meta = std::fs::metadata(&path).map_err(|_| ApiError::not_found(format!("path not found: {raw}")))?;
    if want_dir && !meta.is_dir() {
        return Err(ApiError::unprocessable(format!("not a directory: {raw}")));
    }
    if !want_dir && !meta.is_file() {
        return Err(ApiError::unprocessable(format!("not a file: {raw}")));
    }
    state
        .service
        .extract_and_store(ExtractSource::Path(path))
        .await
        .map_err(ApiError::internal_from)
}

async fn analyze_file(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzePathRequest>, JsonRejection>,
) -> Result<Json<IngestSummary>, ApiError> {
    let Json(payload) = payload.map_err(|_e| ApiError::unprocessable("invalid json body"))?;
    Ok(Json(ingest_path(&state, &payload.path, false).await?))
}

async fn analyze_codebase(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzePathRequest>, JsonRejection>,
) -> Result<Json<IngestSummary>, ApiError> {
    let Json(payload) = payload.map_err(|_e| ApiError::unprocessable("invalid json body"))?;
    Ok(Json(ingest_path(&state, &payload.path, true).await?))
}

async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<GraphStatistics>, ApiError> {
    let s = state.service.statistics().await.map_err(ApiError::internal_from)?;
    Ok(Json(s))
}

async fn entities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EntitiesParams>,
) -> Result<Json<Value>, ApiError> {
    let entity_type = match params.entity_type.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => Some(
            t.parse::<EntityType>()
                .map_err(|_| ApiError::unprocessable(format!("unknown entity type: {t}")))?,
        ),
        None => None,
    };
    let rows = state
        .service
        .entities(entity_type)
        .await
        .map_err(ApiError::internal_from)?;
    Ok(rows_response(rows))
}

async fn relationships(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let rows = state.service.relationships().await.map_err(ApiError::internal_from)?;
    Ok(rows_response(rows))
}

async fn neighbors(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let rows = state.service.neighbors(&id).await.map_err(ApiError::internal_from)?;
    Ok(rows_response(rows))
}

async fn find_path(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PathParams>,
) -> Result<Json<Value>, ApiError> {
    let (Some(from), Some(to)) = (params.from, params.to) else {
        return Err(ApiError::unprocessable("from and to are required"));
    };
    let rows = state
        .service
        .find_path(&from, &to)
        .await
        .map_err(ApiError::internal_from)?;
    Ok(rows_response(rows))
}

async fn influential(
    State(state): State<Arc<AppState>>,
    Query(params): Query<InfluentialParams>,
) -> Result<Json<Value>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_TOP_LIMIT);
    if limit == 0 {
        return Err(ApiError::unprocessable("limit must be positive"));
    }
    let rows = state
        .service
        .influential(limit)
        .await
        .map_err(ApiError::internal_from)?;
    Ok(rows_response(rows))
}

async fn query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = payload.map_err(|_e| ApiError::unprocessable("invalid json body"))?;
    let rows = match (payload.canonical, payload.query) {
        (Some(q), _) => state.service.query(&q).await,
        (None, Some(text)) if !text.trim().is_empty() => state.service.query_cypher(&text, &payload.parameters).await,
        _ => return Err(ApiError::unprocessable("query or canonical is required")),
    }
    .map_err(ApiError::internal_from)?;
    Ok(rows_response(rows))
}

async fn clear_graph(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    state.service.clear().await.map_err(ApiError::internal_from)?;
    Ok(Json(json!({ "status": "cleared" })))
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn unprocessable(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: msg.into(),
        }
    }

    fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    fn internal_from(err: anyhow::Error) -> Self {
        tracing::error!(error = %format!("{err:#}"), "request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.message }))).into_response()
    }
}
