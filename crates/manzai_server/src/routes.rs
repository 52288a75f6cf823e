//! Route table and handlers.
//!
//! Request bodies are parsed leniently: a body that is not a JSON object
//! counts as `{}`, `length` may be a number or a numeric string, and a
//! technique field that is not an array counts as empty.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use manzai_core::{GenerationRequest, TechniqueSelection};
use manzai_error::ManzaiError;
use manzai_ledger::GrantReceipt;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument};

use crate::{ApiError, AppState};

const ADD_CREDIT_ACTION: &str = "add_credit";

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate", post(generate).fallback(method_not_allowed))
        .route("/api/credit/add", post(add_credit).fallback(method_not_allowed))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Fields accepted by the API routes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ApiParams {
    theme: Option<String>,
    genre: Option<String>,
    characters: Option<String>,
    length: Option<u64>,
    user_id: Option<String>,
    selection: TechniqueSelection,
    action: Option<String>,
    product_id: Option<String>,
}

impl ApiParams {
    fn from_body(body: &[u8]) -> Self {
        let map = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(map)) => map,
            _ => {
                debug!(bytes = body.len(), "Body is not a JSON object, using empty parameters");
                Map::new()
            }
        };

        Self {
            theme: text_field(&map, "theme"),
            genre: text_field(&map, "genre"),
            characters: text_field(&map, "characters"),
            length: length_field(&map),
            user_id: text_field(&map, "user_id"),
            selection: TechniqueSelection {
                boke: id_list(&map, "boke"),
                tsukkomi: id_list(&map, "tsukkomi"),
                general: id_list(&map, "general"),
            },
            action: text_field(&map, "action"),
            product_id: text_field(&map, "product_id"),
        }
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn length_field(map: &Map<String, Value>) -> Option<u64> {
    match map.get("length")? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 1.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn id_list(map: &Map<String, Value>, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Serialize)]
struct ScriptMeta {
    structure: Vec<String>,
    techniques: Vec<String>,
    usage_count: Option<u64>,
    paid_credits: Option<u64>,
    target_length: u32,
    min_length: u32,
    max_length: u32,
    actual_length: usize,
}

/// The body is repeated under three keys for older clients.
#[derive(Debug, Serialize)]
struct GenerateResponse {
    title: String,
    text: String,
    body: String,
    content: String,
    meta: ScriptMeta,
}

#[instrument(skip_all, fields(user_id = tracing::field::Empty))]
async fn generate(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let params = ApiParams::from_body(&body);
    tracing::Span::current().record("user_id", params.user_id.as_deref().unwrap_or("-"));

    if params.action.as_deref() == Some(ADD_CREDIT_ACTION) {
        return grant(&state, &params).await.map(IntoResponse::into_response);
    }

    let target = state.length.clamp_target(params.length);
    let band = state.length.band_for(target);
    let request = GenerationRequest::new(
        params.theme.as_deref(),
        params.genre.as_deref(),
        params.characters.as_deref(),
        target,
        params.selection,
    );
    let user_id = params.user_id.as_deref();

    let check = state.gate.check_allowed(user_id).await;
    if !check.allowed
        && let Some(record) = &check.record
    {
        return Err(ApiError::quota_exceeded(state.gate.settings().free_quota, record));
    }

    let script = state
        .pipeline
        .generate(&request, band)
        .await
        .map_err(|e| ApiError::from_manzai(&ManzaiError::from(e), state.production))?;

    let usage = state.gate.consume_on_success(user_id).await.or(check.record);
    info!(
        target_length = band.target,
        length = script.length(),
        charged = usage.is_some(),
        "Script delivered"
    );

    let body = script.body().clone();
    let response = GenerateResponse {
        title: script.title().clone(),
        text: body.clone(),
        body: body.clone(),
        content: body,
        meta: ScriptMeta {
            structure: script.structure().clone(),
            techniques: script.techniques().clone(),
            usage_count: usage.as_ref().map(|r| r.output_count),
            paid_credits: usage.as_ref().map(|r| r.paid_credits),
            target_length: band.target,
            min_length: band.min,
            max_length: band.max,
            actual_length: script.length(),
        },
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

#[instrument(skip_all)]
async fn add_credit(State(state): State<AppState>, body: Bytes) -> Result<Json<GrantReceipt>, ApiError> {
    let params = ApiParams::from_body(&body);
    grant(&state, &params).await
}

async fn grant(state: &AppState, params: &ApiParams) -> Result<Json<GrantReceipt>, ApiError> {
    let receipt = state
        .gate
        .grant_credits(params.user_id.as_deref(), params.product_id.as_deref())
        .await
        .map_err(|e| ApiError::from_manzai(&e, state.production))?;
    Ok(Json(receipt))
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
