use crate::{state::AppState, ApiError, ApiResult, HistoryParams};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, Request, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use gold_chat::{relay::MISSING_MESSAGES, ChatRequest};
use gold_core::{ChatReply, HistoryResponse, MonitorError, PriceSnapshot};
use gold_feed::HistoryQuery;
use serde_json::{json, Value};
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, warn};

const PRICE_FAILED: &str = "Failed to retrieve gold price";
const HISTORY_FAILED: &str = "Failed to retrieve historical data";
const CHAT_FAILED: &str = "Failed to contact language model provider";
const CHAT_NOT_CONFIGURED: &str = "LLM API key is not configured on the server.";

pub async fn health_check() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

pub async fn get_price(State(state): State<AppState>) -> ApiResult<PriceSnapshot> {
    state.market.ticker().await.map(Json).map_err(|e| {
        error!(error = %e, "Price fetch error");
        ApiError::from_monitor(e, PRICE_FAILED)
    })
}

pub async fn get_history(
    State(state): State<AppState>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> ApiResult<HistoryResponse> {
    let Query(params) = params.map_err(|rejection| {
        warn!(error = %rejection, "Unreadable history query");
        ApiError::new(StatusCode::BAD_REQUEST, "Invalid query parameters")
    })?;

    let query = HistoryQuery::parse(params.range.as_deref(), params.interval.as_deref())
        .map_err(|e| {
            warn!(error = %e, "Rejected history request");
            ApiError::from_monitor(e, HISTORY_FAILED)
        })?;

    state.market.history(&query).await.map(Json).map_err(|e| {
        error!(error = %e, "History fetch error");
        ApiError::from_monitor(e, HISTORY_FAILED)
    })
}

pub async fn post_chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<ChatReply> {
    // Checked before the body so a misconfigured server never calls out.
    if !state.chat_enabled() {
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            CHAT_NOT_CONFIGURED,
        ));
    }

    let Json(request) = body.map_err(|rejection| {
        warn!(error = %rejection, "Unreadable chat body");
        ApiError::new(StatusCode::BAD_REQUEST, MISSING_MESSAGES)
    })?;

    match state.chat.relay(&request).await {
        Ok(reply) => Ok(Json(reply)),
        Err(MonitorError::UpstreamHttp { status, body }) => {
            error!(status, %body, "Chat upstream failed");
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            Err(ApiError::new(status, "LLM upstream error").with_details(body))
        }
        Err(e) => {
            if e.is_upstream() {
                error!(error = %e, "Chat proxy error");
            } else {
                warn!(error = %e, "Rejected chat request");
            }
            Err(ApiError::from_monitor(e, CHAT_FAILED))
        }
    }
}

/// Everything the router does not match. `/api/*` misses are JSON 404s; other
/// GETs get a file from the static directory or, failing that, `index.html`.
pub async fn static_fallback(State(state): State<AppState>, request: Request) -> Response {
    let is_page_request = matches!(*request.method(), Method::GET | Method::HEAD)
        && !request.uri().path().starts_with("/api/");
    if !is_page_request {
        return ApiError::new(StatusCode::NOT_FOUND, "Not found").into_response();
    }

    let static_dir = &state.config.server.static_dir;
    let service = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    match service.oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
