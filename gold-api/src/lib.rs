pub mod handlers;
pub mod server;
pub mod state;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gold_core::MonitorError;
use serde::{Deserialize, Serialize};

/// Query string of `GET /api/history`.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub range: Option<String>,
    pub interval: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

pub type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Map an internal error onto the external shape. Upstream failures all
    /// become 502 with `upstream_message`; their detail stays server side.
    pub fn from_monitor(err: MonitorError, upstream_message: &str) -> Self {
        match err {
            MonitorError::UnsupportedInterval(_) => {
                Self::new(StatusCode::BAD_REQUEST, "Unsupported interval")
            }
            MonitorError::BadRequest(message) => Self::new(StatusCode::BAD_REQUEST, message),
            MonitorError::Configuration(message) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            _ => Self::new(StatusCode::BAD_GATEWAY, upstream_message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            details: self.details,
        });
        (self.status, body).into_response()
    }
}
