//! HTTP error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use manzai_core::UsageRecord;
use manzai_error::{LedgerErrorKind, ManzaiError, ManzaiErrorKind, PipelineErrorKind};
use serde_json::{Value, json};
use tracing::{error, warn};

/// A failed request, ready to render as JSON.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ApiError {
    /// Anything but POST on an API route
    #[display("Method Not Allowed")]
    MethodNotAllowed,
    /// Client input error
    #[display("{}", _0)]
    BadRequest(String),
    /// Quota exhausted and no paid credits
    #[display("{}", message)]
    QuotaExceeded {
        /// User-facing message
        message: String,
        /// Current usage count
        usage_count: u64,
        /// Current paid credit balance
        paid_credits: u64,
    },
    /// Server-side failure
    #[display("{}", message)]
    Internal {
        /// User-facing message
        message: String,
        /// Diagnostic detail, withheld in production
        detail: Option<String>,
    },
}

impl ApiError {
    /// 403 for a user whose free quota and paid credits are both spent.
    pub fn quota_exceeded(free_quota: u64, record: &UsageRecord) -> Self {
        ApiError::QuotaExceeded {
            message: format!("使用上限（{free_quota}回）に達しており、クレジットが不足しています。"),
            usage_count: record.output_count,
            paid_credits: record.paid_credits,
        }
    }

    /// 500 with an optional detail string.
    pub fn internal(message: impl Into<String>, detail: Option<String>) -> Self {
        ApiError::Internal {
            message: message.into(),
            detail,
        }
    }

    /// Map a workspace error, keeping `detail` only outside production.
    pub fn from_manzai(err: &ManzaiError, production: bool) -> Self {
        let detail = |text: String| (!production).then_some(text);
        match err.kind() {
            ManzaiErrorKind::Ledger(e) => match &e.kind {
                LedgerErrorKind::MissingUserId => ApiError::BadRequest(e.kind.to_string()),
                LedgerErrorKind::UnsupportedProduct(_) => ApiError::BadRequest("unsupported product_id".into()),
                LedgerErrorKind::StoreNotConfigured => ApiError::internal(e.kind.to_string(), None),
            },
            ManzaiErrorKind::Pipeline(e) => match &e.kind {
                PipelineErrorKind::InitialGeneration(cause) => {
                    ApiError::internal("xAI request failed", detail(cause.clone()))
                }
                PipelineErrorKind::EmptyOutput => ApiError::internal(e.kind.to_string(), None),
            },
            _ => ApiError::internal("Server Error", detail(err.to_string())),
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        match self {
            ApiError::QuotaExceeded {
                message,
                usage_count,
                paid_credits,
            } => json!({
                "error": message,
                "usage_count": usage_count,
                "paid_credits": paid_credits,
            }),
            ApiError::Internal {
                message,
                detail: Some(detail),
            } => json!({ "error": message, "detail": detail }),
            other => json!({ "error": other.to_string() }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}
