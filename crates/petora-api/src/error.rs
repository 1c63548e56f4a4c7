use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use petora_types::api::ErrorResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Internal(e) => {
                error!("Request failed: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!("Rejected request body: {}", rejection.body_text());
        ApiError::InvalidRequest("Malformed request body".into())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        warn!("Rejected query string: {}", rejection.body_text());
        ApiError::InvalidRequest("Malformed query string".into())
    }
}

/// Path identifiers are validated before any storage access.
pub fn parse_id(raw: &str, kind: &str) -> Result<Uuid, ApiError> {
    raw.parse::<Uuid>()
        .map_err(|_| ApiError::InvalidRequest(format!("Invalid {} ID", kind)))
}

/// Returns the trimmed value, or an invalid-request naming `field`.
pub fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, ApiError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::InvalidRequest(format!("{} is required", field))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_rejects_garbage() {
        assert!(matches!(parse_id("64f0ab", "group"), Err(ApiError::InvalidRequest(m)) if m == "Invalid group ID"));
        assert!(parse_id("6d2c1b9e-53a4-4c0e-9d55-1f3f5c0b2a11", "group").is_ok());
    }

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required(Some("  u1 "), "User ID").unwrap(), "u1");
        assert!(required(Some("   "), "User ID").is_err());
        assert!(required(None, "User ID").is_err());
    }

    #[test]
    fn internal_errors_hide_detail() {
        let resp = ApiError::Internal(anyhow::anyhow!("disk on fire")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
