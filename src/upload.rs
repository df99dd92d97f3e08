//! Upload proxy.
//!
//! Admin image uploads pass through the backend on their way to the hosted
//! blob store, so the store credentials never reach a browser. Failures are
//! classified into a small taxonomy and answered as
//! `{error, details, suggestion}` with a matching status.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::{
    error::AppError,
    state::AppState,
    utils::{sanitize_object_name, timestamped},
};

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("filename is missing or contains no usable characters")]
    InvalidFilename,

    #[error("upload body is empty")]
    EmptyBody,

    #[error("upload exceeds the 5 MB limit")]
    TooLarge,

    #[error("blob store rejected the credentials")]
    Auth,

    #[error("blob store denied access")]
    Permission,

    #[error("blob store answered with an unreadable body")]
    MalformedResponse,

    #[error("blob store is unreachable: {0}")]
    Unreachable(String),

    #[error("upload failed: {0}")]
    Unknown(String),
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::InvalidFilename | UploadError::EmptyBody => StatusCode::BAD_REQUEST,
            UploadError::Auth => StatusCode::UNAUTHORIZED,
            UploadError::Permission => StatusCode::FORBIDDEN,
            UploadError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::MalformedResponse | UploadError::Unreachable { .. } => {
                StatusCode::BAD_GATEWAY
            }
            UploadError::Unknown { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn category(&self) -> &'static str {
        match self {
            UploadError::InvalidFilename => "invalid_filename",
            UploadError::EmptyBody => "empty_body",
            UploadError::TooLarge => "size_limit",
            UploadError::Auth => "auth",
            UploadError::Permission => "permission",
            UploadError::MalformedResponse => "malformed_response",
            UploadError::Unreachable { .. } => "upstream",
            UploadError::Unknown { .. } => "unknown",
        }
    }

    fn suggestion(&self) -> &'static str {
        match self {
            UploadError::InvalidFilename => {
                "Use a filename made of letters, digits, dots, dashes or underscores"
            }
            UploadError::EmptyBody => "Attach the file contents to the request body",
            UploadError::TooLarge => "Resize or compress the image below 5 MB",
            UploadError::Auth => "Check the blob store token in the deployment secrets",
            UploadError::Permission => "Check the token's write permissions for the bucket",
            UploadError::MalformedResponse | UploadError::Unreachable { .. } => {
                "Retry in a moment; the blob store may be down"
            }
            UploadError::Unknown { .. } => "Retry, and check the server logs if it persists",
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.category(),
            "details": self.to_string(),
            "suggestion": self.suggestion(),
        });

        (self.status(), Json(body)).into_response()
    }
}

/// Map a blob-store rejection onto the taxonomy: status first, message
/// substrings second.
pub fn classify_rejection(status: StatusCode, message: &str) -> UploadError {
    match status {
        StatusCode::UNAUTHORIZED => UploadError::Auth,
        StatusCode::FORBIDDEN => UploadError::Permission,
        StatusCode::PAYLOAD_TOO_LARGE => UploadError::TooLarge,
        _ => classify_message(message),
    }
}

pub fn classify_message(message: &str) -> UploadError {
    let lower = message.to_ascii_lowercase();

    if lower.contains("unauthorized") || lower.contains("invalid token") {
        UploadError::Auth
    } else if lower.contains("forbidden")
        || lower.contains("permission")
        || lower.contains("access denied")
    {
        UploadError::Permission
    } else if lower.contains("too large") || lower.contains("entity") {
        UploadError::TooLarge
    } else {
        UploadError::Unknown(message.chars().take(200).collect())
    }
}

#[derive(Deserialize)]
pub struct UploadParams {
    pub filename: Option<String>,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub url: String,
}

#[derive(Deserialize)]
struct BlobResponse {
    url: String,
}

pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<Json<UploadResponse>, AppError> {
    let filename = params.filename.as_deref().unwrap_or_default();
    let object = sanitize_object_name(filename).ok_or(UploadError::InvalidFilename)?;

    if body.is_empty() {
        return Err(UploadError::EmptyBody.into());
    }
    if body.len() > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge.into());
    }

    let object = timestamped(&object);
    let url = store_blob(&state, &object, body).await?;

    Ok(Json(UploadResponse { url }))
}

async fn store_blob(state: &AppState, object: &str, body: Bytes) -> Result<String, UploadError> {
    let endpoint = format!(
        "{}/{}",
        state.config.blob_endpoint.trim_end_matches('/'),
        object
    );

    let response = state
        .http_client
        .put(&endpoint)
        .bearer_auth(&state.config.blob_token)
        .body(body)
        .send()
        .await
        .map_err(|e| UploadError::Unreachable(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(classify_rejection(status, &message));
    }

    let payload: BlobResponse = response
        .json()
        .await
        .map_err(|_| UploadError::MalformedResponse)?;

    Ok(payload.url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_taxonomy() {
        assert_eq!(UploadError::InvalidFilename.status(), StatusCode::BAD_REQUEST);
        assert_eq!(UploadError::Auth.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(UploadError::Permission.status(), StatusCode::FORBIDDEN);
        assert_eq!(UploadError::TooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            UploadError::MalformedResponse.status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            UploadError::Unknown("x".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_classify_by_status_wins() {
        let err = classify_rejection(StatusCode::UNAUTHORIZED, "whatever");
        assert!(matches!(err, UploadError::Auth));

        let err = classify_rejection(StatusCode::PAYLOAD_TOO_LARGE, "");
        assert!(matches!(err, UploadError::TooLarge));
    }

    #[test]
    fn test_classify_by_message_substring() {
        let err = classify_rejection(StatusCode::BAD_REQUEST, "Access denied for bucket");
        assert!(matches!(err, UploadError::Permission));

        let err = classify_rejection(StatusCode::BAD_REQUEST, "request entity too big");
        assert!(matches!(err, UploadError::TooLarge));

        let err = classify_rejection(StatusCode::BAD_REQUEST, "mystery failure");
        assert!(matches!(err, UploadError::Unknown(_)));
    }

    #[test]
    fn test_response_body_shape() {
        let response = UploadError::TooLarge.into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
