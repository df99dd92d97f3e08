use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::upload::UploadError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Content store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("Search engine error: {0}")]
    SearchEngine(#[from] meilisearch_sdk::errors::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Upload failures carry their own status and structured body.
        if let AppError::Upload(err) = self {
            return err.into_response();
        }

        let status = match self {
            AppError::MalformedPayload => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Store { .. }
            | AppError::SearchEngine { .. }
            | AppError::Serialization { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upload { .. } => unreachable!(),
        };

        (status, self.to_string()).into_response()
    }
}
