use crate::application::IngestError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::io;
use thiserror::Error;
use tokio::task::JoinError;

/// Everything the ingest endpoint can answer with besides success.
///
/// Client errors carry their message to the caller. Server errors are logged
/// here and answered with a generic body so storage and broker details stay internal.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request body exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: u64 },

    #[error("missing file field `{0}`")]
    MissingField(&'static str),

    #[error("invalid file name {0:?}")]
    InvalidFileName(String),

    #[error("malformed multipart body: {0}")]
    MalformedMultipart(String),

    #[error("failed to buffer upload: {0}")]
    Spool(#[source] io::Error),

    #[error("video processing failed: {0}")]
    Processing(#[from] IngestError),

    #[error("ingestion task aborted: {0}")]
    Aborted(#[from] JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::PayloadTooLarge { .. }
            | ApiError::MissingField(_)
            | ApiError::InvalidFileName(_)
            | ApiError::MalformedMultipart(_) => StatusCode::BAD_REQUEST,
            ApiError::Spool(_) | ApiError::Processing(_) | ApiError::Aborted(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Ingest request failed");
            (status, "Failed to process video").into_response()
        } else {
            tracing::debug!(error = %self, "Rejected ingest request");
            (status, self.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::StorageError;
    use std::time::Duration;

    #[test]
    fn test_client_errors_map_to_400() {
        for err in [
            ApiError::PayloadTooLarge { limit: 10 },
            ApiError::MissingField("video_clip"),
            ApiError::InvalidFileName("..".to_string()),
            ApiError::MalformedMultipart("no boundary".to_string()),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let err = ApiError::Spool(io::Error::new(io::ErrorKind::Other, "/tmp is full"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Failed to process video");
    }

    #[tokio::test]
    async fn test_processing_error_keeps_cause_for_logging() {
        let cause = IngestError::Storage(StorageError::Timeout(Duration::from_secs(60)));
        let err = ApiError::from(cause);
        assert!(err.to_string().contains("60s"));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Failed to process video");
    }
}
