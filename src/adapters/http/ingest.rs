use super::error::ApiError;
use super::IngestState;
use crate::domain::keys::sanitize_file_name;
use crate::domain::UploadedClip;
use crate::ports::{StoragePort, TaskPublisherPort};
use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, Request, State};
use axum::http::header::CONTENT_LENGTH;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::io;
use tempfile::NamedTempFile;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Multipart field carrying the clip.
pub const VIDEO_FIELD: &str = "video_clip";

/// Reject requests whose declared length is over the limit before the body is touched.
pub async fn reject_oversized(State(limit): State<u64>, request: Request, next: Next) -> Response {
    match declared_length(request.headers()) {
        Some(length) if length > limit => ApiError::PayloadTooLarge { limit }.into_response(),
        _ => next.run(request).await,
    }
}

/// POST handler: spool the `video_clip` field, then hand it to the ingestion service.
pub async fn ingest_video<S, P>(
    State(state): State<IngestState<S, P>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<String, ApiError>
where
    S: StoragePort + 'static,
    P: TaskPublisherPort + 'static,
{
    let mut multipart = multipart.map_err(|e| ApiError::MalformedMultipart(e.body_text()))?;
    let clip = extract_clip(&mut multipart, state.max_upload_bytes).await?;
    let file_name = clip.file_name().to_string();

    tracing::info!(file_name = %file_name, size_bytes = clip.size(), "Received clip");

    // Detached so a client disconnect cannot abandon a half-finished save or publish.
    let service = state.service.clone();
    let outcome = tokio::spawn(async move { service.process_video(clip).await }).await;

    // Detailed failures are logged once, by ApiError::into_response.
    outcome??;
    Ok(format!(
        "File {} uploaded and scheduled for analysis.",
        file_name
    ))
}

/// Take the first `video_clip` file part; other parts are skipped.
async fn extract_clip(multipart: &mut Multipart, limit: u64) -> Result<UploadedClip, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        let declared = field
            .file_name()
            .ok_or(ApiError::MissingField(VIDEO_FIELD))?
            .to_string();
        if sanitize_file_name(&declared).is_none() {
            return Err(ApiError::InvalidFileName(declared));
        }

        return spool_field(field, declared, limit).await;
    }

    Err(ApiError::MissingField(VIDEO_FIELD))
}

/// Save a multipart field to a temporary file, counting bytes against the limit.
async fn spool_field(
    mut field: Field<'_>,
    file_name: String,
    limit: u64,
) -> Result<UploadedClip, ApiError> {
    let (spool, file) = tokio::task::spawn_blocking(|| {
        let spool = NamedTempFile::new()?;
        let file = spool.reopen()?;
        Ok::<_, io::Error>((spool, file))
    })
    .await
    .map_err(io::Error::other)
    .and_then(|created| created)
    .map_err(ApiError::Spool)?;
    let mut writer = BufWriter::new(File::from_std(file));
    let mut size: u64 = 0;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        size += chunk.len() as u64;
        if size > limit {
            return Err(ApiError::PayloadTooLarge { limit });
        }
        writer.write_all(&chunk).await.map_err(ApiError::Spool)?;
    }
    writer.flush().await.map_err(ApiError::Spool)?;

    Ok(UploadedClip::new(file_name, size, spool.into_temp_path()))
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn multipart_error(err: MultipartError, limit: u64) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge { limit }
    } else {
        ApiError::MalformedMultipart(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::CONTENT_TYPE;
    use axum::http::HeaderValue;

    #[test]
    fn test_declared_length_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(declared_length(&headers), None);

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("1048576"));
        assert_eq!(declared_length(&headers), Some(1_048_576));

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("lots"));
        assert_eq!(declared_length(&headers), None);

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("multipart/form-data"));
        assert_eq!(declared_length(&headers), None);
    }
}
