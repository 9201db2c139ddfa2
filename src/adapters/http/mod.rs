//! HTTP inbound adapter: the single `POST /ingest/video` endpoint.

mod error;
pub mod ingest;

pub use error::ApiError;

use crate::application::IngestionService;
use crate::ports::{StoragePort, TaskPublisherPort};
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::post;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub const INGEST_PATH: &str = "/ingest/video";

/// Shared handler state: the service plus the request body bound.
pub struct IngestState<S, P> {
    pub service: Arc<IngestionService<S, P>>,
    pub max_upload_bytes: u64,
}

impl<S, P> Clone for IngestState<S, P> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

/// Build the ingest router. Other methods on the path get 405 from axum.
pub fn router<S, P>(service: Arc<IngestionService<S, P>>, max_upload_bytes: u64) -> Router
where
    S: StoragePort + 'static,
    P: TaskPublisherPort + 'static,
{
    let body_limit = usize::try_from(max_upload_bytes).unwrap_or(usize::MAX);

    Router::new()
        .route(INGEST_PATH, post(ingest::ingest_video::<S, P>))
        .route_layer(middleware::from_fn_with_state(
            max_upload_bytes,
            ingest::reject_oversized,
        ))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(IngestState {
            service,
            max_upload_bytes,
        })
}
