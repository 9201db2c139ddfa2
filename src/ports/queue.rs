use crate::domain::AnalysisTask;
use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to serialize task: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("broker error: {0}")]
    Broker(#[source] Box<dyn Error + Send + Sync>),

    #[error("broker did not confirm within {0:?}")]
    Timeout(Duration),

    #[error("broker rejected message for queue {0}")]
    Rejected(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskPublisherPort: Send + Sync {
    /// Deliver a task to a durable queue, declaring the queue first if needed.
    ///
    /// Returns once the broker has accepted the message, or fails within the
    /// publisher's time window. Never retries.
    async fn publish(&self, queue: &str, task: &AnalysisTask) -> Result<(), PublishError>;
}

#[async_trait]
impl<T: TaskPublisherPort + ?Sized> TaskPublisherPort for Arc<T> {
    async fn publish(&self, queue: &str, task: &AnalysisTask) -> Result<(), PublishError> {
        (**self).publish(queue, task).await
    }
}
