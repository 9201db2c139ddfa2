use crate::config::DEFAULT_STORAGE_TIMEOUT;
use crate::domain::{AnalysisTask, StoredLocator, UploadedClip, VIDEO_ANALYSIS_QUEUE};
use crate::ports::queue::{PublishError, TaskPublisherPort};
use crate::ports::storage::{StorageError, StoragePort};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("task publish failed: {0}")]
    Publish(#[from] PublishError),
}

/// Stores an uploaded clip, then schedules it for analysis.
///
/// Holds no per-request state; one instance serves all requests concurrently.
pub struct IngestionService<S, P> {
    storage: S,
    publisher: P,
    queue: String,
    storage_timeout: Duration,
}

impl<S, P> IngestionService<S, P>
where
    S: StoragePort,
    P: TaskPublisherPort,
{
    pub fn new(storage: S, publisher: P) -> Self {
        Self {
            storage,
            publisher,
            queue: VIDEO_ANALYSIS_QUEUE.to_string(),
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    pub fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.storage_timeout = timeout;
        self
    }

    #[cfg(test)]
    pub(crate) fn storage(&self) -> &S {
        &self.storage
    }

    /// Save the clip, then publish a task pointing at it.
    ///
    /// Storage and publish are not transactional. When publishing fails after a
    /// successful save, the clip stays stored without a task and the error is returned.
    pub async fn process_video(&self, clip: UploadedClip) -> Result<StoredLocator, IngestError> {
        let backend = self.storage.backend();
        let reader = clip.open().await.map_err(StorageError::from)?;

        let locator = tokio::time::timeout(
            self.storage_timeout,
            self.storage
                .save(Box::pin(reader), clip.file_name(), Some(clip.size())),
        )
        .await
        .unwrap_or_else(|_| Err(StorageError::Timeout(self.storage_timeout)))?;

        let task = AnalysisTask::for_locator(&locator);
        if let Err(e) = self.publisher.publish(&self.queue, &task).await {
            tracing::warn!(
                backend,
                locator = %locator,
                queue = %self.queue,
                error = %e,
                "Clip stored but no analysis task was published"
            );
            return Err(e.into());
        }

        tracing::info!(
            backend,
            locator = %locator,
            queue = %self.queue,
            size_bytes = clip.size(),
            "Clip ingested"
        );
        Ok(locator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::local::LocalDiskStore;
    use crate::ports::queue::MockTaskPublisherPort;
    use crate::ports::storage::{ClipReader, MockStoragePort, StorageResult};
    use async_trait::async_trait;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    fn clip() -> UploadedClip {
        UploadedClip::from_bytes("clip.mp4", b"0123456789").unwrap()
    }

    fn storage_returning(locator: &'static str) -> MockStoragePort {
        let mut storage = MockStoragePort::new();
        storage.expect_backend().return_const("mock");
        storage
            .expect_save()
            .times(1)
            .returning(move |_, _, _| Ok(StoredLocator::new(locator)));
        storage
    }

    #[tokio::test]
    async fn test_success_publishes_task_for_locator() {
        let storage = storage_returning("uploads/1-abc-clip.mp4");
        let mut publisher = MockTaskPublisherPort::new();
        publisher
            .expect_publish()
            .withf(|queue, task| {
                queue == "video_analysis_tasks" && task.video_path == "uploads/1-abc-clip.mp4"
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let service = IngestionService::new(storage, publisher);
        let locator = service.process_video(clip()).await.unwrap();

        assert_eq!(locator.as_str(), "uploads/1-abc-clip.mp4");
    }

    #[tokio::test]
    async fn test_storage_receives_declared_name_and_size() {
        let mut storage = MockStoragePort::new();
        storage.expect_backend().return_const("mock");
        storage
            .expect_save()
            .withf(|_, name, size| name == "clip.mp4" && *size == Some(10))
            .times(1)
            .returning(|_, _, _| Ok(StoredLocator::new("loc")));
        let mut publisher = MockTaskPublisherPort::new();
        publisher.expect_publish().returning(|_, _| Ok(()));

        IngestionService::new(storage, publisher)
            .process_video(clip())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_storage_failure_skips_publish() {
        let mut storage = MockStoragePort::new();
        storage.expect_backend().return_const("mock");
        storage.expect_save().times(1).returning(|_, _, _| {
            Err(StorageError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "read-only volume",
            )))
        });
        let mut publisher = MockTaskPublisherPort::new();
        publisher.expect_publish().never();

        let result = IngestionService::new(storage, publisher)
            .process_video(clip())
            .await;

        assert!(matches!(result, Err(IngestError::Storage(_))));
    }

    #[tokio::test]
    async fn test_publish_failure_is_reported() {
        let storage = storage_returning("uploads/1-abc-clip.mp4");
        let mut publisher = MockTaskPublisherPort::new();
        publisher
            .expect_publish()
            .times(1)
            .returning(|_, _| Err(PublishError::Timeout(Duration::from_secs(5))));

        let result = IngestionService::new(storage, publisher)
            .process_video(clip())
            .await;

        assert!(matches!(
            result,
            Err(IngestError::Publish(PublishError::Timeout(_)))
        ));
    }

    #[tokio::test]
    async fn test_custom_queue_name_is_used() {
        let storage = storage_returning("loc");
        let mut publisher = MockTaskPublisherPort::new();
        publisher
            .expect_publish()
            .withf(|queue, _| queue == "priority_tasks")
            .times(1)
            .returning(|_, _| Ok(()));

        IngestionService::new(storage, publisher)
            .with_queue("priority_tasks")
            .process_video(clip())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_clip_stays_stored_when_publish_fails() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(LocalDiskStore::new(dir.path()));
        let published = Arc::new(Mutex::new(Vec::new()));

        let mut publisher = MockTaskPublisherPort::new();
        let seen = published.clone();
        publisher.expect_publish().times(1).returning(move |_, task| {
            seen.lock().unwrap().push(task.clone());
            Err(PublishError::Rejected("video_analysis_tasks".to_string()))
        });

        let service = IngestionService::new(storage.clone(), publisher);
        let result = service.process_video(clip()).await;
        assert!(matches!(result, Err(IngestError::Publish(_))));

        // The task that failed to go out still names a readable, complete object.
        let tasks = published.lock().unwrap().clone();
        assert_eq!(tasks.len(), 1);
        let orphan = StoredLocator::new(tasks[0].video_path.clone());
        assert_eq!(storage.fetch(&orphan).await.unwrap(), b"0123456789");
    }

    #[tokio::test]
    async fn test_identical_names_in_parallel_are_both_kept() {
        let dir = tempdir().unwrap();
        let storage = LocalDiskStore::new(dir.path());
        let mut publisher = MockTaskPublisherPort::new();
        publisher.expect_publish().times(2).returning(|_, _| Ok(()));
        let service = IngestionService::new(storage, publisher);

        let first = UploadedClip::from_bytes("clip.mp4", b"first").unwrap();
        let second = UploadedClip::from_bytes("clip.mp4", b"second").unwrap();
        let (a, b) = tokio::join!(service.process_video(first), service.process_video(second));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a, b);
        assert_eq!(service.storage().fetch(&a).await.unwrap(), b"first");
        assert_eq!(service.storage().fetch(&b).await.unwrap(), b"second");
    }

    struct StalledStorage;

    #[async_trait]
    impl StoragePort for StalledStorage {
        fn backend(&self) -> &'static str {
            "stalled"
        }

        async fn save(
            &self,
            _reader: ClipReader,
            _declared_name: &str,
            _declared_size: Option<u64>,
        ) -> StorageResult<StoredLocator> {
            std::future::pending().await
        }

        async fn fetch(&self, locator: &StoredLocator) -> StorageResult<Vec<u8>> {
            Err(StorageError::ForeignLocator(locator.to_string()))
        }
    }

    #[tokio::test]
    async fn test_slow_storage_is_bounded() {
        let mut publisher = MockTaskPublisherPort::new();
        publisher.expect_publish().never();

        let result = IngestionService::new(StalledStorage, publisher)
            .with_storage_timeout(Duration::from_millis(20))
            .process_video(clip())
            .await;

        assert!(matches!(
            result,
            Err(IngestError::Storage(StorageError::Timeout(_)))
        ));
    }
}
