use crate::domain::StoredLocator;
use async_trait::async_trait;
use std::error::Error;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Owned byte stream handed to a backend; consumed until EOF.
pub type ClipReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

pub type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid file name {0:?}")]
    InvalidName(String),

    #[error("storage target {target} unavailable: {source}")]
    Unavailable {
        target: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to write {key}: {source}")]
    WriteFailed {
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to read {locator}: {source}")]
    ReadFailed {
        locator: String,
        #[source]
        source: BoxError,
    },

    #[error("locator {0} was not produced by this backend")]
    ForeignLocator(String),

    #[error("storage did not finish within {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Short backend label for log context.
    fn backend(&self) -> &'static str;

    /// Persist the full stream under a freshly generated unique key.
    ///
    /// `declared_size` is advisory; the stream is always read to EOF.
    /// A locator is only returned once the complete content is durable.
    async fn save(
        &self,
        reader: ClipReader,
        declared_name: &str,
        declared_size: Option<u64>,
    ) -> StorageResult<StoredLocator>;

    /// Read back the content behind a locator produced by `save`.
    async fn fetch(&self, locator: &StoredLocator) -> StorageResult<Vec<u8>>;
}

#[async_trait]
impl<T: StoragePort + ?Sized> StoragePort for Arc<T> {
    fn backend(&self) -> &'static str {
        (**self).backend()
    }

    async fn save(
        &self,
        reader: ClipReader,
        declared_name: &str,
        declared_size: Option<u64>,
    ) -> StorageResult<StoredLocator> {
        (**self).save(reader, declared_name, declared_size).await
    }

    async fn fetch(&self, locator: &StoredLocator) -> StorageResult<Vec<u8>> {
        (**self).fetch(locator).await
    }
}
