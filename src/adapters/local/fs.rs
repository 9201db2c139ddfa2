use crate::domain::keys::{sanitize_file_name, unique_key};
use crate::domain::StoredLocator;
use crate::ports::storage::{ClipReader, StorageError, StoragePort, StorageResult};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Prefix of in-flight files inside the upload root. Never handed out as locators.
const INCOMING_PREFIX: &str = ".incoming-";

/// Stores clips as plain files under one upload directory.
#[derive(Debug, Clone)]
pub struct LocalDiskStore {
    root: PathBuf,
}

impl LocalDiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn ensure_root(&self) -> StorageResult<()> {
        // create_dir_all is a no-op for an existing directory
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::Unavailable {
                target: self.root.display().to_string(),
                source: Box::new(e),
            })
    }

    fn path_for(&self, locator: &StoredLocator) -> StorageResult<PathBuf> {
        let path = PathBuf::from(locator.as_str());
        let owned = path.parent() == Some(self.root.as_path())
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| !n.starts_with(INCOMING_PREFIX) && n != "..");

        if owned {
            Ok(path)
        } else {
            Err(StorageError::ForeignLocator(locator.to_string()))
        }
    }
}

#[async_trait]
impl StoragePort for LocalDiskStore {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn save(
        &self,
        mut reader: ClipReader,
        declared_name: &str,
        declared_size: Option<u64>,
    ) -> StorageResult<StoredLocator> {
        let file_name = sanitize_file_name(declared_name)
            .ok_or_else(|| StorageError::InvalidName(declared_name.to_string()))?;
        self.ensure_root().await?;

        let key = unique_key(&file_name);
        let target = self.root.join(&key);
        let start = Instant::now();

        // The spool lives next to the target so the final rename stays on one filesystem.
        // Dropping it (error, timeout, cancelled request) removes the partial file.
        let root = self.root.clone();
        let (spool, file) = blocking(move || {
            let spool = tempfile::Builder::new()
                .prefix(INCOMING_PREFIX)
                .tempfile_in(root)?;
            let file = spool.reopen()?;
            Ok((spool, file))
        })
        .await
        .map_err(|e| write_failed(&key, e))?;
        let mut writer = BufWriter::new(File::from_std(file));

        let written = tokio::io::copy(&mut reader, &mut writer)
            .await
            .map_err(|e| write_failed(&key, e))?;
        writer.flush().await.map_err(|e| write_failed(&key, e))?;
        writer
            .into_inner()
            .sync_all()
            .await
            .map_err(|e| write_failed(&key, e))?;

        let destination = target.clone();
        blocking(move || {
            spool
                .persist_noclobber(destination)
                .map(drop)
                .map_err(|e| e.error)
        })
        .await
        .map_err(|e| write_failed(&key, e))?;

        if let Some(declared) = declared_size.filter(|&d| d != written) {
            tracing::debug!(key = %key, declared, written, "declared size differs from stored size");
        }

        tracing::info!(
            path = %target.display(),
            key = %key,
            size_bytes = written,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local clip saved"
        );

        Ok(StoredLocator::new(target.to_string_lossy()))
    }

    async fn fetch(&self, locator: &StoredLocator) -> StorageResult<Vec<u8>> {
        let path = self.path_for(locator)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| StorageError::ReadFailed {
                locator: locator.to_string(),
                source: Box::new(e),
            })
    }
}

/// Run a blocking filesystem call off the async workers.
async fn blocking<T, F>(op: F) -> io::Result<T>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(io::Error::other)?
}

fn write_failed(key: &str, err: io::Error) -> StorageError {
    tracing::error!(backend = "local", key = %key, error = %err, "Local clip write failed");
    StorageError::WriteFailed {
        key: key.to_string(),
        source: Box::new(err),
    }
}
