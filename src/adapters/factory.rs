#[cfg(feature = "s3")]
use super::aws::S3ObjectStore;
use super::local::LocalDiskStore;
use crate::config::{ConfigError, StorageSettings};
use crate::ports::StoragePort;
use std::sync::Arc;

/// Create the storage backend named by configuration. Called once by the composition root.
pub async fn build_storage(
    settings: &StorageSettings,
) -> Result<Arc<dyn StoragePort>, ConfigError> {
    let storage: Arc<dyn StoragePort> = match settings {
        StorageSettings::Local { upload_dir } => {
            tracing::info!(upload_dir = %upload_dir.display(), "Using local disk storage");
            Arc::new(LocalDiskStore::new(upload_dir.clone()))
        }

        #[cfg(feature = "s3")]
        StorageSettings::S3(s3) => {
            tracing::info!(endpoint = %s3.endpoint, bucket = %s3.bucket, "Using S3 object storage");
            Arc::new(S3ObjectStore::connect(s3).await)
        }

        #[cfg(not(feature = "s3"))]
        StorageSettings::S3(_) => return Err(ConfigError::BackendNotCompiled),
    };

    Ok(storage)
}
