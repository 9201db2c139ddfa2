use crate::config::ObjectStoreSettings;
use crate::domain::keys::{sanitize_file_name, unique_key};
use crate::domain::StoredLocator;
use crate::ports::storage::{ClipReader, StorageError, StoragePort, StorageResult};
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tokio::sync::OnceCell;

/// Upper bound for buffer pre-allocation from an advisory declared size.
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// S3ObjectStore implements StoragePort for any S3-compatible service (AWS, MinIO, ...).
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    endpoint: String,
    bucket_ready: Arc<OnceCell<()>>,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: String, endpoint: String) -> Self {
        Self {
            client,
            bucket,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket_ready: Arc::new(OnceCell::new()),
        }
    }

    /// Build a client for the configured endpoint.
    ///
    /// Path-style addressing is forced (MinIO needs it) and SDK retries are
    /// disabled: a failed save surfaces to the caller on the first attempt.
    pub async fn connect(settings: &ObjectStoreSettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .endpoint_url(&settings.endpoint)
            .retry_config(RetryConfig::disabled());

        if let (Some(access_key), Some(secret_key)) =
            (&settings.access_key_id, &settings.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "video-ingest-static",
            ));
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        Self::new(
            Client::from_conf(s3_config),
            settings.bucket.clone(),
            settings.endpoint.clone(),
        )
    }

    fn locator_for(&self, key: &str) -> StoredLocator {
        StoredLocator::new(format!("{}/{}/{}", self.endpoint, self.bucket, key))
    }

    fn key_from_locator<'a>(&self, locator: &'a StoredLocator) -> Option<&'a str> {
        locator
            .as_str()
            .strip_prefix(self.endpoint.as_str())?
            .strip_prefix('/')?
            .strip_prefix(self.bucket.as_str())?
            .strip_prefix('/')
            .filter(|key| !key.is_empty() && !key.contains('/'))
    }

    async fn ensure_bucket(&self) -> StorageResult<()> {
        self.bucket_ready
            .get_or_try_init(|| async {
                match self.client.create_bucket().bucket(&self.bucket).send().await {
                    Ok(_) => {
                        tracing::info!(bucket = %self.bucket, "Created bucket");
                        Ok(())
                    }
                    Err(err) => match err.as_service_error() {
                        Some(e) if e.is_bucket_already_owned_by_you() || e.is_bucket_already_exists() => {
                            Ok(())
                        }
                        _ => {
                            tracing::error!(bucket = %self.bucket, error = %err, "Bucket creation failed");
                            Err(StorageError::Unavailable {
                                target: self.bucket.clone(),
                                source: Box::new(err),
                            })
                        }
                    },
                }
            })
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl StoragePort for S3ObjectStore {
    fn backend(&self) -> &'static str {
        "s3"
    }

    async fn save(
        &self,
        mut reader: ClipReader,
        declared_name: &str,
        declared_size: Option<u64>,
    ) -> StorageResult<StoredLocator> {
        let file_name = sanitize_file_name(declared_name)
            .ok_or_else(|| StorageError::InvalidName(declared_name.to_string()))?;
        self.ensure_bucket().await?;

        let key = unique_key(&file_name);
        let start = Instant::now();

        let capacity = declared_size.unwrap_or(0).min(MAX_PREALLOCATION) as usize;
        let mut body = Vec::with_capacity(capacity);
        reader
            .read_to_end(&mut body)
            .await
            .map_err(|e| StorageError::WriteFailed {
                key: key.clone(),
                source: Box::new(e),
            })?;
        let size = body.len();

        // A single PutObject is all-or-nothing: no partial object on failure.
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_length(size as i64)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                StorageError::WriteFailed {
                    key: key.clone(),
                    source: Box::new(e),
                }
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(self.locator_for(&key))
    }

    async fn fetch(&self, locator: &StoredLocator) -> StorageResult<Vec<u8>> {
        let key = self
            .key_from_locator(locator)
            .ok_or_else(|| StorageError::ForeignLocator(locator.to_string()))?;

        let read_failed = |source: Box<dyn std::error::Error + Send + Sync>| {
            StorageError::ReadFailed {
                locator: locator.to_string(),
                source,
            }
        };

        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| read_failed(Box::new(e)))?;

        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| read_failed(Box::new(e)))?;
        Ok(body.into_bytes().to_vec())
    }
}
