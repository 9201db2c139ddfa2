use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::io::Write;
use tempfile::{NamedTempFile, TempPath};

/// One inbound video file, spooled to a temporary file for the duration of a request.
///
/// The spool is removed when the clip is dropped, whichever way the request ends.
#[derive(Debug)]
pub struct UploadedClip {
    file_name: String,
    size: u64,
    spool: TempPath,
}

impl UploadedClip {
    pub fn new(file_name: impl Into<String>, size: u64, spool: TempPath) -> Self {
        Self {
            file_name: file_name.into(),
            size,
            spool,
        }
    }

    /// Spool an in-memory payload. Handy for callers that already hold the bytes.
    pub fn from_bytes(file_name: impl Into<String>, data: &[u8]) -> io::Result<Self> {
        let mut spool = NamedTempFile::new()?;
        spool.write_all(data)?;
        spool.flush()?;
        Ok(Self::new(file_name, data.len() as u64, spool.into_temp_path()))
    }

    /// File name as declared by the uploader (untrusted).
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Number of bytes actually received.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Open a fresh reader over the spooled content.
    pub async fn open(&self) -> io::Result<tokio::fs::File> {
        tokio::fs::File::open(&self.spool).await
    }
}

/// Where a clip durably resides: a filesystem path or an object-store URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredLocator(String);

impl StoredLocator {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for StoredLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
