//! Ports - Trait definitions implemented by adapters.

pub mod queue;
pub mod storage;

pub use queue::{PublishError, TaskPublisherPort};
pub use storage::{ClipReader, StorageError, StoragePort, StorageResult};
