//! Domain layer - Pure types shared by ports and adapters.

pub mod clip;
pub(crate) mod keys;
pub mod task;

pub use clip::{StoredLocator, UploadedClip};
pub use task::{AnalysisTask, VIDEO_ANALYSIS_QUEUE};
