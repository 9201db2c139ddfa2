use super::clip::StoredLocator;
use serde::{Deserialize, Serialize};

/// Durable queue consumed by the analysis workers.
pub const VIDEO_ANALYSIS_QUEUE: &str = "video_analysis_tasks";

/// Message handed to the broker for one stored clip.
///
/// Wire format is the JSON object `{"video_path": "<locator>"}`; consumers depend on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisTask {
    pub video_path: String,
}

impl AnalysisTask {
    pub fn for_locator(locator: &StoredLocator) -> Self {
        Self {
            video_path: locator.as_str().to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
