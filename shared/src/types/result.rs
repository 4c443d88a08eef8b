//! Generated content artifacts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::QualityLevel;

/// A produced content artifact.
///
/// Results are immutable once written; refinement produces a new
/// version linked through `parent_result_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub id: Uuid,
    pub request_id: Uuid,
    /// Verbatim provider output
    pub raw_output: String,
    /// Post-processed content served to callers
    pub processed_content: String,
    pub quality_score_id: Option<Uuid>,
    pub quality_level: QualityLevel,
    /// True when served from cache without a provider invocation
    pub cached: bool,
    pub cache_key: Option<String>,
    pub version: u32,
    pub parent_result_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl GenerationResult {
    pub fn new(request_id: Uuid, raw_output: String, processed_content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            raw_output,
            processed_content,
            quality_score_id: None,
            quality_level: QualityLevel::Poor,
            cached: false,
            cache_key: None,
            version: 1,
            parent_result_id: None,
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    /// Next version in a refinement lineage
    pub fn refined_from(parent: &GenerationResult, raw_output: String, processed_content: String) -> Self {
        let mut result = Self::new(parent.request_id, raw_output, processed_content);
        result.version = parent.version + 1;
        result.parent_result_id = Some(parent.id);
        result
    }
}
