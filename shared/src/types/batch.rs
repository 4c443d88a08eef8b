//! Batch generation entities and progress accounting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::params::Parameters;
use crate::types::{ContentType, ModelSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchStatus {
    Created,
    Queued,
    Processing,
    Completed,
    Failed,
    PartiallyFailed,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchStatus::Completed | BatchStatus::Failed | BatchStatus::PartiallyFailed
        )
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchStatus::Created => write!(f, "created"),
            BatchStatus::Queued => write!(f, "queued"),
            BatchStatus::Processing => write!(f, "processing"),
            BatchStatus::Completed => write!(f, "completed"),
            BatchStatus::Failed => write!(f, "failed"),
            BatchStatus::PartiallyFailed => write!(f, "partially_failed"),
        }
    }
}

/// Caller-supplied shape of a batch: the cartesian product of
/// `target_modules` and `content_types` becomes individual requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSpec {
    pub organization_id: Uuid,
    pub course_id: Uuid,
    pub target_modules: Vec<Uuid>,
    pub content_types: Vec<ContentType>,
    pub shared_parameters: Parameters,
    pub category: Option<String>,
    pub model: ModelSettings,
    pub use_rag: bool,
    pub use_cache: bool,
    pub max_retries: u32,
    pub timeout_seconds: u64,
    pub max_batch_size: usize,
    pub parallel_workers: usize,
}

impl BatchSpec {
    pub fn new(organization_id: Uuid, course_id: Uuid) -> Self {
        Self {
            organization_id,
            course_id,
            target_modules: Vec::new(),
            content_types: Vec::new(),
            shared_parameters: Parameters::new(),
            category: None,
            model: ModelSettings::default(),
            use_rag: false,
            use_cache: true,
            max_retries: 2,
            timeout_seconds: 30,
            max_batch_size: 50,
            parallel_workers: 4,
        }
    }

    pub fn expansion_size(&self) -> usize {
        self.target_modules.len() * self.content_types.len()
    }
}

/// A batch of generation requests executed by a bounded worker pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchGeneration {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub course_id: Uuid,
    pub shared_parameters: Parameters,
    pub content_types: Vec<ContentType>,
    pub target_modules: Vec<Uuid>,
    pub max_batch_size: usize,
    pub parallel_workers: usize,
    pub request_ids: Vec<Uuid>,
    pub status: BatchStatus,
    pub total_items: usize,
    pub completed_items: usize,
    pub failed_items: usize,
    /// Items never started because the batch was cancelled
    pub skipped_items: usize,
    /// Advisory pickup counter, not a completion measure
    pub current_item_index: usize,
    pub progress_percentage: f64,
    pub estimated_cost: f64,
    pub actual_cost: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BatchGeneration {
    pub fn new(spec: &BatchSpec, request_ids: Vec<Uuid>, estimated_cost: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id: spec.organization_id,
            course_id: spec.course_id,
            shared_parameters: spec.shared_parameters.clone(),
            content_types: spec.content_types.clone(),
            target_modules: spec.target_modules.clone(),
            max_batch_size: spec.max_batch_size,
            parallel_workers: spec.parallel_workers,
            total_items: request_ids.len(),
            request_ids,
            status: BatchStatus::Created,
            completed_items: 0,
            failed_items: 0,
            skipped_items: 0,
            current_item_index: 0,
            progress_percentage: 0.0,
            estimated_cost,
            actual_cost: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Recompute progress from the settled-item counters.
    ///
    /// Skipped items count toward progress so a cancelled batch still
    /// reaches 100%.
    pub fn refresh_progress(&mut self) {
        let settled = self.completed_items + self.failed_items + self.skipped_items;
        self.progress_percentage = if self.total_items == 0 {
            100.0
        } else {
            (settled as f64 / self.total_items as f64) * 100.0
        };
        self.updated_at = Utc::now();
    }

    /// Terminal status once every item settled: completed when nothing
    /// failed, failed when everything did, partial otherwise
    pub fn terminal_status(&self) -> BatchStatus {
        if self.failed_items == 0 {
            BatchStatus::Completed
        } else if self.failed_items == self.total_items {
            BatchStatus::Failed
        } else {
            BatchStatus::PartiallyFailed
        }
    }
}
