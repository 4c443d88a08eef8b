//! Generation request entity and its lifecycle states

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::params::Parameters;
use crate::types::{ContentType, ModelSettings, TokenUsage};

/// Request lifecycle states.
///
/// Legal transitions are pending -> processing -> completed | failed.
/// Terminal states never revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "pending"),
            RequestStatus::Processing => write!(f, "processing"),
            RequestStatus::Completed => write!(f, "completed"),
            RequestStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Caller-supplied fields for submitting a generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRequest {
    pub organization_id: Uuid,
    pub course_id: Uuid,
    pub module_id: Option<Uuid>,
    pub content_type: ContentType,
    /// Optional template category hint (e.g. "stem", "language")
    pub category: Option<String>,
    /// Pin a specific template instead of best-match selection
    pub template_id: Option<Uuid>,
    pub parameters: Parameters,
    pub model: ModelSettings,
    pub use_rag: bool,
    pub use_cache: bool,
    pub max_retries: u32,
    pub timeout_seconds: u64,
}

impl NewRequest {
    pub fn new(organization_id: Uuid, course_id: Uuid, content_type: ContentType) -> Self {
        Self {
            organization_id,
            course_id,
            module_id: None,
            content_type,
            category: None,
            template_id: None,
            parameters: Parameters::new(),
            model: ModelSettings::default(),
            use_rag: false,
            use_cache: true,
            max_retries: 2,
            timeout_seconds: 30,
        }
    }
}

/// A single content generation request moving through the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub course_id: Uuid,
    pub module_id: Option<Uuid>,
    pub content_type: ContentType,
    pub category: Option<String>,
    pub template_id: Option<Uuid>,
    pub status: RequestStatus,
    pub parameters: Parameters,
    pub model: ModelSettings,
    pub use_rag: bool,
    pub use_cache: bool,
    pub max_retries: u32,
    /// Attempts consumed so far, shared by provider retries and
    /// quality-gate retries
    pub retry_count: u32,
    pub timeout_seconds: u64,
    pub result_id: Option<Uuid>,
    pub error_message: Option<String>,
    pub tokens: TokenUsage,
    pub cost: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GenerationRequest {
    pub fn new(spec: NewRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id: spec.organization_id,
            course_id: spec.course_id,
            module_id: spec.module_id,
            content_type: spec.content_type,
            category: spec.category,
            template_id: spec.template_id,
            status: RequestStatus::Pending,
            parameters: spec.parameters,
            model: spec.model,
            use_rag: spec.use_rag,
            use_cache: spec.use_cache,
            max_retries: spec.max_retries,
            retry_count: 0,
            timeout_seconds: spec.timeout_seconds,
            result_id: None,
            error_message: None,
            tokens: TokenUsage::default(),
            cost: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_completed(&mut self, result_id: Uuid) {
        self.status = RequestStatus::Completed;
        self.result_id = Some(result_id);
        self.error_message = None;
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = RequestStatus::Failed;
        self.error_message = Some(message.into());
        self.updated_at = Utc::now();
    }
}
