//! Prompt templates and their effectiveness counters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::ContentType;

/// Visibility of a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateScope {
    /// Available to every organization
    Global,
    /// Private to one organization
    Organization(Uuid),
}

impl TemplateScope {
    pub fn visible_to(&self, organization_id: Uuid) -> bool {
        match self {
            TemplateScope::Global => true,
            TemplateScope::Organization(owner) => *owner == organization_id,
        }
    }
}

/// A reusable prompt template with quality-gate policy and
/// effectiveness tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationTemplate {
    pub id: Uuid,
    pub name: String,
    pub content_type: ContentType,
    pub category: Option<String>,
    pub system_prompt: String,
    /// User prompt with `{variable}` placeholders
    pub user_prompt: String,
    pub required_variables: Vec<String>,
    pub scope: TemplateScope,
    /// Minimum acceptable overall score before the gate retries
    pub min_quality_score: f64,
    pub auto_retry_on_low_quality: bool,
    pub max_auto_retries: u32,
    pub usage_count: u64,
    pub success_count: u64,
    pub avg_quality_score: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GenerationTemplate {
    pub fn new(
        name: impl Into<String>,
        content_type: ContentType,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            content_type,
            category: None,
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            required_variables: Vec::new(),
            scope: TemplateScope::Global,
            min_quality_score: 70.0,
            auto_retry_on_low_quality: true,
            max_auto_retries: 2,
            usage_count: 0,
            success_count: 0,
            avg_quality_score: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_required_variables(mut self, variables: Vec<String>) -> Self {
        self.required_variables = variables;
        self
    }

    pub fn with_scope(mut self, scope: TemplateScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_quality_gate(mut self, min_quality_score: f64, max_auto_retries: u32) -> Self {
        self.min_quality_score = min_quality_score;
        self.auto_retry_on_low_quality = max_auto_retries > 0;
        self.max_auto_retries = max_auto_retries;
        self
    }

    /// Whether this template can serve the given request shape
    pub fn matches(&self, content_type: ContentType, category: Option<&str>, organization_id: Uuid) -> bool {
        if self.content_type != content_type || !self.scope.visible_to(organization_id) {
            return false;
        }
        match category {
            Some(wanted) => self.category.as_deref() == Some(wanted),
            None => true,
        }
    }

    /// Every generation attempt with this template counts as usage
    pub fn record_attempt(&mut self) {
        self.usage_count += 1;
        self.updated_at = Utc::now();
    }

    /// Fold a successful generation's score into the running average.
    ///
    /// The average moves incrementally; it is never recomputed from
    /// score history.
    pub fn record_success(&mut self, overall_score: f64) {
        let successes_before = self.success_count as f64;
        self.avg_quality_score =
            (self.avg_quality_score * successes_before + overall_score) / (successes_before + 1.0);
        self.success_count += 1;
        self.updated_at = Utc::now();
    }
}
