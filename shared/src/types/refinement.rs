//! Iterative refinement records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::SharedError;

/// What kind of change a refinement asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefinementType {
    Clarify,
    Simplify,
    Expand,
    Correct,
    Restyle,
}

impl fmt::Display for RefinementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefinementType::Clarify => write!(f, "clarify"),
            RefinementType::Simplify => write!(f, "simplify"),
            RefinementType::Expand => write!(f, "expand"),
            RefinementType::Correct => write!(f, "correct"),
            RefinementType::Restyle => write!(f, "restyle"),
        }
    }
}

impl std::str::FromStr for RefinementType {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clarify" => Ok(RefinementType::Clarify),
            "simplify" => Ok(RefinementType::Simplify),
            "expand" => Ok(RefinementType::Expand),
            "correct" | "fix" => Ok(RefinementType::Correct),
            "restyle" | "rewrite" => Ok(RefinementType::Restyle),
            _ => Err(SharedError::UnknownLabel { input: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefinementStatus {
    Processing,
    Completed,
    Failed,
}

impl fmt::Display for RefinementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefinementStatus::Processing => write!(f, "processing"),
            RefinementStatus::Completed => write!(f, "completed"),
            RefinementStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Caller-supplied refinement instructions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementSpec {
    pub refinement_type: RefinementType,
    pub feedback: String,
    /// Restrict the rework to named sections; empty means whole artifact
    pub target_sections: Vec<String>,
    pub preserve_structure: bool,
}

impl RefinementSpec {
    pub fn new(refinement_type: RefinementType, feedback: impl Into<String>) -> Self {
        Self {
            refinement_type,
            feedback: feedback.into(),
            target_sections: Vec::new(),
            preserve_structure: true,
        }
    }

    pub fn with_target_sections(mut self, sections: Vec<String>) -> Self {
        self.target_sections = sections;
        self
    }
}

/// One refinement iteration against a generation result.
///
/// Iteration numbers per result are strictly increasing and bounded by
/// `max_iterations`. The original result is never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRefinement {
    pub id: Uuid,
    pub result_id: Uuid,
    pub refinement_type: RefinementType,
    pub feedback: String,
    pub target_sections: Vec<String>,
    pub preserve_structure: bool,
    pub refined_result_id: Option<Uuid>,
    pub status: RefinementStatus,
    pub original_quality_score: f64,
    pub refined_quality_score: Option<f64>,
    pub quality_improvement: Option<f64>,
    pub iteration_number: u32,
    pub max_iterations: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentRefinement {
    pub fn new(
        result_id: Uuid,
        spec: RefinementSpec,
        iteration_number: u32,
        max_iterations: u32,
        original_quality_score: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            result_id,
            refinement_type: spec.refinement_type,
            feedback: spec.feedback,
            target_sections: spec.target_sections,
            preserve_structure: spec.preserve_structure,
            refined_result_id: None,
            status: RefinementStatus::Processing,
            original_quality_score,
            refined_quality_score: None,
            quality_improvement: None,
            iteration_number,
            max_iterations,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_completed(&mut self, refined_result_id: Uuid, refined_quality_score: f64) {
        self.refined_result_id = Some(refined_result_id);
        self.refined_quality_score = Some(refined_quality_score);
        self.quality_improvement = Some(refined_quality_score - self.original_quality_score);
        self.status = RefinementStatus::Completed;
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self) {
        self.status = RefinementStatus::Failed;
        self.updated_at = Utc::now();
    }
}
