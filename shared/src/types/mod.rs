//! Core entity types used throughout the content generation engine

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::SharedError;

pub mod analytics;
pub mod batch;
pub mod quality;
pub mod refinement;
pub mod request;
pub mod result;
pub mod template;

pub use analytics::{day_bounds, ExecutionOutcome, GenerationAnalytics};
pub use batch::{BatchGeneration, BatchSpec, BatchStatus};
pub use quality::{ContentQualityScore, QualityDimension, QualityLevel};
pub use refinement::{ContentRefinement, RefinementSpec, RefinementStatus, RefinementType};
pub use request::{GenerationRequest, NewRequest, RequestStatus};
pub use result::GenerationResult;
pub use template::{GenerationTemplate, TemplateScope};

/// Kinds of instructional content the engine can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Quiz,
    Slides,
    Syllabus,
    Exercise,
    Summary,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Quiz => write!(f, "quiz"),
            ContentType::Slides => write!(f, "slides"),
            ContentType::Syllabus => write!(f, "syllabus"),
            ContentType::Exercise => write!(f, "exercise"),
            ContentType::Summary => write!(f, "summary"),
        }
    }
}

impl std::str::FromStr for ContentType {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quiz" => Ok(ContentType::Quiz),
            "slides" | "slide_deck" => Ok(ContentType::Slides),
            "syllabus" => Ok(ContentType::Syllabus),
            "exercise" | "worksheet" => Ok(ContentType::Exercise),
            "summary" | "notes" => Ok(ContentType::Summary),
            _ => Err(SharedError::UnknownLabel { input: s.to_string() }),
        }
    }
}

/// Token usage information for provider requests
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self { input_tokens, output_tokens }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Accumulate usage from another measurement (e.g. a retry attempt)
    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Model invocation settings carried by a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ModelSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Reject settings the provider would refuse anyway
    pub fn validate(&self) -> Result<(), SharedError> {
        if self.model.trim().is_empty() {
            return Err(SharedError::InvalidConfig {
                field: "model".to_string(),
                value: self.model.clone(),
            });
        }
        if self.max_tokens == 0 {
            return Err(SharedError::InvalidConfig {
                field: "max_tokens".to_string(),
                value: self.max_tokens.to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(SharedError::InvalidConfig {
                field: "temperature".to_string(),
                value: self.temperature.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1200,
            temperature: 0.7,
        }
    }
}
