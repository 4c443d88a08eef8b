//! Quality assessment entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Quality bands derived from the overall score.
///
/// Variants are ordered worst to best so band comparisons
/// (`level >= QualityLevel::Acceptable`) read naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualityLevel {
    Poor,
    NeedsWork,
    Acceptable,
    Good,
    Excellent,
}

impl QualityLevel {
    /// Band breakpoints are fixed: >=90 excellent, >=75 good,
    /// >=60 acceptable, >=40 needs_work, else poor.
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            QualityLevel::Excellent
        } else if score >= 75.0 {
            QualityLevel::Good
        } else if score >= 60.0 {
            QualityLevel::Acceptable
        } else if score >= 40.0 {
            QualityLevel::NeedsWork
        } else {
            QualityLevel::Poor
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityLevel::Poor => write!(f, "poor"),
            QualityLevel::NeedsWork => write!(f, "needs_work"),
            QualityLevel::Acceptable => write!(f, "acceptable"),
            QualityLevel::Good => write!(f, "good"),
            QualityLevel::Excellent => write!(f, "excellent"),
        }
    }
}

/// The seven dimensions every assessment scores on a 0-100 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityDimension {
    Accuracy,
    Relevance,
    Completeness,
    Clarity,
    Structure,
    Engagement,
    DifficultyAlignment,
}

impl QualityDimension {
    pub const ALL: [QualityDimension; 7] = [
        QualityDimension::Accuracy,
        QualityDimension::Relevance,
        QualityDimension::Completeness,
        QualityDimension::Clarity,
        QualityDimension::Structure,
        QualityDimension::Engagement,
        QualityDimension::DifficultyAlignment,
    ];
}

impl fmt::Display for QualityDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityDimension::Accuracy => write!(f, "accuracy"),
            QualityDimension::Relevance => write!(f, "relevance"),
            QualityDimension::Completeness => write!(f, "completeness"),
            QualityDimension::Clarity => write!(f, "clarity"),
            QualityDimension::Structure => write!(f, "structure"),
            QualityDimension::Engagement => write!(f, "engagement"),
            QualityDimension::DifficultyAlignment => write!(f, "difficulty_alignment"),
        }
    }
}

/// Persisted quality assessment for a single generation result (1:1)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentQualityScore {
    pub id: Uuid,
    pub result_id: Uuid,
    pub dimensions: HashMap<QualityDimension, f64>,
    pub weights: HashMap<QualityDimension, f64>,
    pub overall_score: f64,
    pub quality_level: QualityLevel,
    /// Analyzer self-reported confidence, 0.0-1.0
    pub confidence: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
    pub created_at: DateTime<Utc>,
}
