//! Quality scoring: weighted combination and the retry gate

use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;

use shared::{
    ContentQualityScore, GenerationRequest, GenerationResult, GenerationTemplate,
    QualityDimension, QualityLevel,
};

use crate::error::EngineResult;
use crate::traits::QualityAnalyzer;

/// Default dimension weights. Accuracy dominates; engagement matters
/// least for instructional content.
pub fn default_weights() -> HashMap<QualityDimension, f64> {
    let mut weights = HashMap::new();
    weights.insert(QualityDimension::Accuracy, 2.0);
    weights.insert(QualityDimension::Relevance, 1.5);
    weights.insert(QualityDimension::Completeness, 1.25);
    weights.insert(QualityDimension::Clarity, 1.0);
    weights.insert(QualityDimension::Structure, 0.75);
    weights.insert(QualityDimension::Engagement, 0.5);
    weights.insert(QualityDimension::DifficultyAlignment, 1.0);
    weights
}

/// Weight-normalized overall score.
///
/// Iterates dimensions in declaration order so the floating-point sum
/// is identical for identical inputs. Missing weights default to 1.0;
/// out-of-range dimension scores are clamped.
pub fn combine(
    scores: &HashMap<QualityDimension, f64>,
    weights: &HashMap<QualityDimension, f64>,
) -> f64 {
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    for dimension in QualityDimension::ALL {
        if let Some(score) = scores.get(&dimension) {
            let weight = weights.get(&dimension).copied().unwrap_or(1.0);
            weighted_sum += score.clamp(0.0, 100.0) * weight;
            weight_sum += weight;
        }
    }
    if weight_sum == 0.0 {
        0.0
    } else {
        weighted_sum / weight_sum
    }
}

/// Gate decision: re-generate when the template demands better quality
/// and retry budget remains. Low quality is never an error.
pub fn should_auto_retry(template: &GenerationTemplate, overall_score: f64, retry_count: u32) -> bool {
    template.auto_retry_on_low_quality
        && overall_score < template.min_quality_score
        && retry_count < template.max_auto_retries
}

/// Combines analyzer output into persisted quality scores
pub struct QualityScorer<A> {
    analyzer: A,
    weights: HashMap<QualityDimension, f64>,
}

impl<A: QualityAnalyzer> QualityScorer<A> {
    pub fn new(analyzer: A) -> Self {
        Self {
            analyzer,
            weights: default_weights(),
        }
    }

    pub fn with_weights(analyzer: A, weights: HashMap<QualityDimension, f64>) -> Self {
        Self { analyzer, weights }
    }

    /// Assess a result and build its quality score entity
    pub async fn score(
        &self,
        request: &GenerationRequest,
        result: &GenerationResult,
    ) -> EngineResult<ContentQualityScore> {
        let assessment = self.analyzer.assess(request, &result.processed_content).await?;
        let overall_score = combine(&assessment.dimension_scores, &self.weights);

        Ok(ContentQualityScore {
            id: Uuid::new_v4(),
            result_id: result.id,
            dimensions: assessment.dimension_scores,
            weights: self.weights.clone(),
            overall_score,
            quality_level: QualityLevel::from_score(overall_score),
            confidence: assessment.confidence,
            strengths: assessment.strengths,
            weaknesses: assessment.weaknesses,
            suggestions: assessment.suggestions,
            created_at: Utc::now(),
        })
    }
}
