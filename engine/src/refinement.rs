//! Bounded iterative refinement of existing results.
//!
//! Refinements never mutate the original result; each one produces a
//! new result row with a bumped version and a parent link. Iterations
//! per result are serialized behind a per-result lock so the iteration
//! budget cannot be oversubscribed by concurrent callers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use shared::{
    ContentRefinement, GenerationRequest, GenerationResult, ProviderFailure, RefinementSpec,
};

use crate::core::postprocess::tidy_output;
use crate::core::QualityScorer;
use crate::error::{EngineError, EngineResult};
use crate::services::AnalyticsAggregator;
use crate::traits::{ContentStore, GenerationProvider, ProviderRequest, QualityAnalyzer};

/// Default refinement iterations allowed per result
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;

/// Runs refinement iterations against stored results
pub struct RefinementCoordinator<P, S, A> {
    provider: Arc<P>,
    store: Arc<S>,
    scorer: Arc<QualityScorer<A>>,
    analytics: Arc<AnalyticsAggregator<S>>,
    max_iterations: u32,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl<P, S, A> RefinementCoordinator<P, S, A>
where
    P: GenerationProvider,
    S: ContentStore,
    A: QualityAnalyzer,
{
    pub fn new(
        provider: Arc<P>,
        store: Arc<S>,
        scorer: Arc<QualityScorer<A>>,
        analytics: Arc<AnalyticsAggregator<S>>,
        max_iterations: u32,
    ) -> Self {
        Self {
            provider,
            store,
            scorer,
            analytics,
            max_iterations,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Run one refinement iteration against a result.
    ///
    /// A failed iteration still consumes one slot of the result's
    /// budget; its record stays behind with `Failed` status.
    ///
    /// # Parameters
    /// * `result_id` - Result whose content gets reworked
    /// * `spec` - What to change and how
    ///
    /// # Returns
    /// The completed refinement record, its `refined_result_id`
    /// pointing at the new result row
    pub async fn refine(
        &self,
        result_id: Uuid,
        spec: RefinementSpec,
    ) -> EngineResult<ContentRefinement> {
        if spec.feedback.trim().is_empty() {
            return Err(EngineError::validation("refinement feedback must not be empty"));
        }

        let lock = self.result_lock(result_id).await;
        let _guard = lock.lock().await;

        let original = self.store.get_result(result_id).await?.ok_or_else(|| {
            EngineError::validation(format!("result {result_id} does not exist"))
        })?;
        let request = self.store.get_request(original.request_id).await?.ok_or_else(|| {
            EngineError::persistence(
                "get",
                "request",
                format!("request {} behind result {result_id} is missing", original.request_id),
            )
        })?;

        let prior = self.store.list_refinements(result_id).await?;
        if prior.len() as u32 >= self.max_iterations {
            return Err(EngineError::conflict(format!(
                "result {result_id} has used all {} refinement iterations",
                self.max_iterations
            )));
        }
        let iteration_number = prior.len() as u32 + 1;

        let original_score = self.original_score(&request, &original).await?;
        let mut refinement = ContentRefinement::new(
            result_id,
            spec,
            iteration_number,
            self.max_iterations,
            original_score,
        );
        self.store.create_refinement(&refinement).await?;
        self.analytics
            .record_refinement_started(request.organization_id, Utc::now())
            .await?;
        info!(
            refinement_id = %refinement.id,
            result_id = %result_id,
            iteration = iteration_number,
            kind = %refinement.refinement_type,
            "🔧 Refinement started"
        );

        let call = refinement_call(&refinement, &original, &request);
        let reply = match timeout(
            Duration::from_secs(request.timeout_seconds),
            self.provider.generate(&call),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderFailure::Timeout),
        };

        let reply = match reply {
            Ok(reply) => reply,
            Err(failure) => {
                refinement.mark_failed();
                self.store.update_refinement(&refinement).await?;
                warn!(
                    refinement_id = %refinement.id,
                    failure = %failure,
                    "❌ Refinement failed"
                );
                return Err(EngineError::provider(
                    failure,
                    format!("refinement of result {result_id} failed: {failure}"),
                ));
            }
        };

        let mut refined =
            GenerationResult::refined_from(&original, reply.text.clone(), tidy_output(&reply.text));
        let score = self.scorer.score(&request, &refined).await?;
        refined.quality_level = score.quality_level;

        self.store.create_result(&refined).await?;
        self.store.create_score(&score).await?;
        refined.quality_score_id = Some(score.id);
        self.store.update_result(&refined).await?;

        refinement.mark_completed(refined.id, score.overall_score);
        self.store.update_refinement(&refinement).await?;
        self.analytics
            .record_refinement_completed(request.organization_id, Utc::now())
            .await?;

        info!(
            refinement_id = %refinement.id,
            refined_result_id = %refined.id,
            improvement = score.overall_score - original_score,
            "✨ Refinement completed"
        );
        Ok(refinement)
    }

    /// Refinement history of a result, oldest iteration first
    pub async fn history(&self, result_id: Uuid) -> EngineResult<Vec<ContentRefinement>> {
        self.store.list_refinements(result_id).await
    }

    /// Score backing the original result. Cache-served results carry no
    /// score row, so their content is judged on the spot.
    async fn original_score(
        &self,
        request: &GenerationRequest,
        result: &GenerationResult,
    ) -> EngineResult<f64> {
        if let Some(score_id) = result.quality_score_id {
            if let Some(score) = self.store.get_score(score_id).await? {
                return Ok(score.overall_score);
            }
        }
        let score = self.scorer.score(request, result).await?;
        Ok(score.overall_score)
    }

    async fn result_lock(&self, result_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(result_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Build the editing prompt for one refinement iteration
fn refinement_call(
    refinement: &ContentRefinement,
    original: &GenerationResult,
    request: &GenerationRequest,
) -> ProviderRequest {
    let mut instructions = vec![format!(
        "Revise the provided {} content. Apply this {} refinement: {}",
        request.content_type, refinement.refinement_type, refinement.feedback
    )];
    if !refinement.target_sections.is_empty() {
        instructions.push(format!(
            "Only rework these sections: {}.",
            refinement.target_sections.join(", ")
        ));
    }
    if refinement.preserve_structure {
        instructions.push("Keep the overall structure, headings and ordering intact.".to_string());
    }
    instructions.push("Return the full revised document, not a commentary on it.".to_string());

    ProviderRequest {
        system_prompt: "You are an educational content editor. You improve existing course \
                        material without changing its intent."
            .to_string(),
        user_prompt: format!(
            "{}\n\n---\n\n{}",
            instructions.join(" "),
            original.processed_content
        ),
        model: request.model.model.clone(),
        max_tokens: request.model.max_tokens,
        temperature: request.model.temperature,
    }
}
