//! Engine facade wiring the components together.
//!
//! `ContentEngine` owns one provider, one store and one analyzer and
//! exposes the full operation surface: templates, single requests,
//! refinements, batches and analytics. All coordinators share the same
//! underlying services, so counters and caches stay consistent no
//! matter which path a generation takes.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use shared::{
    BatchGeneration, BatchSpec, ContentQualityScore, ContentRefinement, ContentType,
    GenerationAnalytics, GenerationRequest, GenerationResult, GenerationTemplate, NewRequest,
    RefinementSpec,
};

use crate::batch::BatchCoordinator;
use crate::core::QualityScorer;
use crate::error::EngineResult;
use crate::lifecycle::{RequestLifecycle, RequestSnapshot};
use crate::refinement::{RefinementCoordinator, DEFAULT_MAX_ITERATIONS};
use crate::services::{AnalyticsAggregator, GenerationCache, TemplateRegistry};
use crate::traits::{ContentStore, GenerationProvider, QualityAnalyzer};

/// Engine-level tunables
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long cached generations stay servable
    pub cache_ttl: Duration,
    /// Refinement iterations allowed per result
    pub max_refinement_iterations: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::hours(GenerationCache::DEFAULT_TTL_HOURS),
            max_refinement_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Facade over the generation engine
pub struct ContentEngine<P, S, A> {
    store: Arc<S>,
    registry: Arc<TemplateRegistry<S>>,
    cache: Arc<GenerationCache>,
    analytics: Arc<AnalyticsAggregator<S>>,
    lifecycle: Arc<RequestLifecycle<P, S, A>>,
    refinement: RefinementCoordinator<P, S, A>,
    batch: BatchCoordinator<P, S, A>,
}

impl<P, S, A> ContentEngine<P, S, A>
where
    P: GenerationProvider + 'static,
    S: ContentStore + 'static,
    A: QualityAnalyzer + 'static,
{
    pub fn new(provider: P, store: S, analyzer: A, config: EngineConfig) -> Self {
        let provider = Arc::new(provider);
        let store = Arc::new(store);
        let registry = Arc::new(TemplateRegistry::new(Arc::clone(&store)));
        let cache = Arc::new(GenerationCache::with_ttl(config.cache_ttl));
        let scorer = Arc::new(QualityScorer::new(analyzer));
        let analytics = Arc::new(AnalyticsAggregator::new(Arc::clone(&store)));

        let lifecycle = Arc::new(RequestLifecycle::new(
            Arc::clone(&provider),
            Arc::clone(&store),
            Arc::clone(&registry),
            Arc::clone(&cache),
            Arc::clone(&scorer),
            Arc::clone(&analytics),
        ));
        let refinement = RefinementCoordinator::new(
            Arc::clone(&provider),
            Arc::clone(&store),
            Arc::clone(&scorer),
            Arc::clone(&analytics),
            config.max_refinement_iterations,
        );
        let batch = BatchCoordinator::new(
            Arc::clone(&lifecycle),
            Arc::clone(&registry),
            Arc::clone(&store),
        );

        Self {
            store,
            registry,
            cache,
            analytics,
            lifecycle,
            refinement,
            batch,
        }
    }

    // Templates

    pub async fn register_template(
        &self,
        template: GenerationTemplate,
    ) -> EngineResult<GenerationTemplate> {
        self.registry.register(template).await
    }

    pub async fn template(&self, template_id: Uuid) -> EngineResult<Option<GenerationTemplate>> {
        self.registry.get(template_id).await
    }

    /// Templates that would serve a request of this shape, best first
    pub async fn matching_templates(
        &self,
        content_type: ContentType,
        category: Option<&str>,
        organization_id: Uuid,
    ) -> EngineResult<Vec<GenerationTemplate>> {
        self.registry.candidates(content_type, category, organization_id).await
    }

    // Single requests

    pub async fn submit(&self, spec: NewRequest) -> EngineResult<GenerationRequest> {
        self.lifecycle.submit(spec).await
    }

    pub async fn execute(&self, request_id: Uuid) -> EngineResult<GenerationResult> {
        self.lifecycle.execute(request_id).await
    }

    /// Submit and execute in one call
    pub async fn generate(&self, spec: NewRequest) -> EngineResult<GenerationResult> {
        let request = self.lifecycle.submit(spec).await?;
        self.lifecycle.execute(request.id).await
    }

    pub async fn poll(&self, request_id: Uuid) -> EngineResult<RequestSnapshot> {
        self.lifecycle.poll(request_id).await
    }

    pub async fn result(&self, result_id: Uuid) -> EngineResult<Option<GenerationResult>> {
        self.store.get_result(result_id).await
    }

    pub async fn quality_score(
        &self,
        score_id: Uuid,
    ) -> EngineResult<Option<ContentQualityScore>> {
        self.store.get_score(score_id).await
    }

    // Refinement

    pub async fn refine(
        &self,
        result_id: Uuid,
        spec: RefinementSpec,
    ) -> EngineResult<ContentRefinement> {
        self.refinement.refine(result_id, spec).await
    }

    pub async fn refinement_history(
        &self,
        result_id: Uuid,
    ) -> EngineResult<Vec<ContentRefinement>> {
        self.refinement.history(result_id).await
    }

    // Batches

    pub async fn create_batch(&self, spec: BatchSpec) -> EngineResult<BatchGeneration> {
        self.batch.create_batch(spec).await
    }

    pub async fn run_batch(&self, batch_id: Uuid) -> EngineResult<BatchGeneration> {
        self.batch.run(batch_id).await
    }

    pub async fn cancel_batch(&self, batch_id: Uuid) -> EngineResult<()> {
        self.batch.cancel(batch_id).await
    }

    pub async fn batch_progress(&self, batch_id: Uuid) -> EngineResult<BatchGeneration> {
        self.batch.progress(batch_id).await
    }

    // Analytics and maintenance

    /// Daily buckets for one organization, or the platform-wide stream
    /// when `organization_id` is `None`
    pub async fn analytics(
        &self,
        organization_id: Option<Uuid>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<Vec<GenerationAnalytics>> {
        self.analytics.query(organization_id, from, to).await
    }

    /// Drop expired cache entries, returning how many went away
    pub async fn purge_expired_cache(&self) -> usize {
        self.cache.purge_expired().await
    }

    pub async fn cached_entries(&self) -> usize {
        self.cache.len().await
    }
}
