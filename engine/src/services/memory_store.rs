//! In-memory `ContentStore` used by tests and the demo binary.
//!
//! One mutex over all entity maps makes every write transactional and
//! the request-status compare-and-set genuinely atomic.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use shared::{
    BatchGeneration, ContentQualityScore, ContentRefinement, GenerationAnalytics,
    GenerationRequest, GenerationResult, GenerationTemplate, RequestStatus,
};

use crate::error::{EngineError, EngineResult};
use crate::traits::{ContentStore, RequestFilter};

#[derive(Default)]
struct StoreInner {
    requests: HashMap<Uuid, GenerationRequest>,
    results: HashMap<Uuid, GenerationResult>,
    scores: HashMap<Uuid, ContentQualityScore>,
    templates: HashMap<Uuid, GenerationTemplate>,
    refinements: HashMap<Uuid, ContentRefinement>,
    batches: HashMap<Uuid, BatchGeneration>,
    analytics: HashMap<(Option<Uuid>, DateTime<Utc>), GenerationAnalytics>,
}

pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn duplicate(entity: &str, id: Uuid) -> EngineError {
    EngineError::persistence("create", entity, format!("{entity} {id} already exists"))
}

fn missing(entity: &str, id: Uuid) -> EngineError {
    EngineError::persistence("update", entity, format!("{entity} {id} does not exist"))
}

#[async_trait::async_trait]
impl ContentStore for MemoryStore {
    async fn create_request(&self, request: &GenerationRequest) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.requests.contains_key(&request.id) {
            return Err(duplicate("request", request.id));
        }
        inner.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn get_request(&self, id: Uuid) -> EngineResult<Option<GenerationRequest>> {
        Ok(self.inner.lock().await.requests.get(&id).cloned())
    }

    async fn update_request(&self, request: &GenerationRequest) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        if !inner.requests.contains_key(&request.id) {
            return Err(missing("request", request.id));
        }
        inner.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn transition_request(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> EngineResult<bool> {
        let mut inner = self.inner.lock().await;
        let request = inner.requests.get_mut(&id).ok_or_else(|| missing("request", id))?;
        if request.status != from {
            return Ok(false);
        }
        request.status = to;
        request.updated_at = Utc::now();
        Ok(true)
    }

    async fn list_requests(&self, filter: &RequestFilter) -> EngineResult<Vec<GenerationRequest>> {
        let inner = self.inner.lock().await;
        let mut matching: Vec<GenerationRequest> = inner
            .requests
            .values()
            .filter(|r| filter.organization_id.map_or(true, |org| r.organization_id == org))
            .filter(|r| filter.course_id.map_or(true, |course| r.course_id == course))
            .filter(|r| filter.status.map_or(true, |status| r.status == status))
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.created_at);
        Ok(matching)
    }

    async fn create_result(&self, result: &GenerationResult) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.results.contains_key(&result.id) {
            return Err(duplicate("result", result.id));
        }
        inner.results.insert(result.id, result.clone());
        Ok(())
    }

    async fn get_result(&self, id: Uuid) -> EngineResult<Option<GenerationResult>> {
        Ok(self.inner.lock().await.results.get(&id).cloned())
    }

    async fn update_result(&self, result: &GenerationResult) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        if !inner.results.contains_key(&result.id) {
            return Err(missing("result", result.id));
        }
        inner.results.insert(result.id, result.clone());
        Ok(())
    }

    async fn create_score(&self, score: &ContentQualityScore) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.scores.contains_key(&score.id) {
            return Err(duplicate("score", score.id));
        }
        inner.scores.insert(score.id, score.clone());
        Ok(())
    }

    async fn get_score(&self, id: Uuid) -> EngineResult<Option<ContentQualityScore>> {
        Ok(self.inner.lock().await.scores.get(&id).cloned())
    }

    async fn create_template(&self, template: &GenerationTemplate) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.templates.contains_key(&template.id) {
            return Err(duplicate("template", template.id));
        }
        inner.templates.insert(template.id, template.clone());
        Ok(())
    }

    async fn get_template(&self, id: Uuid) -> EngineResult<Option<GenerationTemplate>> {
        Ok(self.inner.lock().await.templates.get(&id).cloned())
    }

    async fn update_template(&self, template: &GenerationTemplate) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        if !inner.templates.contains_key(&template.id) {
            return Err(missing("template", template.id));
        }
        inner.templates.insert(template.id, template.clone());
        Ok(())
    }

    async fn list_templates(&self, organization_id: Uuid) -> EngineResult<Vec<GenerationTemplate>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .templates
            .values()
            .filter(|t| t.scope.visible_to(organization_id))
            .cloned()
            .collect())
    }

    async fn create_refinement(&self, refinement: &ContentRefinement) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.refinements.contains_key(&refinement.id) {
            return Err(duplicate("refinement", refinement.id));
        }
        inner.refinements.insert(refinement.id, refinement.clone());
        Ok(())
    }

    async fn update_refinement(&self, refinement: &ContentRefinement) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        if !inner.refinements.contains_key(&refinement.id) {
            return Err(missing("refinement", refinement.id));
        }
        inner.refinements.insert(refinement.id, refinement.clone());
        Ok(())
    }

    async fn list_refinements(&self, result_id: Uuid) -> EngineResult<Vec<ContentRefinement>> {
        let inner = self.inner.lock().await;
        let mut matching: Vec<ContentRefinement> = inner
            .refinements
            .values()
            .filter(|r| r.result_id == result_id)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.iteration_number);
        Ok(matching)
    }

    async fn create_batch(&self, batch: &BatchGeneration) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.batches.contains_key(&batch.id) {
            return Err(duplicate("batch", batch.id));
        }
        inner.batches.insert(batch.id, batch.clone());
        Ok(())
    }

    async fn get_batch(&self, id: Uuid) -> EngineResult<Option<BatchGeneration>> {
        Ok(self.inner.lock().await.batches.get(&id).cloned())
    }

    async fn update_batch(&self, batch: &BatchGeneration) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        if !inner.batches.contains_key(&batch.id) {
            return Err(missing("batch", batch.id));
        }
        inner.batches.insert(batch.id, batch.clone());
        Ok(())
    }

    async fn get_analytics(
        &self,
        organization_id: Option<Uuid>,
        period_start: DateTime<Utc>,
    ) -> EngineResult<Option<GenerationAnalytics>> {
        let inner = self.inner.lock().await;
        Ok(inner.analytics.get(&(organization_id, period_start)).cloned())
    }

    async fn upsert_analytics(&self, analytics: &GenerationAnalytics) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        inner
            .analytics
            .insert((analytics.organization_id, analytics.period_start), analytics.clone());
        Ok(())
    }

    async fn list_analytics(
        &self,
        organization_id: Option<Uuid>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<Vec<GenerationAnalytics>> {
        let inner = self.inner.lock().await;
        let mut matching: Vec<GenerationAnalytics> = inner
            .analytics
            .values()
            .filter(|a| a.organization_id == organization_id)
            .filter(|a| a.period_start >= from && a.period_start < to)
            .cloned()
            .collect();
        matching.sort_by_key(|a| a.period_start);
        Ok(matching)
    }
}
