//! Request lifecycle: submission, execution and polling.
//!
//! A request moves pending -> processing -> completed | failed. The
//! pending -> processing edge is claimed with a compare-and-set so two
//! executors can never run the same request; terminal states never
//! revert. One execution produces at most one standing result and
//! exactly one analytics record.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared::params;
use shared::{
    ContentQualityScore, ExecutionOutcome, GenerationRequest, GenerationResult,
    GenerationTemplate, NewRequest, ProviderFailure, RequestStatus,
};

use crate::core::postprocess::tidy_output;
use crate::core::{fingerprint, pricing, quality, QualityScorer};
use crate::error::{EngineError, EngineResult};
use crate::services::{AnalyticsAggregator, CacheEntry, GenerationCache, TemplateRegistry};
use crate::traits::{ContentStore, GenerationProvider, ProviderRequest, QualityAnalyzer};

/// Point-in-time view of a request for status polling
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    pub request_id: Uuid,
    pub status: RequestStatus,
    pub result_id: Option<Uuid>,
    pub error_message: Option<String>,
    pub retry_count: u32,
    pub cost: f64,
}

impl From<&GenerationRequest> for RequestSnapshot {
    fn from(request: &GenerationRequest) -> Self {
        Self {
            request_id: request.id,
            status: request.status,
            result_id: request.result_id,
            error_message: request.error_message.clone(),
            retry_count: request.retry_count,
            cost: request.cost,
        }
    }
}

/// What one finished execution amounted to, for analytics
struct SettledExecution {
    result: GenerationResult,
    cost: f64,
    cache_savings: f64,
}

/// Drives single requests from submission to a terminal state
pub struct RequestLifecycle<P, S, A> {
    provider: Arc<P>,
    store: Arc<S>,
    registry: Arc<TemplateRegistry<S>>,
    cache: Arc<GenerationCache>,
    scorer: Arc<QualityScorer<A>>,
    analytics: Arc<AnalyticsAggregator<S>>,
}

impl<P, S, A> RequestLifecycle<P, S, A>
where
    P: GenerationProvider,
    S: ContentStore,
    A: QualityAnalyzer,
{
    pub fn new(
        provider: Arc<P>,
        store: Arc<S>,
        registry: Arc<TemplateRegistry<S>>,
        cache: Arc<GenerationCache>,
        scorer: Arc<QualityScorer<A>>,
        analytics: Arc<AnalyticsAggregator<S>>,
    ) -> Self {
        Self {
            provider,
            store,
            registry,
            cache,
            scorer,
            analytics,
        }
    }

    /// Validate and persist a new request in `Pending` state.
    ///
    /// # Parameters
    /// * `spec` - Caller-supplied request fields
    ///
    /// # Returns
    /// The persisted request, or a validation error when the model
    /// settings are off, a parameter is malformed, no template matches,
    /// or a pinned template does not fit the request. Nothing is
    /// persisted on rejection.
    pub async fn submit(&self, spec: NewRequest) -> EngineResult<GenerationRequest> {
        params::validate(&spec.parameters)?;
        spec.model.validate()?;
        if spec.timeout_seconds == 0 {
            return Err(EngineError::validation("timeout_seconds must be positive"));
        }

        let template = self.governing_template(&spec).await?;
        let missing = params::missing_variables(&spec.parameters, &template.required_variables);
        if !missing.is_empty() {
            return Err(EngineError::validation_with_details(
                format!("missing required variables for template '{}'", template.name),
                missing,
            ));
        }

        let request = GenerationRequest::new(spec);
        self.store.create_request(&request).await?;
        info!(
            request_id = %request.id,
            content_type = %request.content_type,
            template = %template.name,
            "📥 Request submitted"
        );
        Ok(request)
    }

    /// Run a pending request to a terminal state.
    ///
    /// Re-executing a completed request returns its stored result
    /// without doing any work; a failed request returns a conflict, as
    /// does a request another executor already claimed.
    ///
    /// # Parameters
    /// * `request_id` - Request to execute
    ///
    /// # Returns
    /// The standing result of the request
    pub async fn execute(&self, request_id: Uuid) -> EngineResult<GenerationResult> {
        let mut request = self
            .store
            .get_request(request_id)
            .await?
            .ok_or_else(|| EngineError::validation(format!("request {request_id} does not exist")))?;

        match request.status {
            RequestStatus::Completed => return self.stored_result(&request).await,
            RequestStatus::Failed => {
                return Err(EngineError::conflict(format!(
                    "request {request_id} already failed: {}",
                    request.error_message.as_deref().unwrap_or("unknown error")
                )));
            }
            RequestStatus::Processing => {
                return Err(EngineError::conflict(format!(
                    "request {request_id} is already executing"
                )));
            }
            RequestStatus::Pending => {}
        }

        // The compare-and-set is the claim that counts; the status
        // check above only short-circuits settled requests.
        let claimed = self
            .store
            .transition_request(request_id, RequestStatus::Pending, RequestStatus::Processing)
            .await?;
        if !claimed {
            return Err(EngineError::conflict(format!(
                "request {request_id} is already executing"
            )));
        }
        request.status = RequestStatus::Processing;

        let started = Instant::now();
        let settled = self.run_generation(&mut request).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match settled {
            Ok(settled) => {
                let outcome = ExecutionOutcome {
                    failed: false,
                    cache_hit: settled.result.cached,
                    duration_ms,
                    tokens: request.tokens.clone(),
                    cost: settled.cost,
                    cache_savings: settled.cache_savings,
                    quality_level: Some(settled.result.quality_level),
                };
                self.analytics
                    .record_execution(request.organization_id, Utc::now(), &outcome)
                    .await?;
                info!(
                    request_id = %request.id,
                    quality = %settled.result.quality_level,
                    cached = settled.result.cached,
                    duration_ms,
                    "✅ Request completed"
                );
                Ok(settled.result)
            }
            Err(error) => {
                request.mark_failed(error.to_string());
                if let Err(persist_error) = self.store.update_request(&request).await {
                    warn!(
                        request_id = %request.id,
                        error = %persist_error,
                        "⚠️ Could not persist failed state"
                    );
                }
                let outcome = ExecutionOutcome {
                    failed: true,
                    cache_hit: false,
                    duration_ms,
                    tokens: request.tokens.clone(),
                    cost: request.cost,
                    cache_savings: 0.0,
                    quality_level: None,
                };
                // Failure accounting must not mask the original error
                if let Err(record_error) = self
                    .analytics
                    .record_execution(request.organization_id, Utc::now(), &outcome)
                    .await
                {
                    warn!(error = %record_error, "⚠️ Could not record failed execution");
                }
                warn!(request_id = %request.id, error = %error, "❌ Request failed");
                Err(error)
            }
        }
    }

    /// Current status of a request.
    ///
    /// # Parameters
    /// * `request_id` - Request to inspect
    pub async fn poll(&self, request_id: Uuid) -> EngineResult<RequestSnapshot> {
        let request = self
            .store
            .get_request(request_id)
            .await?
            .ok_or_else(|| EngineError::validation(format!("request {request_id} does not exist")))?;
        Ok(RequestSnapshot::from(&request))
    }

    /// Resolve the template governing a submission: the pinned one when
    /// given, otherwise the best match for type, category and tenant
    async fn governing_template(&self, spec: &NewRequest) -> EngineResult<GenerationTemplate> {
        match spec.template_id {
            Some(template_id) => {
                let template = self.registry.get(template_id).await?.ok_or_else(|| {
                    EngineError::validation(format!("template {template_id} does not exist"))
                })?;
                if template.content_type != spec.content_type {
                    return Err(EngineError::validation(format!(
                        "template '{}' produces {} content, request asks for {}",
                        template.name, template.content_type, spec.content_type
                    )));
                }
                if !template.scope.visible_to(spec.organization_id) {
                    return Err(EngineError::validation(format!(
                        "template '{}' is not visible to this organization",
                        template.name
                    )));
                }
                Ok(template)
            }
            None => self
                .registry
                .best_match(spec.content_type, spec.category.as_deref(), spec.organization_id)
                .await?
                .ok_or_else(|| {
                    EngineError::validation(format!(
                        "no template available for content type '{}'",
                        spec.content_type
                    ))
                }),
        }
    }

    async fn run_generation(
        &self,
        request: &mut GenerationRequest,
    ) -> EngineResult<SettledExecution> {
        let candidates = self.candidate_templates(request).await?;
        let cache_key = fingerprint::cache_key(
            request.content_type,
            &request.parameters,
            candidates[0].id,
            &request.model.model,
        );

        if request.use_cache {
            if let Some(entry) = self.cache.lookup(&cache_key).await {
                return self.complete_from_cache(request, entry, cache_key).await;
            }
        }

        // Best rejected draft so far, kept in case every attempt falls
        // short of the gate
        let mut best_draft: Option<(GenerationResult, ContentQualityScore)> = None;

        loop {
            let attempt_index = (request.retry_count as usize).min(candidates.len() - 1);
            let template = &candidates[attempt_index];
            debug!(
                request_id = %request.id,
                template = %template.name,
                attempt = request.retry_count + 1,
                provider = self.provider.name(),
                "🤖 Invoking provider"
            );

            let reply = match timeout(
                Duration::from_secs(request.timeout_seconds),
                self.provider.generate(&self.render_call(template, request)),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(ProviderFailure::Timeout),
            };

            let reply = match reply {
                Ok(reply) => reply,
                Err(failure) => {
                    self.registry.record_usage(template.id, None).await?;
                    if request.retry_count < request.max_retries {
                        request.retry_count += 1;
                        request.updated_at = Utc::now();
                        self.store.update_request(request).await?;
                        warn!(
                            request_id = %request.id,
                            failure = %failure,
                            retry = request.retry_count,
                            "🔁 Provider failed, retrying"
                        );
                        continue;
                    }
                    if let Some((result, score)) = best_draft {
                        warn!(
                            request_id = %request.id,
                            "🔁 Retry budget exhausted, serving best rejected draft"
                        );
                        return self.finalize(request, result, score, &cache_key).await;
                    }
                    return Err(EngineError::provider(
                        failure,
                        format!(
                            "provider failed after {} attempts: {failure}",
                            request.retry_count + 1
                        ),
                    ));
                }
            };

            let mut result =
                GenerationResult::new(request.id, reply.text.clone(), tidy_output(&reply.text));
            if request.use_cache {
                result.cache_key = Some(cache_key.clone());
            }

            let score = self.scorer.score(request, &result).await?;
            result.quality_level = score.quality_level;

            request.tokens.add(&reply.tokens);
            request.cost += pricing::estimate_cost(&request.model.model, &reply.tokens);

            if quality::should_auto_retry(template, score.overall_score, request.retry_count) {
                self.registry.record_usage(template.id, None).await?;
                let improves = best_draft
                    .as_ref()
                    .map_or(true, |(_, best)| score.overall_score > best.overall_score);
                if improves {
                    best_draft = Some((result, score));
                }
                request.retry_count += 1;
                request.updated_at = Utc::now();
                self.store.update_request(request).await?;
                debug!(
                    request_id = %request.id,
                    template = %template.name,
                    retry = request.retry_count,
                    "📉 Quality below template minimum, retrying"
                );
                continue;
            }

            // Gate satisfied, gate off, or gate budget spent: pick the
            // standing draft. Success credit goes to a template only
            // when its own draft stands and met its bar.
            let gate_satisfied = !template.auto_retry_on_low_quality
                || score.overall_score >= template.min_quality_score;
            return match best_draft {
                Some((best_result, best_score))
                    if best_score.overall_score > score.overall_score =>
                {
                    self.registry.record_usage(template.id, None).await?;
                    self.finalize(request, best_result, best_score, &cache_key).await
                }
                _ => {
                    let credit = gate_satisfied.then_some(score.overall_score);
                    self.registry.record_usage(template.id, credit).await?;
                    self.finalize(request, result, score, &cache_key).await
                }
            };
        }
    }

    /// Templates eligible for this request, best first. Retries walk
    /// down this list; the last entry absorbs any overflow.
    async fn candidate_templates(
        &self,
        request: &GenerationRequest,
    ) -> EngineResult<Vec<GenerationTemplate>> {
        if let Some(template_id) = request.template_id {
            let template = self.registry.get(template_id).await?.ok_or_else(|| {
                EngineError::validation(format!("template {template_id} does not exist"))
            })?;
            return Ok(vec![template]);
        }
        let candidates = self
            .registry
            .candidates(request.content_type, request.category.as_deref(), request.organization_id)
            .await?;
        if candidates.is_empty() {
            return Err(EngineError::validation(format!(
                "no template available for content type '{}'",
                request.content_type
            )));
        }
        Ok(candidates)
    }

    fn render_call(
        &self,
        template: &GenerationTemplate,
        request: &GenerationRequest,
    ) -> ProviderRequest {
        ProviderRequest {
            system_prompt: params::render_placeholders(&template.system_prompt, &request.parameters),
            user_prompt: params::render_placeholders(&template.user_prompt, &request.parameters),
            model: request.model.model.clone(),
            max_tokens: request.model.max_tokens,
            temperature: request.model.temperature,
        }
    }

    async fn complete_from_cache(
        &self,
        request: &mut GenerationRequest,
        entry: CacheEntry,
        cache_key: String,
    ) -> EngineResult<SettledExecution> {
        let mut result = GenerationResult::new(
            request.id,
            entry.raw_output.clone(),
            entry.processed_content.clone(),
        );
        result.cached = true;
        result.cache_key = Some(cache_key);
        result.quality_level = entry.quality_level;
        result.expires_at = Some(entry.expires_at);

        self.store.create_result(&result).await?;
        request.mark_completed(result.id);
        self.store.update_request(request).await?;

        debug!(request_id = %request.id, "♻️ Served from cache");
        Ok(SettledExecution {
            result,
            cost: 0.0,
            cache_savings: entry.generation_cost,
        })
    }

    /// Persist the standing result and settle the request.
    ///
    /// Ordered result -> score -> request so a reader never sees a
    /// completed request pointing at rows that are not there yet.
    async fn finalize(
        &self,
        request: &mut GenerationRequest,
        mut result: GenerationResult,
        score: ContentQualityScore,
        cache_key: &str,
    ) -> EngineResult<SettledExecution> {
        self.store.create_result(&result).await?;
        self.store.create_score(&score).await?;
        result.quality_score_id = Some(score.id);
        self.store.update_result(&result).await?;

        request.mark_completed(result.id);
        self.store.update_request(request).await?;

        if request.use_cache {
            let stored = self
                .cache
                .store(cache_key.to_string(), &result, &request.model.model, request.cost)
                .await;
            if stored {
                debug!(request_id = %request.id, "📦 Result cached");
            }
        }

        Ok(SettledExecution {
            result,
            cost: request.cost,
            cache_savings: 0.0,
        })
    }

    async fn stored_result(&self, request: &GenerationRequest) -> EngineResult<GenerationResult> {
        let result_id = request.result_id.ok_or_else(|| {
            EngineError::persistence(
                "get",
                "result",
                format!("completed request {} has no result attached", request.id),
            )
        })?;
        self.store.get_result(result_id).await?.ok_or_else(|| {
            EngineError::persistence("get", "result", format!("result {result_id} is missing"))
        })
    }
}
