//! Parallel batch execution with cooperative cancellation.
//!
//! A batch expands into individual requests at creation time. Running
//! it drains a shared work queue with a bounded worker pool; each item
//! goes through the normal single-request lifecycle, so caching,
//! retries and analytics behave exactly as they do for ad-hoc requests.
//! Cancellation stops pickup of new items and lets in-flight ones
//! finish; undrained items are counted as skipped and their requests
//! stay pending.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared::params;
use shared::{BatchGeneration, BatchSpec, BatchStatus, ContentType, NewRequest};

use crate::core::pricing;
use crate::error::{EngineError, EngineResult};
use crate::lifecycle::RequestLifecycle;
use crate::services::TemplateRegistry;
use crate::traits::{ContentStore, GenerationProvider, QualityAnalyzer};

/// Expands, runs and cancels batches of generation requests
pub struct BatchCoordinator<P, S, A> {
    lifecycle: Arc<RequestLifecycle<P, S, A>>,
    registry: Arc<TemplateRegistry<S>>,
    store: Arc<S>,
    claim_lock: Mutex<()>,
    cancel_flags: Mutex<HashMap<Uuid, Arc<AtomicBool>>>,
}

impl<P, S, A> BatchCoordinator<P, S, A>
where
    P: GenerationProvider + 'static,
    S: ContentStore + 'static,
    A: QualityAnalyzer + 'static,
{
    pub fn new(
        lifecycle: Arc<RequestLifecycle<P, S, A>>,
        registry: Arc<TemplateRegistry<S>>,
        store: Arc<S>,
    ) -> Self {
        Self {
            lifecycle,
            registry,
            store,
            claim_lock: Mutex::new(()),
            cancel_flags: Mutex::new(HashMap::new()),
        }
    }

    /// Expand a batch spec into pending requests and persist the batch.
    ///
    /// The whole expansion is validated before anything is persisted:
    /// an oversized or unservable batch leaves no trace.
    ///
    /// # Parameters
    /// * `spec` - Batch shape; `target_modules` x `content_types`
    ///   becomes one request per pair
    ///
    /// # Returns
    /// The persisted batch in `Created` state
    pub async fn create_batch(&self, spec: BatchSpec) -> EngineResult<BatchGeneration> {
        let expansion = spec.expansion_size();
        if expansion == 0 {
            return Err(EngineError::validation(
                "batch needs at least one target module and one content type",
            ));
        }
        if expansion > spec.max_batch_size {
            return Err(EngineError::capacity(format!(
                "batch expands to {expansion} requests, exceeding the limit of {}",
                spec.max_batch_size
            )));
        }
        if spec.parallel_workers == 0 {
            return Err(EngineError::validation("parallel_workers must be positive"));
        }
        params::validate(&spec.shared_parameters)?;
        spec.model.validate()?;
        for content_type in &spec.content_types {
            let servable = self
                .registry
                .best_match(*content_type, spec.category.as_deref(), spec.organization_id)
                .await?
                .is_some();
            if !servable {
                return Err(EngineError::validation(format!(
                    "no template available for content type '{content_type}'"
                )));
            }
        }

        let mut request_ids = Vec::with_capacity(expansion);
        for module_id in &spec.target_modules {
            for content_type in &spec.content_types {
                let request = self
                    .lifecycle
                    .submit(item_request(&spec, *module_id, *content_type))
                    .await?;
                request_ids.push(request.id);
            }
        }

        let estimated_cost =
            pricing::planned_cost(&spec.model.model, spec.model.max_tokens) * expansion as f64;
        let batch = BatchGeneration::new(&spec, request_ids, estimated_cost);
        self.store.create_batch(&batch).await?;
        info!(
            batch_id = %batch.id,
            items = batch.total_items,
            estimated_cost = batch.estimated_cost,
            "📦 Batch created"
        );
        Ok(batch)
    }

    /// Run a created batch to a terminal state.
    ///
    /// # Parameters
    /// * `batch_id` - Batch to run; must be in `Created` state
    ///
    /// # Returns
    /// The settled batch with final counters and status
    pub async fn run(&self, batch_id: Uuid) -> EngineResult<BatchGeneration> {
        // Claim under the lock so two runners cannot both move the
        // batch out of Created
        let mut batch = {
            let _claim = self.claim_lock.lock().await;
            let mut batch = self.load(batch_id).await?;
            if batch.status != BatchStatus::Created {
                return Err(EngineError::conflict(format!(
                    "batch {batch_id} is {} and cannot be started",
                    batch.status
                )));
            }
            batch.status = BatchStatus::Queued;
            batch.updated_at = Utc::now();
            self.store.update_batch(&batch).await?;
            batch
        };

        let cancel = self.cancel_flag(batch_id).await;

        batch.status = BatchStatus::Processing;
        batch.updated_at = Utc::now();
        self.store.update_batch(&batch).await?;
        let worker_count = batch.parallel_workers.min(batch.total_items).max(1);
        info!(
            batch_id = %batch_id,
            items = batch.total_items,
            workers = worker_count,
            "🚀 Batch started"
        );

        let queue: Arc<Mutex<VecDeque<Uuid>>> =
            Arc::new(Mutex::new(batch.request_ids.iter().copied().collect()));
        let shared = Arc::new(Mutex::new(batch));

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let lifecycle = Arc::clone(&self.lifecycle);
            let store = Arc::clone(&self.store);
            let queue = Arc::clone(&queue);
            let shared = Arc::clone(&shared);
            let cancel = Arc::clone(&cancel);

            workers.push(tokio::spawn(async move {
                loop {
                    if cancel.load(Ordering::Acquire) {
                        debug!(worker_id, "🛑 Worker observed cancellation");
                        break;
                    }
                    let next = { queue.lock().await.pop_front() };
                    let request_id = match next {
                        Some(id) => id,
                        None => break,
                    };

                    {
                        let mut batch = shared.lock().await;
                        batch.current_item_index += 1;
                    }

                    let outcome = lifecycle.execute(request_id).await;
                    let item_cost = lifecycle
                        .poll(request_id)
                        .await
                        .map(|snapshot| snapshot.cost)
                        .unwrap_or(0.0);

                    let mut batch = shared.lock().await;
                    match outcome {
                        Ok(_) => batch.completed_items += 1,
                        Err(error) => {
                            batch.failed_items += 1;
                            warn!(
                                batch_id = %batch.id,
                                request_id = %request_id,
                                error = %error,
                                "⚠️ Batch item failed"
                            );
                        }
                    }
                    batch.actual_cost += item_cost;
                    batch.refresh_progress();
                    if let Err(persist_error) = store.update_batch(&batch).await {
                        warn!(
                            batch_id = %batch.id,
                            error = %persist_error,
                            "⚠️ Could not persist batch progress"
                        );
                    }
                    debug!(
                        batch_id = %batch.id,
                        worker_id,
                        progress = batch.progress_percentage,
                        "📈 Batch progress"
                    );
                }
            }));
        }

        for worker in workers {
            if let Err(join_error) = worker.await {
                warn!(batch_id = %batch_id, error = %join_error, "⚠️ Batch worker panicked");
            }
        }

        let mut batch = shared.lock().await.clone();
        let leftovers = { queue.lock().await.len() };
        if leftovers > 0 {
            batch.skipped_items += leftovers;
            info!(batch_id = %batch_id, skipped = leftovers, "🛑 Batch cancelled, items skipped");
        }
        batch.status = batch.terminal_status();
        batch.refresh_progress();
        self.store.update_batch(&batch).await?;
        self.cancel_flags.lock().await.remove(&batch_id);

        info!(
            batch_id = %batch_id,
            status = %batch.status,
            completed = batch.completed_items,
            failed = batch.failed_items,
            skipped = batch.skipped_items,
            actual_cost = batch.actual_cost,
            "🏁 Batch settled"
        );
        Ok(batch)
    }

    /// Request cooperative cancellation of a batch.
    ///
    /// Safe before or during `run`; cancelling before the run starts
    /// skips every item. In-flight items always finish.
    pub async fn cancel(&self, batch_id: Uuid) -> EngineResult<()> {
        let batch = self.load(batch_id).await?;
        if batch.status.is_terminal() {
            return Err(EngineError::conflict(format!(
                "batch {batch_id} is already {}",
                batch.status
            )));
        }
        self.cancel_flag(batch_id).await.store(true, Ordering::Release);
        info!(batch_id = %batch_id, "🛑 Batch cancellation requested");
        Ok(())
    }

    /// Current persisted state of a batch
    pub async fn progress(&self, batch_id: Uuid) -> EngineResult<BatchGeneration> {
        self.load(batch_id).await
    }

    async fn load(&self, batch_id: Uuid) -> EngineResult<BatchGeneration> {
        self.store
            .get_batch(batch_id)
            .await?
            .ok_or_else(|| EngineError::validation(format!("batch {batch_id} does not exist")))
    }

    async fn cancel_flag(&self, batch_id: Uuid) -> Arc<AtomicBool> {
        let mut flags = self.cancel_flags.lock().await;
        flags
            .entry(batch_id)
            .or_insert_with(|| Arc::new(AtomicBool::new(false)))
            .clone()
    }
}

fn item_request(spec: &BatchSpec, module_id: Uuid, content_type: ContentType) -> NewRequest {
    NewRequest {
        organization_id: spec.organization_id,
        course_id: spec.course_id,
        module_id: Some(module_id),
        content_type,
        category: spec.category.clone(),
        template_id: None,
        parameters: spec.shared_parameters.clone(),
        model: spec.model.clone(),
        use_rag: spec.use_rag,
        use_cache: spec.use_cache,
        max_retries: spec.max_retries,
        timeout_seconds: spec.timeout_seconds,
    }
}
