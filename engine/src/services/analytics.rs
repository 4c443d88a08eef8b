//! Usage analytics aggregation.
//!
//! Every execution lands in two daily buckets: the organization's and
//! the platform-wide one. Buckets are fetch-or-create followed by an
//! additive update; one mutex serializes the read-modify-write so
//! overlapping batch workers cannot lose increments.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use shared::{day_bounds, ExecutionOutcome, GenerationAnalytics};

use crate::error::EngineResult;
use crate::traits::ContentStore;

pub struct AnalyticsAggregator<S> {
    store: Arc<S>,
    write_lock: Mutex<()>,
}

impl<S: ContentStore> AnalyticsAggregator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Fold one finished execution into both buckets.
    ///
    /// The lifecycle calls this exactly once per execution, whatever
    /// the outcome.
    pub async fn record_execution(
        &self,
        organization_id: Uuid,
        at: DateTime<Utc>,
        outcome: &ExecutionOutcome,
    ) -> EngineResult<()> {
        let _guard = self.write_lock.lock().await;
        self.update_bucket(Some(organization_id), at, |bucket| bucket.apply_execution(outcome))
            .await?;
        self.update_bucket(None, at, |bucket| bucket.apply_execution(outcome))
            .await
    }

    pub async fn record_refinement_started(
        &self,
        organization_id: Uuid,
        at: DateTime<Utc>,
    ) -> EngineResult<()> {
        let _guard = self.write_lock.lock().await;
        self.update_bucket(Some(organization_id), at, |bucket| bucket.apply_refinement_started())
            .await?;
        self.update_bucket(None, at, |bucket| bucket.apply_refinement_started())
            .await
    }

    pub async fn record_refinement_completed(
        &self,
        organization_id: Uuid,
        at: DateTime<Utc>,
    ) -> EngineResult<()> {
        let _guard = self.write_lock.lock().await;
        self.update_bucket(Some(organization_id), at, |bucket| {
            bucket.apply_refinement_completed()
        })
        .await?;
        self.update_bucket(None, at, |bucket| bucket.apply_refinement_completed())
            .await
    }

    /// Buckets for one organization (or the global stream) whose period
    /// starts inside `[from, to)`
    pub async fn query(
        &self,
        organization_id: Option<Uuid>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<Vec<GenerationAnalytics>> {
        self.store.list_analytics(organization_id, from, to).await
    }

    async fn update_bucket(
        &self,
        organization_id: Option<Uuid>,
        at: DateTime<Utc>,
        apply: impl Fn(&mut GenerationAnalytics),
    ) -> EngineResult<()> {
        let (period_start, _) = day_bounds(at);
        let mut bucket = self
            .store
            .get_analytics(organization_id, period_start)
            .await?
            .unwrap_or_else(|| GenerationAnalytics::day_bucket(organization_id, at));

        apply(&mut bucket);
        self.store.upsert_analytics(&bucket).await
    }
}
