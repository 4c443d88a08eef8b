//! Usage analytics bucketed by organization and UTC day

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::types::{QualityLevel, TokenUsage};

/// UTC-midnight-aligned day bucket containing the given instant
pub fn day_bounds(at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&at.date_naive().and_time(NaiveTime::MIN));
    (start, start + Duration::days(1))
}

/// What a single finished execution contributes to its buckets
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    pub failed: bool,
    pub cache_hit: bool,
    pub duration_ms: u64,
    pub tokens: TokenUsage,
    pub cost: f64,
    /// Estimated cost of the generation this cache hit avoided
    pub cache_savings: f64,
    pub quality_level: Option<QualityLevel>,
}

/// Additively-updated usage rollup; one record per (organization, day).
///
/// `organization_id: None` is the platform-wide bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationAnalytics {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub cache_hits: u64,
    pub min_duration_ms: Option<u64>,
    pub max_duration_ms: Option<u64>,
    /// Running mean over every recorded execution
    pub avg_duration_ms: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_cost: f64,
    pub cost_savings_from_cache: f64,
    pub quality_counts: HashMap<QualityLevel, u64>,
    pub refinements_started: u64,
    pub refinements_completed: u64,
    pub updated_at: DateTime<Utc>,
}

impl GenerationAnalytics {
    /// Empty bucket for the UTC day containing `at`
    pub fn day_bucket(organization_id: Option<Uuid>, at: DateTime<Utc>) -> Self {
        let (period_start, period_end) = day_bounds(at);
        Self {
            id: Uuid::new_v4(),
            organization_id,
            period_start,
            period_end,
            total_requests: 0,
            failed_requests: 0,
            cache_hits: 0,
            min_duration_ms: None,
            max_duration_ms: None,
            avg_duration_ms: 0.0,
            total_input_tokens: 0,
            total_output_tokens: 0,
            total_cost: 0.0,
            cost_savings_from_cache: 0.0,
            quality_counts: HashMap::new(),
            refinements_started: 0,
            refinements_completed: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn completed_requests(&self) -> u64 {
        self.total_requests - self.failed_requests
    }

    /// Fold one execution into the bucket
    pub fn apply_execution(&mut self, outcome: &ExecutionOutcome) {
        let recorded_before = self.total_requests as f64;
        self.avg_duration_ms =
            (self.avg_duration_ms * recorded_before + outcome.duration_ms as f64) / (recorded_before + 1.0);
        self.total_requests += 1;

        self.min_duration_ms = Some(match self.min_duration_ms {
            Some(min) => min.min(outcome.duration_ms),
            None => outcome.duration_ms,
        });
        self.max_duration_ms = Some(match self.max_duration_ms {
            Some(max) => max.max(outcome.duration_ms),
            None => outcome.duration_ms,
        });

        if outcome.failed {
            self.failed_requests += 1;
        }
        if outcome.cache_hit {
            self.cache_hits += 1;
            self.cost_savings_from_cache += outcome.cache_savings;
        }
        if let Some(level) = outcome.quality_level {
            *self.quality_counts.entry(level).or_insert(0) += 1;
        }

        self.total_input_tokens += outcome.tokens.input_tokens;
        self.total_output_tokens += outcome.tokens.output_tokens;
        self.total_cost += outcome.cost;
        self.updated_at = Utc::now();
    }

    pub fn apply_refinement_started(&mut self) {
        self.refinements_started += 1;
        self.updated_at = Utc::now();
    }

    pub fn apply_refinement_completed(&mut self) {
        self.refinements_completed += 1;
        self.updated_at = Utc::now();
    }
}
