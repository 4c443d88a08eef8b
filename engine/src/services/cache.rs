//! Result cache keyed by request fingerprint.
//!
//! Entries carry the full served artifact so a hit never touches the
//! provider. Only acceptable-or-better content is worth replaying;
//! expiry is lazy, checked on probe.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared::{GenerationResult, QualityLevel};

/// One replayable generation
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result_id: Uuid,
    pub raw_output: String,
    pub processed_content: String,
    pub quality_level: QualityLevel,
    pub model: String,
    /// What producing this entry cost; credited as savings on hits
    pub generation_cost: f64,
    pub stored_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

pub struct GenerationCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl GenerationCache {
    /// Default time-to-live for cached generations
    pub const DEFAULT_TTL_HOURS: i64 = 24;

    pub fn new() -> Self {
        Self::with_ttl(Duration::hours(Self::DEFAULT_TTL_HOURS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Fresh entry for the key, dropping it if it expired
    pub async fn lookup(&self, key: &str) -> Option<CacheEntry> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.expires_at > Utc::now() => return Some(entry.clone()),
                Some(_) => {}
            }
        }
        debug!("🗑️ Evicting expired cache entry");
        self.entries.write().await.remove(key);
        None
    }

    /// Store a freshly generated result.
    ///
    /// Declined for below-acceptable quality and for results that were
    /// themselves served from cache (nothing new to keep).
    pub async fn store(
        &self,
        key: String,
        result: &GenerationResult,
        model: &str,
        generation_cost: f64,
    ) -> bool {
        if result.cached || result.quality_level < QualityLevel::Acceptable {
            return false;
        }
        let now = Utc::now();
        let entry = CacheEntry {
            result_id: result.id,
            raw_output: result.raw_output.clone(),
            processed_content: result.processed_content.clone(),
            quality_level: result.quality_level,
            model: model.to_string(),
            generation_cost,
            stored_at: now,
            expires_at: now + self.ttl,
        };
        self.entries.write().await.insert(key, entry);
        true
    }

    /// Drop every expired entry, returning how many went away
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for GenerationCache {
    fn default() -> Self {
        Self::new()
    }
}
