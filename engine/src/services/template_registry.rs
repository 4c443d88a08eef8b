//! Template selection and effectiveness tracking

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use shared::{ContentType, GenerationTemplate};

use crate::error::{EngineError, EngineResult};
use crate::traits::ContentStore;

/// Ranks templates for requests and keeps their usage counters honest.
///
/// Counter updates are read-modify-write against the store, so they are
/// serialized behind one mutex; concurrent completions must not lose
/// increments.
pub struct TemplateRegistry<S> {
    store: Arc<S>,
    update_lock: Mutex<()>,
}

impl<S: ContentStore> TemplateRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            update_lock: Mutex::new(()),
        }
    }

    pub async fn register(&self, template: GenerationTemplate) -> EngineResult<GenerationTemplate> {
        self.store.create_template(&template).await?;
        debug!(template = %template.name, "📋 Registered template");
        Ok(template)
    }

    pub async fn get(&self, template_id: Uuid) -> EngineResult<Option<GenerationTemplate>> {
        self.store.get_template(template_id).await
    }

    /// Matching templates ranked by usage count, name as tiebreak
    pub async fn candidates(
        &self,
        content_type: ContentType,
        category: Option<&str>,
        organization_id: Uuid,
    ) -> EngineResult<Vec<GenerationTemplate>> {
        let mut matching: Vec<GenerationTemplate> = self
            .store
            .list_templates(organization_id)
            .await?
            .into_iter()
            .filter(|template| template.matches(content_type, category, organization_id))
            .collect();

        matching.sort_by(|a, b| {
            b.usage_count
                .cmp(&a.usage_count)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(matching)
    }

    /// Highest-ranked matching template, if any
    pub async fn best_match(
        &self,
        content_type: ContentType,
        category: Option<&str>,
        organization_id: Uuid,
    ) -> EngineResult<Option<GenerationTemplate>> {
        Ok(self
            .candidates(content_type, category, organization_id)
            .await?
            .into_iter()
            .next())
    }

    /// Record one generation attempt with a template.
    ///
    /// `success_score` present means the attempt's output became the
    /// standing result; its score folds into the running average.
    pub async fn record_usage(&self, template_id: Uuid, success_score: Option<f64>) -> EngineResult<()> {
        let _guard = self.update_lock.lock().await;

        let mut template = self.store.get_template(template_id).await?.ok_or_else(|| {
            EngineError::persistence("update", "template", format!("template {template_id} vanished"))
        })?;

        template.record_attempt();
        if let Some(score) = success_score {
            template.record_success(score);
        }
        self.store.update_template(&template).await
    }
}
