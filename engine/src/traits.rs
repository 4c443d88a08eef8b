//! Trait definitions with mockall annotations for testing
//!
//! These traits are the engine's seams to the outside world: the
//! generative model, durable storage, and quality analysis. They are
//! used for dependency injection and enable comprehensive testing.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use shared::{
    BatchGeneration, ContentQualityScore, ContentRefinement, GenerationAnalytics,
    GenerationRequest, GenerationResult, GenerationTemplate, ProviderFailure, QualityDimension,
    RequestStatus, TokenUsage,
};

use crate::error::EngineResult;

/// One fully-rendered prompt ready for a provider
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// What a provider gives back on success
#[derive(Debug, Clone)]
pub struct ProviderReply {
    pub text: String,
    pub tokens: TokenUsage,
}

/// Raw per-dimension judgment from an analyzer, before weighting
#[derive(Debug, Clone, Default)]
pub struct QualityAssessment {
    pub dimension_scores: HashMap<QualityDimension, f64>,
    /// Analyzer self-reported confidence, 0.0-1.0
    pub confidence: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Narrowing filter for request listings
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub organization_id: Option<Uuid>,
    pub course_id: Option<Uuid>,
    pub status: Option<RequestStatus>,
}

/// Generative model abstraction
///
/// The engine treats the model as an opaque text-in/text-out service.
/// Timeout enforcement happens in the caller; adapters map transport
/// and payload problems onto `ProviderFailure`.
#[mockall::automock]
#[async_trait::async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Produce content for a rendered prompt
    ///
    /// # Returns
    /// Generated text with token accounting, or the failure class the
    /// caller uses to decide on retries
    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderReply, ProviderFailure>;

    /// Short provider label used in logs
    fn name(&self) -> &'static str;
}

/// Persistence abstraction over every engine entity
///
/// Single-entity writes are transactional. Multi-entity sequences are
/// the caller's problem and must be ordered defensively.
#[mockall::automock]
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    async fn create_request(&self, request: &GenerationRequest) -> EngineResult<()>;
    async fn get_request(&self, id: Uuid) -> EngineResult<Option<GenerationRequest>>;
    async fn update_request(&self, request: &GenerationRequest) -> EngineResult<()>;

    /// Atomically move a request between lifecycle states
    ///
    /// # Returns
    /// True when the request was in `from` and is now in `to`; false
    /// when another executor got there first
    async fn transition_request(
        &self,
        id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> EngineResult<bool>;

    async fn list_requests(&self, filter: &RequestFilter) -> EngineResult<Vec<GenerationRequest>>;

    async fn create_result(&self, result: &GenerationResult) -> EngineResult<()>;
    async fn get_result(&self, id: Uuid) -> EngineResult<Option<GenerationResult>>;
    async fn update_result(&self, result: &GenerationResult) -> EngineResult<()>;

    async fn create_score(&self, score: &ContentQualityScore) -> EngineResult<()>;
    async fn get_score(&self, id: Uuid) -> EngineResult<Option<ContentQualityScore>>;

    async fn create_template(&self, template: &GenerationTemplate) -> EngineResult<()>;
    async fn get_template(&self, id: Uuid) -> EngineResult<Option<GenerationTemplate>>;
    async fn update_template(&self, template: &GenerationTemplate) -> EngineResult<()>;

    /// Templates visible to an organization: its own plus global ones
    async fn list_templates(&self, organization_id: Uuid) -> EngineResult<Vec<GenerationTemplate>>;

    async fn create_refinement(&self, refinement: &ContentRefinement) -> EngineResult<()>;
    async fn update_refinement(&self, refinement: &ContentRefinement) -> EngineResult<()>;

    /// Refinements of a result ordered by iteration number
    async fn list_refinements(&self, result_id: Uuid) -> EngineResult<Vec<ContentRefinement>>;

    async fn create_batch(&self, batch: &BatchGeneration) -> EngineResult<()>;
    async fn get_batch(&self, id: Uuid) -> EngineResult<Option<BatchGeneration>>;
    async fn update_batch(&self, batch: &BatchGeneration) -> EngineResult<()>;

    /// Analytics bucket for one (organization, period) pair; None org
    /// addresses the platform-wide bucket
    async fn get_analytics(
        &self,
        organization_id: Option<Uuid>,
        period_start: DateTime<Utc>,
    ) -> EngineResult<Option<GenerationAnalytics>>;

    async fn upsert_analytics(&self, analytics: &GenerationAnalytics) -> EngineResult<()>;

    async fn list_analytics(
        &self,
        organization_id: Option<Uuid>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> EngineResult<Vec<GenerationAnalytics>>;
}

/// Quality analysis abstraction
///
/// Scores generated content on the seven fixed dimensions. The bundled
/// implementation is heuristic; model-backed analyzers plug in the same
/// way.
#[mockall::automock]
#[async_trait::async_trait]
pub trait QualityAnalyzer: Send + Sync {
    /// Judge content produced for the given request
    ///
    /// # Returns
    /// Per-dimension scores on a 0-100 scale plus narrative findings
    async fn assess(
        &self,
        request: &GenerationRequest,
        content: &str,
    ) -> EngineResult<QualityAssessment>;
}
