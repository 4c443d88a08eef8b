//! Test helpers and builder patterns for engine tests
//!
//! This module provides convenient helper functions and builder patterns
//! to reduce test boilerplate and improve maintainability.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use engine::services::{HeuristicAnalyzer, MemoryStore, ScriptedProvider};
use engine::traits::{ContentStore, GenerationProvider, MockQualityAnalyzer, QualityAnalyzer};
use engine::{ContentEngine, EngineConfig};
use shared::{day_bounds, GenerationAnalytics, GenerationRequest, GenerationTemplate, ProviderFailure};

use super::fixtures::TestFixtures;

/// Engine over the offline provider and the heuristic analyzer
pub type ScriptedEngine = ContentEngine<ScriptedProvider, MemoryStore, HeuristicAnalyzer>;

/// Engine whose analyzer yields scripted overall scores
pub type GatedEngine = ContentEngine<ScriptedProvider, MemoryStore, MockQualityAnalyzer>;

/// Builder pattern for creating test engines with sensible defaults
pub struct EngineBuilder {
    outcomes: Vec<Result<String, ProviderFailure>>,
    latency: Option<Duration>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            outcomes: Vec::new(),
            latency: None,
            config: EngineConfig::default(),
        }
    }

    /// Script the provider: these outcomes are served in order before
    /// the provider falls back to content synthesis
    pub fn with_outcomes(mut self, outcomes: Vec<Result<String, ProviderFailure>>) -> Self {
        self.outcomes = outcomes;
        self
    }

    /// Make every provider call take this long
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_cache_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    pub fn with_max_refinements(mut self, max_iterations: u32) -> Self {
        self.config.max_refinement_iterations = max_iterations;
        self
    }

    /// Build an engine scoring content with the heuristic analyzer
    pub fn build(self) -> ScriptedEngine {
        let (provider, config) = self.into_parts();
        ContentEngine::new(provider, MemoryStore::new(), HeuristicAnalyzer::new(), config)
    }

    /// Build an engine whose analyzer returns these overall scores in
    /// order, repeating the last one once the list runs out
    pub fn build_with_scores(self, overall_scores: Vec<f64>) -> GatedEngine {
        let analyzer = TestHelpers::scripted_analyzer(overall_scores);
        let (provider, config) = self.into_parts();
        ContentEngine::new(provider, MemoryStore::new(), analyzer, config)
    }

    fn into_parts(self) -> (ScriptedProvider, EngineConfig) {
        let provider = if !self.outcomes.is_empty() {
            ScriptedProvider::with_outcomes(self.outcomes)
        } else if let Some(latency) = self.latency {
            ScriptedProvider::with_latency(latency)
        } else {
            ScriptedProvider::new()
        };
        (provider, self.config)
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper functions for common test operations
pub struct TestHelpers;

impl TestHelpers {
    /// Analyzer returning uniform assessments with these overall scores,
    /// one per call, repeating the last score once the list is spent
    pub fn scripted_analyzer(overall_scores: Vec<f64>) -> MockQualityAnalyzer {
        assert!(!overall_scores.is_empty(), "scripted analyzer needs at least one score");
        let call = AtomicUsize::new(0);
        let mut analyzer = MockQualityAnalyzer::new();
        analyzer.expect_assess().returning(move |_, _| {
            let index = call.fetch_add(1, Ordering::SeqCst).min(overall_scores.len() - 1);
            Ok(TestFixtures::uniform_assessment(overall_scores[index]))
        });
        analyzer
    }

    /// Register the standard gated quiz template
    pub async fn seed_quiz_template<P, S, A>(engine: &ContentEngine<P, S, A>) -> GenerationTemplate
    where
        P: GenerationProvider + 'static,
        S: ContentStore + 'static,
        A: QualityAnalyzer + 'static,
    {
        engine
            .register_template(TestFixtures::gated_quiz_template())
            .await
            .expect("quiz template registration")
    }

    /// Register relaxed quiz and summary templates that synthesized
    /// content always clears
    pub async fn seed_relaxed_templates<P, S, A>(engine: &ContentEngine<P, S, A>)
    where
        P: GenerationProvider + 'static,
        S: ContentStore + 'static,
        A: QualityAnalyzer + 'static,
    {
        engine
            .register_template(TestFixtures::relaxed_quiz_template())
            .await
            .expect("quiz template registration");
        engine
            .register_template(TestFixtures::summary_template())
            .await
            .expect("summary template registration");
    }

    /// Submit the standard quiz request and return the pending row
    pub async fn submit_quiz<P, S, A>(engine: &ContentEngine<P, S, A>) -> GenerationRequest
    where
        P: GenerationProvider + 'static,
        S: ContentStore + 'static,
        A: QualityAnalyzer + 'static,
    {
        engine
            .submit(TestFixtures::quiz_request())
            .await
            .expect("quiz submission")
    }

    /// Today's analytics bucket for an organization, or the platform
    /// stream when `organization_id` is `None`
    pub async fn day_bucket<P, S, A>(
        engine: &ContentEngine<P, S, A>,
        organization_id: Option<Uuid>,
    ) -> GenerationAnalytics
    where
        P: GenerationProvider + 'static,
        S: ContentStore + 'static,
        A: QualityAnalyzer + 'static,
    {
        let (from, to) = day_bounds(Utc::now());
        engine
            .analytics(organization_id, from, to)
            .await
            .expect("analytics query")
            .pop()
            .expect("an analytics bucket for today")
    }
}
