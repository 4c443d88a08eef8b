//! Comprehensive integration tests for the content engine
//!
//! These tests verify end-to-end behavior: cache replay, quality-gate
//! retries, concurrent execution claims, batch runs with cancellation,
//! refinement chains and the analytics rollups they feed.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use shared::{
    BatchSpec, BatchStatus, ContentType, ProviderFailure, QualityLevel, RefinementSpec,
    RefinementStatus, RefinementType, RequestStatus,
};

mod common;
use common::{EngineBuilder, TestFixtures, TestHelpers};

/// Quiz-only batch spec over freshly minted module ids
fn quiz_batch_spec(module_count: usize) -> BatchSpec {
    let mut spec = BatchSpec::new(TestFixtures::org_a(), TestFixtures::course_1());
    spec.target_modules = (0..module_count).map(|_| Uuid::new_v4()).collect();
    spec.content_types = vec![ContentType::Quiz];
    spec.shared_parameters = TestFixtures::quiz_params();
    spec
}

/// Test that an identical request replays the cached result: new result
/// row, same content, zero new cost, savings recorded
#[tokio::test]
async fn test_identical_requests_share_cached_result() {
    // Arrange - One scripted draft; a second provider call would
    // synthesize different content and break the equality below
    let engine = EngineBuilder::new()
        .with_outcomes(vec![Ok(TestFixtures::strong_quiz_draft())])
        .build();
    let template = TestHelpers::seed_quiz_template(&engine).await;

    // Act
    let first = engine.generate(TestFixtures::quiz_request()).await.unwrap();
    let first_cost = engine.poll(first.request_id).await.unwrap().cost;
    let replay = engine.generate(TestFixtures::quiz_request()).await.unwrap();

    // Assert - Fresh result row backed by the cached payload
    assert!(!first.cached);
    assert!(replay.cached);
    assert_ne!(replay.id, first.id);
    assert_eq!(replay.processed_content, first.processed_content);
    assert_eq!(replay.quality_level, first.quality_level);
    assert!(replay.expires_at.is_some());

    // The replayed request cost nothing and touched no counters
    assert!(first_cost > 0.0);
    assert_eq!(engine.poll(replay.request_id).await.unwrap().cost, 0.0);
    let template = engine.template(template.id).await.unwrap().unwrap();
    assert_eq!(template.usage_count, 1);
    assert_eq!(engine.cached_entries().await, 1);

    let bucket = TestHelpers::day_bucket(&engine, Some(TestFixtures::org_a())).await;
    assert_eq!(bucket.total_requests, 2);
    assert_eq!(bucket.cache_hits, 1);
    assert!((bucket.total_cost - first_cost).abs() < 1e-9);
    assert!((bucket.cost_savings_from_cache - first_cost).abs() < 1e-9);
}

/// Test that requests opting out of the cache always generate fresh
#[tokio::test]
async fn test_cache_bypass_generates_fresh_content() {
    // Arrange
    let engine = EngineBuilder::new()
        .with_outcomes(vec![
            Ok(TestFixtures::strong_quiz_draft()),
            Ok(TestFixtures::strong_quiz_draft()),
        ])
        .build();
    TestHelpers::seed_quiz_template(&engine).await;
    let mut spec = TestFixtures::quiz_request();
    spec.use_cache = false;

    // Act
    let first = engine.generate(spec.clone()).await.unwrap();
    let second = engine.generate(spec).await.unwrap();

    // Assert
    assert!(!first.cached);
    assert!(!second.cached);
    assert_eq!(first.cache_key, None);
    assert_eq!(engine.cached_entries().await, 0);
}

/// Test that expired cache entries do not serve replays
#[tokio::test]
async fn test_cache_entries_expire_after_ttl() {
    // Arrange
    let engine = EngineBuilder::new()
        .with_outcomes(vec![
            Ok(TestFixtures::strong_quiz_draft()),
            Ok(TestFixtures::strong_quiz_draft()),
        ])
        .with_cache_ttl(chrono::Duration::milliseconds(40))
        .build();
    TestHelpers::seed_quiz_template(&engine).await;

    // Act
    engine.generate(TestFixtures::quiz_request()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;
    let second = engine.generate(TestFixtures::quiz_request()).await.unwrap();

    // Assert
    assert!(!second.cached);
    let bucket = TestHelpers::day_bucket(&engine, Some(TestFixtures::org_a())).await;
    assert_eq!(bucket.cache_hits, 0);
}

/// Test the quality gate end to end: two low drafts burn gate retries,
/// the third passes and earns the template its success
#[tokio::test]
async fn test_quality_gate_retries_until_passing() {
    // Arrange
    let engine = EngineBuilder::new()
        .with_outcomes(vec![
            Ok(TestFixtures::weak_draft()),
            Ok(TestFixtures::weak_draft()),
            Ok(TestFixtures::strong_quiz_draft()),
        ])
        .build();
    let template = TestHelpers::seed_quiz_template(&engine).await;
    let request = TestHelpers::submit_quiz(&engine).await;

    // Act
    let result = engine.execute(request.id).await.unwrap();

    // Assert
    assert_eq!(result.quality_level, QualityLevel::Good);
    let snapshot = engine.poll(request.id).await.unwrap();
    assert_eq!(snapshot.status, RequestStatus::Completed);
    assert_eq!(snapshot.retry_count, 2);

    // Three attempts on the template, one of them a success, and the
    // running average folded from that one passing score
    let template = engine.template(template.id).await.unwrap().unwrap();
    assert_eq!(template.usage_count, 3);
    assert_eq!(template.success_count, 1);
    assert!((86.0..89.0).contains(&template.avg_quality_score));

    let bucket = TestHelpers::day_bucket(&engine, Some(TestFixtures::org_a())).await;
    assert_eq!(bucket.total_requests, 1);
    assert_eq!(bucket.quality_counts.get(&QualityLevel::Good).copied().unwrap_or(0), 1);
}

/// Test that two executors racing for one request produce exactly one
/// result and one conflict, with the work counted once
#[tokio::test]
async fn test_concurrent_execution_has_single_winner() {
    // Arrange - Slow provider keeps the winner in flight while the
    // loser arrives
    let engine = Arc::new(
        EngineBuilder::new()
            .with_latency(Duration::from_millis(100))
            .build(),
    );
    TestHelpers::seed_relaxed_templates(&engine).await;
    let request = TestHelpers::submit_quiz(&engine).await;

    // Act
    let first = tokio::spawn({
        let engine = Arc::clone(&engine);
        let id = request.id;
        async move { engine.execute(id).await }
    });
    let second = tokio::spawn({
        let engine = Arc::clone(&engine);
        let id = request.id;
        async move { engine.execute(id).await }
    });
    let outcomes = vec![first.await.unwrap(), second.await.unwrap()];

    // Assert - One winner, one conflict
    let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(winners, 1);
    let conflict = outcomes.iter().find(|outcome| outcome.is_err()).unwrap();
    assert_eq!(conflict.as_ref().unwrap_err().code(), "concurrency_conflict");

    assert_eq!(engine.poll(request.id).await.unwrap().status, RequestStatus::Completed);
    let bucket = TestHelpers::day_bucket(&engine, Some(TestFixtures::org_a())).await;
    assert_eq!(bucket.total_requests, 1);
}

/// Test that a batch expands, runs every item and settles its counters
#[tokio::test]
async fn test_batch_completes_all_items() {
    // Arrange - Two modules by two content types
    let engine = EngineBuilder::new().build();
    TestHelpers::seed_relaxed_templates(&engine).await;
    let mut spec = BatchSpec::new(TestFixtures::org_a(), TestFixtures::course_1());
    spec.target_modules = vec![TestFixtures::module_1(), TestFixtures::module_2()];
    spec.content_types = vec![ContentType::Quiz, ContentType::Summary];
    spec.shared_parameters = TestFixtures::quiz_params();
    spec.parallel_workers = 2;

    // Act
    let batch = engine.create_batch(spec).await.unwrap();
    let settled = engine.run_batch(batch.id).await.unwrap();

    // Assert
    assert_eq!(batch.status, BatchStatus::Created);
    assert_eq!(batch.total_items, 4);
    assert!(batch.estimated_cost > 0.0);
    assert_eq!(settled.status, BatchStatus::Completed);
    assert_eq!(settled.completed_items, 4);
    assert_eq!(settled.failed_items, 0);
    assert_eq!(settled.skipped_items, 0);
    assert!((settled.progress_percentage - 100.0).abs() < 1e-9);
    assert!(settled.actual_cost > 0.0);
    for request_id in &settled.request_ids {
        let snapshot = engine.poll(*request_id).await.unwrap();
        assert_eq!(snapshot.status, RequestStatus::Completed);
    }
    let bucket = TestHelpers::day_bucket(&engine, Some(TestFixtures::org_a())).await;
    assert_eq!(bucket.total_requests, 4);

    // A settled batch cannot be started again
    let error = engine.run_batch(batch.id).await.unwrap_err();
    assert_eq!(error.code(), "concurrency_conflict");
}

/// Test that batch items with identical fingerprints share one cached
/// generation
#[tokio::test]
async fn test_batch_items_share_cached_results() {
    // Arrange - Three modules, one content type, one worker: the first
    // item generates, the other two replay its cache entry
    let engine = EngineBuilder::new().build();
    TestHelpers::seed_relaxed_templates(&engine).await;
    let mut spec = quiz_batch_spec(3);
    spec.parallel_workers = 1;

    // Act
    let batch = engine.create_batch(spec).await.unwrap();
    let settled = engine.run_batch(batch.id).await.unwrap();

    // Assert
    assert_eq!(settled.completed_items, 3);
    assert_eq!(engine.cached_entries().await, 1);
    let bucket = TestHelpers::day_bucket(&engine, Some(TestFixtures::org_a())).await;
    assert_eq!(bucket.total_requests, 3);
    assert_eq!(bucket.cache_hits, 2);
    assert!(bucket.cost_savings_from_cache > 0.0);
}

/// Test cooperative cancellation mid-run: in-flight items finish,
/// undrained items are skipped and their requests stay pending
#[tokio::test]
async fn test_batch_cancellation_skips_pending_items() {
    // Arrange - One slow worker over eight uncached items so the run is
    // still draining when the cancel lands
    let engine = Arc::new(
        EngineBuilder::new()
            .with_latency(Duration::from_millis(40))
            .build(),
    );
    TestHelpers::seed_relaxed_templates(&engine).await;
    let mut spec = quiz_batch_spec(8);
    spec.use_cache = false;
    spec.parallel_workers = 1;
    let batch = engine.create_batch(spec).await.unwrap();

    // Act
    let run = tokio::spawn({
        let engine = Arc::clone(&engine);
        let id = batch.id;
        async move { engine.run_batch(id).await }
    });
    tokio::time::sleep(Duration::from_millis(130)).await;
    engine.cancel_batch(batch.id).await.unwrap();
    let settled = run.await.unwrap().unwrap();

    // Assert - Every item is accounted for and progress still reaches
    // 100% with the skips counted
    assert_eq!(
        settled.completed_items + settled.failed_items + settled.skipped_items,
        settled.total_items
    );
    assert!(settled.skipped_items > 0);
    assert!((settled.progress_percentage - 100.0).abs() < 1e-9);
    assert_eq!(settled.status, BatchStatus::Completed);

    // Skipped requests were never claimed
    let mut pending = 0;
    for request_id in &settled.request_ids {
        if engine.poll(*request_id).await.unwrap().status == RequestStatus::Pending {
            pending += 1;
        }
    }
    assert_eq!(pending, settled.skipped_items);
}

/// Test that cancelling before the run starts skips every item
#[tokio::test]
async fn test_batch_cancel_before_run_skips_everything() {
    // Arrange
    let engine = EngineBuilder::new().build();
    TestHelpers::seed_relaxed_templates(&engine).await;
    let batch = engine.create_batch(quiz_batch_spec(2)).await.unwrap();

    // Act
    engine.cancel_batch(batch.id).await.unwrap();
    let settled = engine.run_batch(batch.id).await.unwrap();

    // Assert
    assert_eq!(settled.completed_items, 0);
    assert_eq!(settled.skipped_items, 2);
    assert!((settled.progress_percentage - 100.0).abs() < 1e-9);
    assert_eq!(settled.status, BatchStatus::Completed);

    // Cancelling a settled batch conflicts
    let error = engine.cancel_batch(batch.id).await.unwrap_err();
    assert_eq!(error.code(), "concurrency_conflict");
}

/// Test batch validation: empty expansion, oversized expansion, zero
/// workers and unservable content types all leave no trace
#[tokio::test]
async fn test_batch_validation_rejects_bad_specs() {
    // Arrange
    let engine = EngineBuilder::new().build();
    TestHelpers::seed_relaxed_templates(&engine).await;

    // Act & Assert - Nothing to expand
    let empty = BatchSpec::new(TestFixtures::org_a(), TestFixtures::course_1());
    assert_eq!(engine.create_batch(empty).await.unwrap_err().code(), "validation_error");

    // Expansion above the cap
    let mut oversized = quiz_batch_spec(4);
    oversized.max_batch_size = 3;
    assert_eq!(engine.create_batch(oversized).await.unwrap_err().code(), "capacity_error");

    // Worker pool cannot be empty
    let mut no_workers = quiz_batch_spec(2);
    no_workers.parallel_workers = 0;
    assert_eq!(engine.create_batch(no_workers).await.unwrap_err().code(), "validation_error");

    // No template serves exercises
    let mut unservable = quiz_batch_spec(1);
    unservable.content_types = vec![ContentType::Exercise];
    let error = engine.create_batch(unservable).await.unwrap_err();
    assert!(error.to_string().contains("no template available"));
}

/// Test that refinement creates a new versioned result and leaves the
/// original untouched
#[tokio::test]
async fn test_refinement_produces_versioned_result() {
    // Arrange
    let engine = EngineBuilder::new()
        .with_outcomes(vec![Ok(TestFixtures::strong_quiz_draft())])
        .build();
    TestHelpers::seed_quiz_template(&engine).await;
    let original = engine.generate(TestFixtures::quiz_request()).await.unwrap();

    // Act
    let refinement = engine
        .refine(
            original.id,
            RefinementSpec::new(RefinementType::Clarify, "Use shorter sentences.")
                .with_target_sections(vec!["questions".to_string()]),
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(refinement.status, RefinementStatus::Completed);
    assert_eq!(refinement.iteration_number, 1);
    assert!((86.0..89.0).contains(&refinement.original_quality_score));
    assert!(refinement.refined_quality_score.is_some());

    let refined = engine
        .result(refinement.refined_result_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refined.version, original.version + 1);
    assert_eq!(refined.parent_result_id, Some(original.id));
    assert!(refined.quality_score_id.is_some());
    assert!(!refined.cached);

    let untouched = engine.result(original.id).await.unwrap().unwrap();
    assert_eq!(untouched.processed_content, original.processed_content);

    let bucket = TestHelpers::day_bucket(&engine, Some(TestFixtures::org_a())).await;
    assert_eq!(bucket.refinements_started, 1);
    assert_eq!(bucket.refinements_completed, 1);
}

/// Test that a failed refinement keeps its record and still consumes
/// one iteration of the budget
#[tokio::test]
async fn test_refinement_failure_consumes_iteration() {
    // Arrange - Generation succeeds, the first refinement call does not
    let engine = EngineBuilder::new()
        .with_outcomes(vec![
            Ok(TestFixtures::strong_quiz_draft()),
            Err(ProviderFailure::RateLimited),
        ])
        .build();
    TestHelpers::seed_quiz_template(&engine).await;
    let original = engine.generate(TestFixtures::quiz_request()).await.unwrap();

    // Act
    let error = engine
        .refine(original.id, RefinementSpec::new(RefinementType::Expand, "add detail"))
        .await
        .unwrap_err();

    // Assert
    assert_eq!(error.code(), "provider_error");
    let history = engine.refinement_history(original.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, RefinementStatus::Failed);
    assert_eq!(history[0].refined_result_id, None);

    let bucket = TestHelpers::day_bucket(&engine, Some(TestFixtures::org_a())).await;
    assert_eq!(bucket.refinements_started, 1);
    assert_eq!(bucket.refinements_completed, 0);

    // The failed slot is spent; the next attempt is iteration two
    let retry = engine
        .refine(original.id, RefinementSpec::new(RefinementType::Expand, "add detail"))
        .await
        .unwrap();
    assert_eq!(retry.iteration_number, 2);
}

/// Test that concurrent refinements of one result serialize and cannot
/// oversubscribe the iteration budget
#[tokio::test]
async fn test_concurrent_refinements_respect_budget() {
    // Arrange
    let engine = Arc::new(EngineBuilder::new().with_max_refinements(2).build());
    TestHelpers::seed_relaxed_templates(&engine).await;
    let original = engine.generate(TestFixtures::quiz_request()).await.unwrap();

    // Act - Three callers race for two slots
    let mut handles = Vec::new();
    for _ in 0..3 {
        handles.push(tokio::spawn({
            let engine = Arc::clone(&engine);
            let id = original.id;
            async move {
                engine
                    .refine(id, RefinementSpec::new(RefinementType::Clarify, "tighten wording"))
                    .await
            }
        }));
    }
    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.unwrap());
    }

    // Assert
    let completed = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(completed, 2);
    let rejected = outcomes.iter().filter(|outcome| outcome.is_err()).count();
    assert_eq!(rejected, 1);

    let history = engine.refinement_history(original.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].iteration_number, 1);
    assert_eq!(history[1].iteration_number, 2);
}

/// Test that analytics keep per-organization streams apart while the
/// platform stream sees everything
#[tokio::test]
async fn test_analytics_split_by_organization() {
    // Arrange - Different topics so the tenants cannot share a cache key
    let engine = EngineBuilder::new().build();
    TestHelpers::seed_relaxed_templates(&engine).await;

    let org_a_spec = TestFixtures::quiz_request();
    let mut org_b_spec = shared::NewRequest::new(
        TestFixtures::org_b(),
        TestFixtures::course_1(),
        ContentType::Quiz,
    );
    org_b_spec.parameters.insert("topic".to_string(), "mitosis".into());

    // Act
    engine.generate(org_a_spec).await.unwrap();
    engine.generate(org_b_spec).await.unwrap();

    // Assert
    let org_a = TestHelpers::day_bucket(&engine, Some(TestFixtures::org_a())).await;
    let org_b = TestHelpers::day_bucket(&engine, Some(TestFixtures::org_b())).await;
    let platform = TestHelpers::day_bucket(&engine, None).await;
    assert_eq!(org_a.total_requests, 1);
    assert_eq!(org_b.total_requests, 1);
    assert_eq!(platform.total_requests, 2);
    assert!(
        (platform.total_cost - (org_a.total_cost + org_b.total_cost)).abs() < 1e-9
    );
}
