//! Engine binary entry point
//!
//! Drives a full demonstration pass through the engine: template
//! seeding, single generation with a cache replay, one refinement, a
//! parallel batch and the resulting analytics. Runs against the
//! scripted offline provider by default; pass `--provider openai` to
//! generate with a real model.

use clap::Parser;
use tracing::info;
use uuid::Uuid;

use engine::services::{HeuristicAnalyzer, MemoryStore, OpenAiProvider, ScriptedProvider};
use engine::{ContentEngine, EngineConfig, EngineError, EngineResult, GenerationProvider};
use shared::{
    day_bounds, logging, ContentType, GenerationAnalytics, GenerationResult, GenerationTemplate,
    ModelSettings, NewRequest, ParamValue, RefinementSpec, RefinementType, TemplateScope,
};

/// Demonstrates the content generation engine end to end
#[derive(Parser)]
#[command(name = "engine")]
#[command(about = "AI content generation engine for course authoring")]
struct Args {
    /// Provider selection (scripted runs offline, openai uses OPENAI_API_KEY)
    #[arg(long, default_value = "scripted")]
    provider: String,

    /// Model identifier passed to the provider
    #[arg(long, default_value = "gpt-4o-mini")]
    model: String,

    /// Topic the demo content is generated about
    #[arg(long, default_value = "photosynthesis")]
    topic: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Write a JSON report of the run to this path
    #[arg(long)]
    report: Option<String>,
}

#[tokio::main]
async fn main() -> EngineResult<()> {
    let args = Args::parse();
    logging::init_tracing(Some(&args.log_level));
    logging::log_startup("content generation engine demo");

    let outcome = match args.provider.as_str() {
        "scripted" => run_demo(ScriptedProvider::new(), &args).await,
        "openai" => run_demo(OpenAiProvider::from_env()?, &args).await,
        other => Err(EngineError::validation(format!(
            "unknown provider '{other}', expected 'scripted' or 'openai'"
        ))),
    };

    match &outcome {
        Ok(()) => logging::log_shutdown("demo complete"),
        Err(error) => logging::log_error("demo run", error),
    }
    outcome
}

async fn run_demo<P>(provider: P, args: &Args) -> EngineResult<()>
where
    P: GenerationProvider + 'static,
{
    let engine = ContentEngine::new(
        provider,
        MemoryStore::new(),
        HeuristicAnalyzer::new(),
        EngineConfig::default(),
    );

    let organization_id = Uuid::new_v4();
    let course_id = Uuid::new_v4();
    seed_templates(&engine, organization_id).await?;

    // One request shape, executed twice: the second run must come out
    // of the cache
    let mut spec = NewRequest::new(organization_id, course_id, ContentType::Quiz);
    spec.model = ModelSettings::new(&args.model);
    spec.parameters.insert("topic".to_string(), ParamValue::from(args.topic.as_str()));
    spec.parameters.insert("difficulty".to_string(), ParamValue::from("beginner"));

    let first = engine.generate(spec.clone()).await?;
    info!(
        result_id = %first.id,
        quality = %first.quality_level,
        cached = first.cached,
        "📝 First generation"
    );

    let replay = engine.generate(spec).await?;
    info!(result_id = %replay.id, cached = replay.cached, "📝 Same request again");

    let refinement = engine
        .refine(
            first.id,
            RefinementSpec::new(
                RefinementType::Clarify,
                "Use shorter sentences and define key terms inline.",
            ),
        )
        .await?;
    info!(
        refined_result_id = ?refinement.refined_result_id,
        improvement = ?refinement.quality_improvement,
        "🔧 Refinement"
    );

    // A small batch across two modules and two content types
    let mut batch_spec = shared::BatchSpec::new(organization_id, course_id);
    batch_spec.target_modules = vec![Uuid::new_v4(), Uuid::new_v4()];
    batch_spec.content_types = vec![ContentType::Summary, ContentType::Exercise];
    batch_spec.model = ModelSettings::new(&args.model);
    batch_spec
        .shared_parameters
        .insert("topic".to_string(), ParamValue::from(args.topic.as_str()));

    let batch = engine.create_batch(batch_spec).await?;
    let settled = engine.run_batch(batch.id).await?;
    info!(
        status = %settled.status,
        completed = settled.completed_items,
        failed = settled.failed_items,
        actual_cost = settled.actual_cost,
        "📦 Batch"
    );

    let (today, tomorrow) = day_bounds(chrono::Utc::now());
    let org_buckets = engine.analytics(Some(organization_id), today, tomorrow).await?;
    let global_buckets = engine.analytics(None, today, tomorrow).await?;
    for bucket in &org_buckets {
        info!(
            requests = bucket.total_requests,
            failed = bucket.failed_requests,
            cache_hits = bucket.cache_hits,
            savings = bucket.cost_savings_from_cache,
            avg_duration_ms = bucket.avg_duration_ms,
            refinements = bucket.refinements_completed,
            "📊 Organization analytics"
        );
    }
    for bucket in &global_buckets {
        info!(
            requests = bucket.total_requests,
            total_cost = bucket.total_cost,
            "📊 Platform analytics"
        );
    }

    if let Some(path) = &args.report {
        write_report(path, &first, &org_buckets, &global_buckets)?;
    }
    Ok(())
}

async fn seed_templates<P>(
    engine: &ContentEngine<P, MemoryStore, HeuristicAnalyzer>,
    organization_id: Uuid,
) -> EngineResult<()>
where
    P: GenerationProvider + 'static,
{
    let quiz = GenerationTemplate::new(
        "standard-quiz",
        ContentType::Quiz,
        "You are a careful quiz author for online courses. Difficulty: {difficulty}.",
        "Write a quiz about {topic}. Number each question and keep answers verifiable.",
    )
    .with_required_variables(vec!["topic".to_string()])
    .with_quality_gate(70.0, 2);

    let house_quiz = GenerationTemplate::new(
        "house-style-quiz",
        ContentType::Quiz,
        "You write quizzes in this school's house style. Difficulty: {difficulty}.",
        "Write a quiz about {topic}. Open with a short scenario, then number the questions.",
    )
    .with_required_variables(vec!["topic".to_string()])
    .with_scope(TemplateScope::Organization(organization_id))
    .with_quality_gate(70.0, 2);

    let summary = GenerationTemplate::new(
        "module-summary",
        ContentType::Summary,
        "You condense course modules into clear study summaries.",
        "Summarize the key ideas of {topic} for revision. Use short paragraphs.",
    )
    .with_required_variables(vec!["topic".to_string()]);

    let exercise = GenerationTemplate::new(
        "practice-exercise",
        ContentType::Exercise,
        "You design hands-on practice exercises.",
        "Create a practice exercise about {topic} with numbered steps and a stretch goal.",
    )
    .with_required_variables(vec!["topic".to_string()]);

    for template in [quiz, house_quiz, summary, exercise] {
        engine.register_template(template).await?;
    }
    Ok(())
}

fn write_report(
    path: &str,
    result: &GenerationResult,
    org_buckets: &[GenerationAnalytics],
    global_buckets: &[GenerationAnalytics],
) -> EngineResult<()> {
    let report = serde_json::json!({
        "generated_at": logging::format_timestamp(),
        "sample_result": result,
        "organization_analytics": org_buckets,
        "platform_analytics": global_buckets,
    });
    let body = serde_json::to_string_pretty(&report)
        .map_err(|e| EngineError::persistence("serialize", "report", e.to_string()))?;
    std::fs::write(path, body)
        .map_err(|e| EngineError::persistence("write", "report", e.to_string()))?;
    info!(path, "📄 Report written");
    Ok(())
}
