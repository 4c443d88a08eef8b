//! Test fixtures and data for engine tests
//!
//! This module provides consistent test data and fixtures used across all test suites.

use std::collections::HashMap;
use uuid::Uuid;

use engine::traits::QualityAssessment;
use shared::{
    ContentType, GenerationTemplate, NewRequest, ParamValue, Parameters, QualityDimension,
    TemplateScope,
};

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Standard tenant and course IDs using proper UUID format
    pub const ORG_A: &'static str = "550e8400-e29b-41d4-a716-446655440001";
    pub const ORG_B: &'static str = "550e8400-e29b-41d4-a716-446655440002";
    pub const COURSE_1: &'static str = "550e8400-e29b-41d4-a716-446655440010";
    pub const MODULE_1: &'static str = "550e8400-e29b-41d4-a716-446655440021";
    pub const MODULE_2: &'static str = "550e8400-e29b-41d4-a716-446655440022";

    /// Standard configuration values
    pub const TEST_TOPIC: &'static str = "photosynthesis";
    pub const GATE_MINIMUM: f64 = 70.0;
    pub const GATE_RETRIES: u32 = 2;

    pub fn org_a() -> Uuid {
        Uuid::parse_str(Self::ORG_A).unwrap()
    }

    pub fn org_b() -> Uuid {
        Uuid::parse_str(Self::ORG_B).unwrap()
    }

    pub fn course_1() -> Uuid {
        Uuid::parse_str(Self::COURSE_1).unwrap()
    }

    pub fn module_1() -> Uuid {
        Uuid::parse_str(Self::MODULE_1).unwrap()
    }

    pub fn module_2() -> Uuid {
        Uuid::parse_str(Self::MODULE_2).unwrap()
    }

    /// Parameters satisfying the standard quiz template
    pub fn quiz_params() -> Parameters {
        let mut params = Parameters::new();
        params.insert("topic".to_string(), Self::TEST_TOPIC.into());
        params
    }

    /// Quiz template with the standard quality gate and a required variable
    pub fn gated_quiz_template() -> GenerationTemplate {
        GenerationTemplate::new(
            "standard-quiz",
            ContentType::Quiz,
            "You are an experienced quiz author for online courses.",
            "Write a quiz about {topic} with clear, numbered questions.",
        )
        .with_required_variables(vec!["topic".to_string()])
        .with_quality_gate(Self::GATE_MINIMUM, Self::GATE_RETRIES)
    }

    /// Quiz template with the gate switched off
    pub fn ungated_quiz_template() -> GenerationTemplate {
        GenerationTemplate::new(
            "lenient-quiz",
            ContentType::Quiz,
            "You are an experienced quiz author for online courses.",
            "Write a quiz about {topic} with clear, numbered questions.",
        )
        .with_required_variables(vec!["topic".to_string()])
        .with_quality_gate(Self::GATE_MINIMUM, 0)
    }

    /// Quiz template with a gate low enough that synthesized demo
    /// content always clears it, for batch and concurrency tests
    pub fn relaxed_quiz_template() -> GenerationTemplate {
        GenerationTemplate::new(
            "relaxed-quiz",
            ContentType::Quiz,
            "You are an experienced quiz author for online courses.",
            "Write a quiz about {topic} with clear, numbered questions.",
        )
        .with_quality_gate(50.0, 1)
    }

    /// Summary template with a relaxed gate
    pub fn summary_template() -> GenerationTemplate {
        GenerationTemplate::new(
            "module-summary",
            ContentType::Summary,
            "You write concise study summaries for course modules.",
            "Summarize the key points of {topic} for revision.",
        )
        .with_quality_gate(50.0, 1)
    }

    /// Organization-scoped quiz template owned by org B
    pub fn org_b_private_template() -> GenerationTemplate {
        GenerationTemplate::new(
            "org-b-house-quiz",
            ContentType::Quiz,
            "You are the in-house quiz author.",
            "Write a quiz about {topic} in our house style.",
        )
        .with_scope(TemplateScope::Organization(Self::org_b()))
    }

    /// Standard quiz request for org A
    pub fn quiz_request() -> NewRequest {
        let mut spec = NewRequest::new(Self::org_a(), Self::course_1(), ContentType::Quiz);
        spec.parameters = Self::quiz_params();
        spec
    }

    /// Draft that scores far below any reasonable gate: placeholder
    /// braces, filler text and almost no body
    pub fn weak_draft() -> String {
        "lorem ipsum {notes} to be filled in later".to_string()
    }

    /// Draft that scores comfortably above the standard gate: echoes
    /// the topic, structured, question-driven, inside the length window
    pub fn strong_quiz_draft() -> String {
        "# Photosynthesis Review Quiz\n\
         \n\
         Answer every question in complete sentences. For example, a good answer to \
         the first question names both reactants and products. You should attempt all \
         of the questions before checking your notes.\n\
         \n\
         1. What raw materials does photosynthesis consume, and where do they enter the plant?\n\
         2. Which organelle hosts photosynthesis, and what pigment drives it?\n\
         3. How do the light reactions capture energy from sunlight?\n\
         4. What does the Calvin cycle produce, and why does the plant depend on it?\n\
         5. Compare photosynthesis with cellular respiration and note one key difference.\n\
         6. Why do leaves change colour in autumn when chlorophyll production slows down?\n\
         7. Explain how water availability limits the rate of photosynthesis in your own words.\n\
         8. Give an example where understanding photosynthesis applies outside the classroom.\n\
         \n\
         Review any question you found difficult before moving on to the next module.\n"
            .to_string()
    }

    /// Assessment whose weighted combination equals exactly `overall`
    pub fn uniform_assessment(overall: f64) -> QualityAssessment {
        let dimension_scores: HashMap<QualityDimension, f64> = QualityDimension::ALL
            .iter()
            .map(|dimension| (*dimension, overall))
            .collect();
        QualityAssessment {
            dimension_scores,
            confidence: 0.9,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            suggestions: Vec::new(),
        }
    }
}
