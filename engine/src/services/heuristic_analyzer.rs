//! Heuristic quality analyzer.
//!
//! Scores content from measurable text shape: length against a
//! per-content-type window, parameter echo, sentence geometry and
//! layout markers. Deterministic for identical inputs, so scoring a
//! result twice gives the same assessment. A model-backed analyzer can
//! replace it behind the same trait.

use std::collections::HashMap;

use shared::{ContentType, GenerationRequest, ParamValue, QualityDimension};

use crate::error::EngineResult;
use crate::traits::{QualityAnalyzer, QualityAssessment};

/// Word-count windows where content of each type reads complete
fn default_word_windows() -> HashMap<ContentType, (usize, usize)> {
    let mut windows = HashMap::new();
    windows.insert(ContentType::Quiz, (120, 900));
    windows.insert(ContentType::Slides, (150, 1200));
    windows.insert(ContentType::Syllabus, (200, 1200));
    windows.insert(ContentType::Exercise, (100, 800));
    windows.insert(ContentType::Summary, (80, 600));
    windows
}

pub struct HeuristicAnalyzer {
    word_windows: HashMap<ContentType, (usize, usize)>,
}

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self {
            word_windows: default_word_windows(),
        }
    }

    /// Pure scoring core, separated for direct testing
    pub fn assess_content(&self, request: &GenerationRequest, content: &str) -> QualityAssessment {
        let shape = TextShape::of(content);
        let window = self
            .word_windows
            .get(&request.content_type)
            .copied()
            .unwrap_or((100, 1000));

        let mut dimension_scores = HashMap::new();
        dimension_scores.insert(QualityDimension::Accuracy, accuracy_proxy(content, &shape));
        dimension_scores.insert(
            QualityDimension::Relevance,
            relevance_score(request, &content.to_lowercase()),
        );
        dimension_scores.insert(
            QualityDimension::Completeness,
            completeness_score(shape.words, window),
        );
        dimension_scores.insert(QualityDimension::Clarity, clarity_score(&shape));
        dimension_scores.insert(QualityDimension::Structure, structure_score(&shape));
        dimension_scores.insert(
            QualityDimension::Engagement,
            engagement_score(request.content_type, content, &shape),
        );
        dimension_scores.insert(
            QualityDimension::DifficultyAlignment,
            difficulty_alignment_score(request, &content.to_lowercase()),
        );

        let strengths: Vec<String> = dimension_scores
            .iter()
            .filter(|(_, score)| **score >= 80.0)
            .map(|(dimension, _)| format!("strong {dimension}"))
            .collect();
        let weaknesses: Vec<String> = dimension_scores
            .iter()
            .filter(|(_, score)| **score < 55.0)
            .map(|(dimension, _)| format!("weak {dimension}"))
            .collect();
        let suggestions: Vec<String> = dimension_scores
            .iter()
            .filter(|(_, score)| **score < 55.0)
            .map(|(dimension, _)| suggestion_for(*dimension))
            .collect();

        // Shape heuristics say little about short fragments
        let confidence = if shape.words >= 100 { 0.6 } else { 0.4 };

        QualityAssessment {
            dimension_scores,
            confidence,
            strengths,
            weaknesses,
            suggestions,
        }
    }
}

impl Default for HeuristicAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl QualityAnalyzer for HeuristicAnalyzer {
    async fn assess(
        &self,
        request: &GenerationRequest,
        content: &str,
    ) -> EngineResult<QualityAssessment> {
        Ok(self.assess_content(request, content))
    }
}

/// Measurable geometry of a text
struct TextShape {
    words: usize,
    lines: usize,
    list_lines: usize,
    sentence_count: usize,
    avg_sentence_words: f64,
    longest_sentence_words: usize,
    question_count: usize,
}

impl TextShape {
    fn of(content: &str) -> Self {
        let words = content.split_whitespace().count();
        let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        let list_lines = lines
            .iter()
            .filter(|line| {
                let trimmed = line.trim_start();
                trimmed.starts_with(|c: char| c.is_ascii_digit())
                    || trimmed.starts_with('-')
                    || trimmed.starts_with('*')
                    || trimmed.starts_with('#')
            })
            .count();

        let sentence_words: Vec<usize> = content
            .split(['.', '?', '!'])
            .map(|s| s.split_whitespace().count())
            .filter(|count| *count > 0)
            .collect();
        let sentence_count = sentence_words.len();
        let avg_sentence_words = if sentence_count == 0 {
            0.0
        } else {
            sentence_words.iter().sum::<usize>() as f64 / sentence_count as f64
        };

        Self {
            words,
            lines: lines.len(),
            list_lines,
            sentence_count,
            avg_sentence_words,
            longest_sentence_words: sentence_words.into_iter().max().unwrap_or(0),
            question_count: content.matches('?').count(),
        }
    }
}

/// No ground truth available, so penalize the telltales of broken
/// output: leftover placeholders, filler text, verbatim repetition
fn accuracy_proxy(content: &str, shape: &TextShape) -> f64 {
    let mut score: f64 = 78.0;
    let lower = content.to_lowercase();

    if content.contains('{') || content.contains('}') {
        score -= 25.0;
    }
    if lower.contains("lorem ipsum") || lower.contains("[insert") || lower.contains("xxx") {
        score -= 30.0;
    }

    // Identical non-empty lines signal degenerate generation
    let mut seen = std::collections::HashSet::new();
    let repeated = content
        .lines()
        .map(str::trim)
        .filter(|line| line.len() > 20)
        .filter(|line| !seen.insert(*line))
        .count();
    if repeated > 0 {
        score -= 10.0 * repeated as f64;
    }

    if shape.sentence_count >= 3 {
        score += 5.0;
    }
    score.clamp(0.0, 100.0)
}

/// Fraction of textual parameter values the content actually mentions
fn relevance_score(request: &GenerationRequest, content_lower: &str) -> f64 {
    let mut mentionable = 0usize;
    let mut mentioned = 0usize;

    for value in request.parameters.values() {
        match value {
            ParamValue::Text(text) => {
                mentionable += 1;
                if content_lower.contains(&text.to_lowercase()) {
                    mentioned += 1;
                }
            }
            ParamValue::List(items) => {
                for item in items {
                    mentionable += 1;
                    if content_lower.contains(&item.to_lowercase()) {
                        mentioned += 1;
                    }
                }
            }
            ParamValue::Number(_) | ParamValue::Flag(_) => {}
        }
    }

    if mentionable == 0 {
        // Nothing to echo; judge on the content type label instead
        let type_label = request.content_type.to_string();
        return if content_lower.contains(&type_label) { 75.0 } else { 65.0 };
    }
    30.0 + 70.0 * (mentioned as f64 / mentionable as f64)
}

fn completeness_score(words: usize, (low, high): (usize, usize)) -> f64 {
    if words == 0 {
        return 0.0;
    }
    if words < low {
        85.0 * words as f64 / low as f64
    } else if words <= high {
        90.0
    } else {
        // Rambling past the window erodes the score, floor at 60
        let overshoot = (words - high) as f64 / high as f64;
        (90.0 - 30.0 * overshoot).max(60.0)
    }
}

fn clarity_score(shape: &TextShape) -> f64 {
    if shape.sentence_count == 0 {
        return 20.0;
    }
    let mut score: f64 = if (8.0..=22.0).contains(&shape.avg_sentence_words) {
        85.0
    } else if shape.avg_sentence_words < 8.0 {
        85.0 - 4.0 * (8.0 - shape.avg_sentence_words)
    } else {
        85.0 - 3.0 * (shape.avg_sentence_words - 22.0)
    };
    if shape.longest_sentence_words > 45 {
        score -= 10.0;
    }
    score.clamp(20.0, 100.0)
}

fn structure_score(shape: &TextShape) -> f64 {
    if shape.lines >= 3 {
        let list_ratio = shape.list_lines as f64 / shape.lines as f64;
        if list_ratio >= 0.3 {
            88.0
        } else {
            70.0 + 30.0 * list_ratio
        }
    } else if shape.lines == 2 {
        55.0
    } else {
        // Single unbroken blob
        40.0
    }
}

fn engagement_score(content_type: ContentType, content: &str, shape: &TextShape) -> f64 {
    let mut score: f64 = 60.0;
    if shape.question_count > 0 {
        // Questions are the whole point of a quiz, a bonus elsewhere
        score += if content_type == ContentType::Quiz { 22.0 } else { 10.0 };
    } else if content_type == ContentType::Quiz {
        score -= 20.0;
    }
    let lower = content.to_lowercase();
    if lower.contains("you ") || lower.contains("your ") {
        score += 8.0;
    }
    if lower.contains("example") || lower.contains("for instance") {
        score += 6.0;
    }
    score.clamp(0.0, 100.0)
}

fn difficulty_alignment_score(request: &GenerationRequest, content_lower: &str) -> f64 {
    match request.parameters.get("difficulty") {
        Some(ParamValue::Text(level)) => {
            if content_lower.contains(&level.to_lowercase()) {
                85.0
            } else {
                65.0
            }
        }
        // No stated difficulty to align with
        _ => 75.0,
    }
}

fn suggestion_for(dimension: QualityDimension) -> String {
    match dimension {
        QualityDimension::Accuracy => "remove placeholder text and repeated passages".to_string(),
        QualityDimension::Relevance => "reference the requested topic and objectives directly".to_string(),
        QualityDimension::Completeness => "expand the content toward the expected length".to_string(),
        QualityDimension::Clarity => "rewrite with shorter, direct sentences".to_string(),
        QualityDimension::Structure => "break the content into sections or numbered items".to_string(),
        QualityDimension::Engagement => "add questions or learner-directed prompts".to_string(),
        QualityDimension::DifficultyAlignment => "match the language to the stated difficulty".to_string(),
    }
}
