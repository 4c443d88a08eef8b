//! Offline provider for demos and fixtures.
//!
//! Synthesizes structured, plausible-looking content derived only from
//! the prompt text, so identical prompts produce identical output and
//! no network or key is needed. Failures can be scripted up front to
//! exercise retry paths.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;

use shared::{ProviderFailure, TokenUsage};

use crate::traits::{GenerationProvider, ProviderReply, ProviderRequest};

pub struct ScriptedProvider {
    latency: Duration,
    /// Front-loaded outcomes consumed before synthesis kicks in
    outcomes: Mutex<VecDeque<Result<String, ProviderFailure>>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::with_latency(Duration::from_millis(25))
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            outcomes: Mutex::new(VecDeque::new()),
        }
    }

    /// Serve these outcomes first, then fall back to synthesis
    pub fn with_outcomes(outcomes: Vec<Result<String, ProviderFailure>>) -> Self {
        Self {
            latency: Duration::from_millis(1),
            outcomes: Mutex::new(outcomes.into()),
        }
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl GenerationProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderReply, ProviderFailure> {
        tokio::time::sleep(self.latency).await;

        if let Some(outcome) = self.outcomes.lock().await.pop_front() {
            return outcome.map(|text| reply_for(request, text));
        }

        Ok(reply_for(request, synthesize(&request.user_prompt)))
    }
}

fn reply_for(request: &ProviderRequest, text: String) -> ProviderReply {
    let input_tokens =
        (request.system_prompt.split_whitespace().count() + request.user_prompt.split_whitespace().count()) as u64;
    let output_tokens = text.split_whitespace().count() as u64;
    ProviderReply {
        text,
        tokens: TokenUsage::new(input_tokens, output_tokens),
    }
}

/// Seed derived from the prompt bytes keeps synthesis repeatable
fn prompt_seed(prompt: &str) -> u64 {
    prompt
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |hash, byte| {
            (hash ^ byte as u64).wrapping_mul(0x0000_0100_0000_01b3)
        })
}

/// Content-bearing words of the prompt, used as the subject vocabulary
fn subject_words(prompt: &str) -> Vec<String> {
    const FILLER: [&str; 14] = [
        "about", "with", "that", "this", "into", "from", "their", "these", "using", "write",
        "create", "generate", "include", "questions",
    ];

    let mut words: Vec<String> = prompt
        .split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|word| word.len() > 3 && word.chars().all(char::is_alphabetic))
        .filter(|word| !FILLER.contains(&word.as_str()))
        .collect();
    words.dedup();

    if words.len() < 3 {
        words.extend(["concept", "method", "practice"].map(String::from));
    }
    words
}

fn synthesize(user_prompt: &str) -> String {
    let mut rng = StdRng::seed_from_u64(prompt_seed(user_prompt));
    let words = subject_words(user_prompt);
    let pick = |rng: &mut StdRng| words[rng.gen_range(0..words.len())].clone();

    let mut out = String::new();
    let subject = pick(&mut rng);
    out.push_str(&format!("# Working with {subject}\n\n"));
    out.push_str(&format!(
        "This material walks you through {subject} step by step. \
         For example, each item below builds on the previous one, \
         and you should attempt them in order.\n\n"
    ));

    let item_count = rng.gen_range(6..=10);
    for item in 1..=item_count {
        let a = pick(&mut rng);
        let b = pick(&mut rng);
        let line = match rng.gen_range(0..4) {
            0 => format!("{item}. What is the relationship between {a} and {b}?"),
            1 => format!("{item}. Explain how {a} influences {b} in your own words."),
            2 => format!("{item}. Give an example where {a} applies outside the classroom."),
            _ => format!("{item}. Compare {a} with {b} and note one key difference."),
        };
        out.push_str(&line);
        out.push('\n');
    }

    out.push_str(&format!(
        "\nSummary: you have now covered the essentials of {subject}. \
         Review any item you found difficult before moving on.\n"
    ));
    out
}
