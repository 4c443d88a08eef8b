//! Token cost estimation per model

use shared::TokenUsage;

/// USD per 1K tokens (input, output), most specific prefix first
const MODEL_RATES: [(&str, f64, f64); 7] = [
    ("gpt-4o-mini", 0.00015, 0.0006),
    ("gpt-4o", 0.0025, 0.01),
    ("gpt-4", 0.03, 0.06),
    ("gpt-3.5", 0.0005, 0.0015),
    ("claude-3-5-sonnet", 0.003, 0.015),
    ("claude-3-haiku", 0.00025, 0.00125),
    ("gemini-1.5-pro", 0.00125, 0.005),
];

/// Fallback for unknown models
const DEFAULT_RATES: (f64, f64) = (0.001, 0.002);

/// Prompt-side token allowance used before real usage is known
const PLANNING_INPUT_TOKENS: u64 = 500;

fn rates_for(model: &str) -> (f64, f64) {
    MODEL_RATES
        .iter()
        .find(|(prefix, _, _)| model.starts_with(prefix))
        .map(|(_, input, output)| (*input, *output))
        .unwrap_or(DEFAULT_RATES)
}

/// Cost of a measured provider exchange
pub fn estimate_cost(model: &str, tokens: &TokenUsage) -> f64 {
    let (input_rate, output_rate) = rates_for(model);
    (tokens.input_tokens as f64 / 1000.0) * input_rate
        + (tokens.output_tokens as f64 / 1000.0) * output_rate
}

/// Upper-bound cost of a planned generation, for batch estimates
pub fn planned_cost(model: &str, max_tokens: u32) -> f64 {
    estimate_cost(model, &TokenUsage::new(PLANNING_INPUT_TOKENS, max_tokens as u64))
}
