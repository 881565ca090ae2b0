use crate::model::TokenTotals;
use crate::providers::llm::TokenUsage;
use serde::{Deserialize, Serialize};

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            input_per_million: 0.15,
            output_per_million: 0.60,
        }
    }
}

pub fn estimate_cost(usage: TokenUsage, pricing: Pricing) -> f64 {
    (usage.prompt_tokens as f64 / 1_000_000.0) * pricing.input_per_million
        + (usage.completion_tokens as f64 / 1_000_000.0) * pricing.output_per_million
}

/// Cost of a run's generation and judge tokens together.
pub fn estimate_run_cost(tokens: &TokenTotals, pricing: Pricing) -> f64 {
    estimate_cost(
        TokenUsage {
            prompt_tokens: tokens.prompt(),
            completion_tokens: tokens.completion(),
        },
        pricing,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn million_tokens_cost_the_listed_rate() {
        let usage = TokenUsage {
            prompt_tokens: 1_000_000,
            completion_tokens: 2_000_000,
        };
        let cost = estimate_cost(usage, Pricing::default());
        assert!((cost - (0.15 + 1.20)).abs() < 1e-9);
    }

    #[test]
    fn run_cost_covers_generation_and_judge() {
        let tokens = TokenTotals {
            generation_prompt: 500_000,
            generation_completion: 0,
            judge_prompt: 500_000,
            judge_completion: 1_000_000,
        };
        let cost = estimate_run_cost(&tokens, Pricing::default());
        assert!((cost - 0.75).abs() < 1e-9);
    }
}
