use super::parse::{clamp_score, parse_verdict, round3};
use super::prompt;
use crate::judge::{
    AnswerRelevanceVerdict, ChunkEvaluation, ClaimVerdict, Completeness, ContextRelevanceVerdict,
    FaithfulnessVerdict, Focus, Hallucination, HallucinationVerdict, JudgeService, RagEvaluation,
};
use crate::providers::llm::{ChatMessage, GenerationRequest, TokenUsage};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, warn};

const FAITHFULNESS_WEIGHT: f64 = 0.4;
const ANSWER_RELEVANCE_WEIGHT: f64 = 0.4;
const CONTEXT_RELEVANCE_WEIGHT: f64 = 0.2;

#[derive(Deserialize)]
struct RawFaithfulness {
    #[serde(default)]
    claims: Vec<ClaimVerdict>,
    #[serde(default)]
    reasoning: String,
}

#[derive(Deserialize)]
struct RawAnswerRelevance {
    score: Option<f64>,
    #[serde(default)]
    completeness: Completeness,
    #[serde(default)]
    focus: Focus,
    addresses_question: Option<bool>,
    #[serde(default)]
    reasoning: String,
}

#[derive(Deserialize)]
struct RawContextRelevance {
    score: Option<f64>,
    #[serde(default)]
    chunks: Vec<ChunkEvaluation>,
    #[serde(default)]
    reasoning: String,
}

#[derive(Deserialize)]
struct RawHallucination {
    #[serde(default)]
    hallucinations: Vec<Hallucination>,
    hallucination_rate: Option<f64>,
    #[serde(default)]
    reasoning: String,
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn is_blank<S: AsRef<str>>(context: &[S]) -> bool {
    context.iter().all(|c| c.as_ref().trim().is_empty())
}

/// One judge call at temperature 0. Call and parse failures come back as an error
/// string together with whatever usage the call reported.
async fn call_and_parse<T: DeserializeOwned>(
    svc: &JudgeService,
    evaluator: &'static str,
    system: &str,
    prompt: String,
) -> (Result<T, String>, TokenUsage) {
    let request = GenerationRequest {
        provider: svc.config.provider.clone(),
        model: svc.config.model.clone(),
        messages: vec![ChatMessage::user(prompt)],
        system_prompt: Some(system.to_string()),
        temperature: 0.0,
        max_tokens: svc.config.max_tokens,
    };

    let resp = match svc.client.generate(&request).await {
        Ok(r) => r,
        Err(e) => {
            warn!(evaluator, error = %e, "judge call failed");
            return (
                Err(format!("judge call failed: {:#}", e)),
                TokenUsage::default(),
            );
        }
    };

    match parse_verdict::<T>(&resp.text) {
        Ok(v) => (Ok(v), resp.usage),
        Err(e) => {
            warn!(evaluator, error = %e, "judge output could not be parsed");
            (Err(format!("judge output parse error: {}", e)), resp.usage)
        }
    }
}

pub(crate) async fn faithfulness_impl<S: AsRef<str> + Sync>(
    svc: &JudgeService,
    answer: &str,
    context: &[S],
) -> FaithfulnessVerdict {
    if answer.trim().is_empty() || is_blank(context) {
        return FaithfulnessVerdict {
            reasoning: "No answer or no context to check the answer against".to_string(),
            ..Default::default()
        };
    }

    let started = Instant::now();
    let (parsed, usage) = call_and_parse::<RawFaithfulness>(
        svc,
        "faithfulness",
        prompt::FAITHFULNESS_SYSTEM,
        prompt::faithfulness_prompt(answer, context),
    )
    .await;
    let duration_ms = elapsed_ms(started);

    match parsed {
        Ok(raw) => {
            let total = raw.claims.len();
            let supported = raw.claims.iter().filter(|c| c.supported).count();
            // nothing asserted, nothing unsupported
            let score = if total == 0 {
                1.0
            } else {
                supported as f64 / total as f64
            };
            debug!(supported, total, duration_ms, "faithfulness verdict");
            FaithfulnessVerdict {
                score,
                claims: raw.claims,
                reasoning: raw.reasoning,
                error: None,
                usage,
                duration_ms,
            }
        }
        Err(error) => FaithfulnessVerdict {
            error: Some(error),
            usage,
            duration_ms,
            ..Default::default()
        },
    }
}

pub(crate) async fn answer_relevance_impl(
    svc: &JudgeService,
    question: &str,
    answer: &str,
) -> AnswerRelevanceVerdict {
    if answer.trim().is_empty() {
        return AnswerRelevanceVerdict {
            completeness: Completeness::Incomplete,
            reasoning: "No answer to evaluate".to_string(),
            ..Default::default()
        };
    }

    let started = Instant::now();
    let (parsed, usage) = call_and_parse::<RawAnswerRelevance>(
        svc,
        "answer_relevance",
        prompt::ANSWER_RELEVANCE_SYSTEM,
        prompt::answer_relevance_prompt(question, answer),
    )
    .await;
    let duration_ms = elapsed_ms(started);

    let parsed = parsed.and_then(|raw| match raw.score {
        Some(s) => Ok((clamp_score(s), raw)),
        None => Err("judge output parse error: Judge JSON missing 'score' field".to_string()),
    });

    match parsed {
        Ok((score, raw)) => AnswerRelevanceVerdict {
            score,
            completeness: raw.completeness,
            focus: raw.focus,
            addresses_question: raw.addresses_question.unwrap_or(score >= 0.5),
            reasoning: raw.reasoning,
            error: None,
            usage,
            duration_ms,
        },
        Err(error) => AnswerRelevanceVerdict {
            error: Some(error),
            usage,
            duration_ms,
            ..Default::default()
        },
    }
}

pub(crate) async fn context_relevance_impl<S: AsRef<str> + Sync>(
    svc: &JudgeService,
    question: &str,
    context: &[S],
) -> ContextRelevanceVerdict {
    if context.is_empty() || is_blank(context) {
        return ContextRelevanceVerdict {
            reasoning: "No context retrieved".to_string(),
            ..Default::default()
        };
    }

    let started = Instant::now();
    let (parsed, usage) = call_and_parse::<RawContextRelevance>(
        svc,
        "context_relevance",
        prompt::CONTEXT_RELEVANCE_SYSTEM,
        prompt::context_relevance_prompt(question, context),
    )
    .await;
    let duration_ms = elapsed_ms(started);

    let parsed = parsed.and_then(|raw| {
        let chunks: Vec<ChunkEvaluation> = raw
            .chunks
            .into_iter()
            .filter(|c| c.index < context.len())
            .map(|c| ChunkEvaluation {
                score: clamp_score(c.score),
                ..c
            })
            .collect();
        let score = match raw.score {
            Some(s) => clamp_score(s),
            None if !chunks.is_empty() => {
                chunks.iter().filter(|c| c.relevant).count() as f64 / context.len() as f64
            }
            None => {
                return Err(
                    "judge output parse error: Judge JSON has neither 'score' nor 'chunks'"
                        .to_string(),
                )
            }
        };
        Ok((score, chunks, raw.reasoning))
    });

    match parsed {
        Ok((score, chunks, reasoning)) => ContextRelevanceVerdict {
            score,
            chunks,
            reasoning,
            error: None,
            usage,
            duration_ms,
        },
        Err(error) => ContextRelevanceVerdict {
            error: Some(error),
            usage,
            duration_ms,
            ..Default::default()
        },
    }
}

pub(crate) async fn hallucination_impl<S: AsRef<str> + Sync>(
    svc: &JudgeService,
    answer: &str,
    context: &[S],
) -> HallucinationVerdict {
    if answer.trim().is_empty() || is_blank(context) {
        return HallucinationVerdict {
            reasoning: "No answer or no context to check for hallucinations".to_string(),
            ..Default::default()
        };
    }

    let started = Instant::now();
    let (parsed, usage) = call_and_parse::<RawHallucination>(
        svc,
        "hallucination",
        prompt::HALLUCINATION_SYSTEM,
        prompt::hallucination_prompt(answer, context),
    )
    .await;
    let duration_ms = elapsed_ms(started);

    let parsed = parsed.and_then(|raw| match raw.hallucination_rate {
        Some(rate) => Ok((clamp_score(rate), raw)),
        None if raw.hallucinations.is_empty() => Ok((0.0, raw)),
        None => Err(
            "judge output parse error: Judge JSON lists hallucinations without 'hallucination_rate'"
                .to_string(),
        ),
    });

    match parsed {
        Ok((rate, raw)) => HallucinationVerdict {
            hallucination_rate: rate,
            hallucinations: raw.hallucinations,
            reasoning: raw.reasoning,
            error: None,
            usage,
            duration_ms,
        },
        Err(error) => HallucinationVerdict {
            error: Some(error),
            usage,
            duration_ms,
            ..Default::default()
        },
    }
}

pub(crate) async fn evaluate_rag_impl<S: AsRef<str> + Sync>(
    svc: &JudgeService,
    question: &str,
    answer: &str,
    context: &[S],
) -> RagEvaluation {
    let started = Instant::now();
    let (faithfulness, answer_relevance, context_relevance) = tokio::join!(
        faithfulness_impl(svc, answer, context),
        answer_relevance_impl(svc, question, answer),
        context_relevance_impl(svc, question, context),
    );

    let overall_score = round3(
        FAITHFULNESS_WEIGHT * faithfulness.score
            + ANSWER_RELEVANCE_WEIGHT * answer_relevance.score
            + CONTEXT_RELEVANCE_WEIGHT * context_relevance.score,
    );
    let usage = faithfulness.usage + answer_relevance.usage + context_relevance.usage;

    RagEvaluation {
        faithfulness,
        answer_relevance,
        context_relevance,
        overall_score,
        usage,
        duration_ms: elapsed_ms(started),
    }
}
