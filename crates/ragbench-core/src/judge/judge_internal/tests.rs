use crate::judge::{Completeness, JudgeRuntimeConfig, JudgeService, Severity};
use crate::providers::llm::fake::FakeClient;
use crate::providers::llm::{GenerationRequest, LlmClient, LlmResponse, TokenUsage};
use async_trait::async_trait;
use std::sync::Arc;

struct MockLlmClient {
    responses: std::sync::Mutex<Vec<String>>,
    requests: std::sync::Mutex<Vec<GenerationRequest>>,
}

impl MockLlmClient {
    fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: std::sync::Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            requests: std::sync::Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let mut resps = self.responses.lock().unwrap();
        if resps.is_empty() {
            anyhow::bail!("No more mock responses");
        }
        Ok(LlmResponse {
            text: resps.remove(0),
            provider: "mock".to_string(),
            model: "mock".to_string(),
            usage: TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 20,
            },
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

fn judge(client: Arc<dyn LlmClient>) -> JudgeService {
    JudgeService::new(
        JudgeRuntimeConfig {
            provider: "mock".to_string(),
            model: "judge-model".to_string(),
            ..Default::default()
        },
        client,
    )
}

#[tokio::test]
async fn faithfulness_counts_supported_claims_from_fenced_output() {
    let mock = MockLlmClient::new(&[r#"```json
{"claims": [
  {"claim": "Paris is the capital", "supported": true},
  {"claim": "Paris has 9 million people", "supported": false, "reason": "not in context"},
  {"claim": "France is in Europe", "supported": true}
], "reasoning": "mostly supported"}
```"#]);
    let svc = judge(mock.clone());

    let v = svc
        .faithfulness("Paris is the capital of France.", &["Paris is the capital of France."])
        .await;
    assert!((v.score - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(v.claims.len(), 3);
    assert!(v.error.is_none());
    assert_eq!(v.usage.prompt_tokens, 100);

    let reqs = mock.requests.lock().unwrap();
    assert_eq!(reqs[0].temperature, 0.0);
    assert_eq!(reqs[0].model, "judge-model");
}

#[tokio::test]
async fn faithfulness_without_context_scores_zero_without_calling() {
    let mock = MockLlmClient::new(&[]);
    let svc = judge(mock.clone());
    let empty: [&str; 0] = [];
    let v = svc.faithfulness("Some answer", &empty).await;
    assert_eq!(v.score, 0.0);
    assert!(!v.reasoning.is_empty());
    assert!(v.error.is_none());
    assert!(mock.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unparsable_output_degrades_to_zero_with_error() {
    let mock = MockLlmClient::new(&["I think the answer is pretty relevant!"]);
    let svc = judge(mock);
    let v = svc.answer_relevance("What is 2+2?", "4").await;
    assert_eq!(v.score, 0.0);
    let err = v.error.expect("error recorded");
    assert!(err.contains("parse error"), "{}", err);
    // usage of the wasted call still counts
    assert_eq!(v.usage.completion_tokens, 20);
}

#[tokio::test]
async fn call_failure_degrades_to_zero_with_error() {
    let svc = judge(Arc::new(FakeClient::new("j").failing_on("QUESTION")));
    let v = svc.context_relevance("why?", &["chunk"]).await;
    assert_eq!(v.score, 0.0);
    assert!(v.error.unwrap().contains("judge call failed"));
    assert_eq!(v.usage, TokenUsage::default());
}

#[tokio::test]
async fn answer_relevance_reads_bands_and_clamps_score() {
    let mock = MockLlmClient::new(&[
        r#"Verdict: {"score": 1.4, "completeness": "partial", "focus": "focused", "reasoning": "ok"}"#,
    ]);
    let svc = judge(mock);
    let v = svc.answer_relevance("q", "a").await;
    assert_eq!(v.score, 1.0);
    assert_eq!(v.completeness, Completeness::Partial);
    // missing flag falls back to the score band
    assert!(v.addresses_question);
}

#[tokio::test]
async fn context_relevance_falls_back_to_chunk_share_and_drops_bad_indices() {
    let mock = MockLlmClient::new(&[r#"{"chunks": [
        {"index": 0, "relevant": true, "score": 0.9, "reason": "direct"},
        {"index": 1, "relevant": false, "score": 0.1},
        {"index": 7, "relevant": true}
    ]}"#]);
    let svc = judge(mock);
    let v = svc.context_relevance("q", &["a", "b"]).await;
    assert_eq!(v.chunks.len(), 2);
    assert!((v.score - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn hallucinations_carry_severity_and_type() {
    let mock = MockLlmClient::new(&[r#"{"hallucinations": [
        {"claim": "founded in 1802", "severity": "high", "type": "fabricated"}
    ], "hallucination_rate": 0.25, "reasoning": "one fabricated date"}"#]);
    let svc = judge(mock);
    let v = svc.hallucinations("answer", &["context"]).await;
    assert_eq!(v.hallucination_rate, 0.25);
    assert_eq!(v.hallucinations[0].severity, Severity::High);
    assert_eq!(v.hallucinations[0].kind, "fabricated");
}

#[tokio::test]
async fn combined_evaluation_weights_and_sums_usage() {
    let client = FakeClient::new("judge")
        .with_usage(50, 10)
        .with_route(
            crate::judge::FAITHFULNESS_SYSTEM,
            r#"{"claims": [{"claim": "a", "supported": true}, {"claim": "b", "supported": false}]}"#,
        )
        .with_route(
            crate::judge::ANSWER_RELEVANCE_SYSTEM,
            r#"{"score": 0.8, "completeness": "complete", "focus": "focused", "addresses_question": true}"#,
        )
        .with_route(crate::judge::CONTEXT_RELEVANCE_SYSTEM, r#"{"score": 0.333}"#);
    let svc = judge(Arc::new(client));

    let eval = svc
        .evaluate_rag_response("question?", "answer.", &["ctx one", "ctx two"])
        .await;
    // 0.4*0.5 + 0.4*0.8 + 0.2*0.333 = 0.5866 -> 0.587
    assert_eq!(eval.overall_score, 0.587);
    assert_eq!(eval.usage.prompt_tokens, 150);
    assert_eq!(eval.usage.completion_tokens, 30);
    assert!(eval.errors().is_empty());
}

#[tokio::test]
async fn combined_evaluation_survives_one_broken_evaluator() {
    let client = FakeClient::new("judge")
        .with_judge_verdicts()
        .failing_on(crate::judge::CONTEXT_RELEVANCE_SYSTEM);
    let svc = judge(Arc::new(client));
    let eval = svc.evaluate_rag_response("q", "a", &["c"]).await;
    assert_eq!(eval.overall_score, 0.8);
    let errors = eval.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("context_relevance:"));
}
