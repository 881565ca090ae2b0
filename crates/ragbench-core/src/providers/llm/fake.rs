use super::{GenerationRequest, LlmClient, LlmResponse, TokenUsage};
use async_trait::async_trait;
use std::sync::Mutex;

/// Deterministic client for tests and offline runs.
///
/// Routes pick the first response whose needle occurs in the request text; without a
/// matching route the fixed response is returned. Every call is recorded.
#[derive(Debug, Default)]
pub struct FakeClient {
    model: String,
    fixed_response: Option<String>,
    routes: Vec<(String, String)>,
    fail_on: Vec<String>,
    usage: TokenUsage,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl FakeClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
            },
            ..Default::default()
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    pub fn with_route(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.routes.push((needle.into(), response.into()));
        self
    }

    /// Fail any request whose text contains `needle`.
    pub fn failing_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_on.push(needle.into());
        self
    }

    pub fn with_usage(mut self, prompt_tokens: u64, completion_tokens: u64) -> Self {
        self.usage = TokenUsage {
            prompt_tokens,
            completion_tokens,
        };
        self
    }

    /// Route the four judge prompts to well-formed, perfect-score verdicts.
    pub fn with_judge_verdicts(self) -> Self {
        self.with_route(
            crate::judge::FAITHFULNESS_SYSTEM,
            r#"{"claims": [{"claim": "answer", "supported": true}], "reasoning": "supported"}"#,
        )
        .with_route(
            crate::judge::ANSWER_RELEVANCE_SYSTEM,
            r#"{"score": 1.0, "completeness": "complete", "focus": "focused", "addresses_question": true, "reasoning": "relevant"}"#,
        )
        .with_route(
            crate::judge::CONTEXT_RELEVANCE_SYSTEM,
            r#"{"score": 1.0, "chunks": [{"index": 0, "relevant": true, "score": 1.0, "reason": "on topic"}], "reasoning": "relevant"}"#,
        )
        .with_route(
            crate::judge::HALLUCINATION_SYSTEM,
            r#"{"hallucinations": [], "hallucination_rate": 0.0, "reasoning": "none"}"#,
        )
    }

    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for FakeClient {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<LlmResponse> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        let text = request.full_text();
        if let Some(needle) = self.fail_on.iter().find(|n| text.contains(n.as_str())) {
            anyhow::bail!("fake provider error: refused request containing '{}'", needle);
        }
        let response = self
            .routes
            .iter()
            .find(|(needle, _)| text.contains(needle.as_str()))
            .map(|(_, r)| r.clone())
            .or_else(|| self.fixed_response.clone())
            .unwrap_or_else(|| "fake answer".to_string());

        Ok(LlmResponse {
            text: response,
            provider: "fake".to_string(),
            model: if request.model.is_empty() {
                self.model.clone()
            } else {
                request.model.clone()
            },
            usage: self.usage,
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::ChatMessage;

    fn req(text: &str) -> GenerationRequest {
        GenerationRequest {
            provider: "fake".into(),
            model: String::new(),
            messages: vec![ChatMessage::user(text)],
            system_prompt: None,
            temperature: 0.0,
            max_tokens: 10,
        }
    }

    #[tokio::test]
    async fn routes_by_needle_then_falls_back() {
        let client = FakeClient::new("fake-1")
            .with_route("capital", "Paris")
            .with_response("default");
        assert_eq!(client.generate(&req("capital of France")).await.unwrap().text, "Paris");
        let other = client.generate(&req("weather")).await.unwrap();
        assert_eq!(other.text, "default");
        assert_eq!(other.model, "fake-1");
        assert_eq!(client.calls().len(), 2);
    }

    #[tokio::test]
    async fn failing_needle_errors() {
        let client = FakeClient::new("fake-1").failing_on("boom");
        assert!(client.generate(&req("boom now")).await.is_err());
    }
}
