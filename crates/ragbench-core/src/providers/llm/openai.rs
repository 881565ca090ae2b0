use crate::errors::ConfigError;
use super::{GenerationRequest, LlmClient, LlmResponse, Role, TokenUsage};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAIClient {
    pub api_key: String,
    pub base_url: String,
    pub client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(api_key: String, base_url: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            client,
        })
    }

    /// Build from the environment variable holding the API key.
    pub fn from_env(
        api_key_env: &str,
        base_url: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let api_key = std::env::var(api_key_env).map_err(|_| {
            ConfigError(format!(
                "{} is not set (needed by the openai provider)",
                api_key_env
            ))
        })?;
        Self::new(api_key, base_url, timeout)
    }

    fn request_body(request: &GenerationRequest) -> serde_json::Value {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system_prompt {
            messages.push(json!({ "role": "system", "content": system }));
        }
        for m in &request.messages {
            let role = match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            messages.push(json!({ "role": role, "content": m.content }));
        }
        json!({
            "model": request.model,
            "messages": messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }

    fn parse_response(json: &serde_json::Value, model: &str) -> anyhow::Result<LlmResponse> {
        let text = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("OpenAI API response missing content"))?
            .to_string();

        let usage = TokenUsage {
            prompt_tokens: json
                .pointer("/usage/prompt_tokens")
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
            completion_tokens: json
                .pointer("/usage/completion_tokens")
                .and_then(|v| v.as_u64())
                .unwrap_or(0),
        };

        Ok(LlmResponse {
            text,
            provider: "openai".to_string(),
            model: json
                .get("model")
                .and_then(|v| v.as_str())
                .unwrap_or(model)
                .to_string(),
            usage,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&Self::request_body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("OpenAI chat API timeout: {}", e)
                } else {
                    anyhow::anyhow!("OpenAI chat API network error: {}", e)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "OpenAI chat API error (status {}): {}",
                status.as_u16(),
                error_text
            );
        }

        let json: serde_json::Value = resp.json().await?;
        Self::parse_response(&json, &request.model)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::ChatMessage;

    #[test]
    fn body_puts_system_prompt_first() {
        let req = GenerationRequest {
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage::user("hi")],
            system_prompt: Some("be brief".into()),
            temperature: 0.0,
            max_tokens: 16,
        };
        let body = OpenAIClient::request_body(&req);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["max_tokens"], 16);
    }

    #[test]
    fn parses_content_and_usage() {
        let json = serde_json::json!({
            "model": "gpt-4o-mini-2024",
            "choices": [{"message": {"role": "assistant", "content": "Paris"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        });
        let resp = OpenAIClient::parse_response(&json, "gpt-4o-mini").unwrap();
        assert_eq!(resp.text, "Paris");
        assert_eq!(resp.model, "gpt-4o-mini-2024");
        assert_eq!(resp.usage.prompt_tokens, 12);
        assert_eq!(resp.usage.completion_tokens, 3);
    }

    #[test]
    fn missing_content_is_an_error() {
        let json = serde_json::json!({"choices": []});
        assert!(OpenAIClient::parse_response(&json, "m").is_err());
    }
}
