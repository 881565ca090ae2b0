use ragbench_core::config::{BenchConfig, GenerationSettings, RetrievalSettings};
use ragbench_core::errors::ConfigError;
use ragbench_core::judge::JudgeService;
use ragbench_core::providers::llm::fake::FakeClient;
use ragbench_core::providers::llm::openai::OpenAIClient;
use ragbench_core::providers::llm::LlmClient;
use ragbench_core::providers::retrieval::fake::StaticRetriever;
use ragbench_core::providers::retrieval::http::HttpRetriever;
use ragbench_core::providers::retrieval::Retriever;
use ragbench_core::{Executor, Store};
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn build_executor(cfg: &BenchConfig, store: &Store) -> anyhow::Result<Executor> {
    let retriever = build_retriever(&cfg.retrieval)?;
    let generator = build_llm("generation", &cfg.generation.provider, &cfg.generation)?;
    let judge = if cfg.judge.enabled {
        let client = build_llm("judge", &cfg.judge.provider, &cfg.generation)?;
        Some(JudgeService::new(cfg.judge.runtime(), client))
    } else {
        None
    };
    tracing::debug!(
        generation = generator.provider_name(),
        judge = cfg.judge.enabled,
        "executor ready"
    );
    Ok(Executor {
        runs: Arc::new(store.clone()),
        questions: Arc::new(store.clone()),
        retriever,
        generator,
        judge,
        pricing: cfg.judge.pricing,
    })
}

fn build_retriever(settings: &RetrievalSettings) -> anyhow::Result<Arc<dyn Retriever>> {
    if let Some(path) = &settings.fixtures {
        return Ok(Arc::new(StaticRetriever::from_file(path)?));
    }
    match &settings.endpoint {
        Some(endpoint) => Ok(Arc::new(HttpRetriever::new(
            endpoint.clone(),
            Duration::from_secs(settings.timeout_seconds),
        )?)),
        None => Err(ConfigError("retrieval.endpoint or retrieval.fixtures must be set".into()).into()),
    }
}

/// The judge shares the generation section's credentials and timeout.
fn build_llm(
    role: &str,
    provider: &str,
    settings: &GenerationSettings,
) -> anyhow::Result<Arc<dyn LlmClient>> {
    match provider {
        "openai" => Ok(Arc::new(OpenAIClient::from_env(
            &settings.api_key_env,
            settings.base_url.clone(),
            Duration::from_secs(settings.timeout_seconds),
        )?)),
        "fake" => {
            let mut client = FakeClient::new("fake").with_judge_verdicts();
            if let Some(answer) = &settings.fake_response {
                client = client.with_response(answer.clone());
            }
            Ok(Arc::new(client))
        }
        other => Err(ConfigError(format!(
            "unknown {} provider '{}' (expected openai or fake)",
            role, other
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;

    fn store() -> Store {
        let store = Store::memory().unwrap();
        store.init_schema().unwrap();
        store
    }

    #[test]
    fn missing_retrieval_target_is_a_config_error() {
        let cfg = BenchConfig::default();
        let err = build_executor(&cfg, &store()).err().unwrap();
        assert_eq!(exit_codes::for_error(&err), exit_codes::CONFIG_ERROR);
    }

    #[test]
    fn fake_providers_build_without_credentials() {
        let mut cfg = BenchConfig::default();
        cfg.retrieval.endpoint = Some("http://localhost:9/search".into());
        cfg.generation.provider = "fake".into();
        cfg.judge.provider = "fake".into();
        let exec = build_executor(&cfg, &store()).unwrap();
        assert_eq!(exec.generator.provider_name(), "fake");
        assert!(exec.judge.is_some());

        cfg.judge.provider = "carrier-pigeon".into();
        let err = build_executor(&cfg, &store()).err().unwrap();
        assert!(err.to_string().contains("unknown judge provider"));
    }
}
