use crate::errors::ConfigError;
use crate::judge::{JudgeRuntimeConfig, Pricing};
use crate::model::ExecutionDefaults;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

/// Environment variable overriding `database`.
pub const DB_ENV: &str = "RAGBENCH_DB";

const SAMPLE_CONFIG: &str = include_str!("../assets/ragbench.yaml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchConfig {
    pub version: u32,
    pub database: PathBuf,
    /// System-wide pipeline settings, used when a knowledge base has no override.
    pub defaults: ExecutionDefaults,
    pub knowledge_bases: BTreeMap<String, ExecutionDefaults>,
    pub retrieval: RetrievalSettings,
    pub generation: GenerationSettings,
    pub judge: JudgeSettings,
    pub runner: RunnerSettings,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            database: PathBuf::from(".ragbench/bench.db"),
            defaults: ExecutionDefaults::default(),
            knowledge_bases: BTreeMap::new(),
            retrieval: RetrievalSettings::default(),
            generation: GenerationSettings::default(),
            judge: JudgeSettings::default(),
            runner: RunnerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Search endpoint of the retrieval collaborator.
    pub endpoint: Option<String>,
    pub timeout_seconds: u64,
    /// Canned search results (YAML or JSON) used instead of `endpoint` for offline runs.
    pub fixtures: Option<PathBuf>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_seconds: 30,
            fixtures: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// "openai" or "fake"
    pub provider: String,
    pub api_key_env: String,
    pub base_url: Option<String>,
    pub timeout_seconds: u64,
    /// Canned answer for the fake provider.
    pub fake_response: Option<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: None,
            timeout_seconds: 60,
            fake_response: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeSettings {
    pub enabled: bool,
    pub provider: String,
    pub model: String,
    pub max_tokens: u32,
    pub detect_hallucinations: bool,
    pub pricing: Pricing,
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1500,
            detect_hallucinations: false,
            pricing: Pricing::default(),
        }
    }
}

impl JudgeSettings {
    pub fn runtime(&self) -> JudgeRuntimeConfig {
        JudgeRuntimeConfig {
            provider: self.provider.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            detect_hallucinations: self.detect_hallucinations,
            pricing: self.pricing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Questions processed concurrently; results are still persisted in question order.
    pub parallelism: usize,
    /// Re-read the run status before each result is persisted and stop when cancelled.
    pub cancellation_check: bool,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            parallelism: 1,
            cancellation_check: true,
        }
    }
}

impl BenchConfig {
    pub fn database_path(&self) -> PathBuf {
        match std::env::var(DB_ENV) {
            Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
            _ => self.database.clone(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<BenchConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    parse_config(&raw)
}

pub fn parse_config(raw: &str) -> Result<BenchConfig, ConfigError> {
    let cfg: BenchConfig = serde_yaml::from_str(raw)
        .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;
    if cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError(format!(
            "unsupported config version {} (supported: {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }
    if cfg.runner.parallelism == 0 {
        return Err(ConfigError("runner.parallelism must be at least 1".into()));
    }
    Ok(cfg)
}

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(path, SAMPLE_CONFIG)
        .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))?;
    Ok(())
}
