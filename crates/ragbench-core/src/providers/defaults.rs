use crate::config::BenchConfig;
use crate::model::ExecutionDefaults;
use std::collections::BTreeMap;

/// Knowledge-base configuration provider.
pub trait DefaultsSource: Send + Sync {
    /// Settings of a knowledge base, if it has its own.
    fn execution_defaults(&self, knowledge_base_id: &str) -> Option<ExecutionDefaults>;

    fn system_defaults(&self) -> ExecutionDefaults;

    fn resolve(&self, knowledge_base_id: &str) -> ExecutionDefaults {
        self.execution_defaults(knowledge_base_id)
            .unwrap_or_else(|| self.system_defaults())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigDefaults {
    system: ExecutionDefaults,
    knowledge_bases: BTreeMap<String, ExecutionDefaults>,
}

impl ConfigDefaults {
    pub fn new(system: ExecutionDefaults) -> Self {
        Self {
            system,
            knowledge_bases: BTreeMap::new(),
        }
    }

    pub fn from_config(cfg: &BenchConfig) -> Self {
        Self {
            system: cfg.defaults.clone(),
            knowledge_bases: cfg.knowledge_bases.clone(),
        }
    }

    pub fn with_knowledge_base(mut self, id: impl Into<String>, settings: ExecutionDefaults) -> Self {
        self.knowledge_bases.insert(id.into(), settings);
        self
    }
}

impl DefaultsSource for ConfigDefaults {
    fn execution_defaults(&self, knowledge_base_id: &str) -> Option<ExecutionDefaults> {
        self.knowledge_bases.get(knowledge_base_id).cloned()
    }

    fn system_defaults(&self) -> ExecutionDefaults {
        self.system.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kb_falls_back_to_system_defaults() {
        let cfg = crate::config::parse_config(
            "version: 1\nknowledge_bases:\n  handbook:\n    model: gpt-4o\n",
        )
        .unwrap();
        let defaults = ConfigDefaults::from_config(&cfg);
        assert_eq!(defaults.resolve("handbook").model, "gpt-4o");
        // unspecified fields of an override keep their defaults
        assert_eq!(defaults.resolve("handbook").max_results, 5);
        assert_eq!(defaults.resolve("other"), ExecutionDefaults::default());
    }
}
