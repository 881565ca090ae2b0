use anyhow::Context;
use ragbench_core::config::{self, BenchConfig};
use ragbench_core::providers::defaults::ConfigDefaults;
use ragbench_core::{RunManager, Store};
use std::path::Path;
use std::sync::Arc;

pub(crate) const DEFAULT_CONFIG: &str = "ragbench.yaml";

/// An explicit path must exist; the implicit `ragbench.yaml` is optional.
pub(crate) fn load_config(explicit: Option<&Path>) -> anyhow::Result<BenchConfig> {
    if let Some(path) = explicit {
        return Ok(config::load_config(path)?);
    }
    let path = Path::new(DEFAULT_CONFIG);
    if path.exists() {
        Ok(config::load_config(path)?)
    } else {
        tracing::debug!("no {} found; using built-in defaults", DEFAULT_CONFIG);
        Ok(BenchConfig::default())
    }
}

pub(crate) struct AppContext {
    pub cfg: BenchConfig,
    pub store: Store,
}

impl AppContext {
    pub(crate) fn open(config: Option<&Path>) -> anyhow::Result<Self> {
        let cfg = load_config(config)?;
        let db = cfg.database_path();
        let store = Store::open(&db)
            .with_context(|| format!("failed to open database {}", db.display()))?;
        store.init_schema()?;
        Ok(Self { cfg, store })
    }

    pub(crate) fn manager(&self) -> RunManager {
        RunManager::new(
            Arc::new(self.store.clone()),
            Arc::new(self.store.clone()),
            Arc::new(ConfigDefaults::from_config(&self.cfg)),
        )
    }
}
