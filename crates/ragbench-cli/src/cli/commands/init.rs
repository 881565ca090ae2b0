use super::context::{AppContext, DEFAULT_CONFIG};
use super::print_json;
use crate::exit_codes;
use ragbench_core::config::write_sample_config;
use serde_json::json;
use std::path::{Path, PathBuf};

pub(crate) fn run(config: Option<&Path>) -> anyhow::Result<i32> {
    let path = config
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let created = if path.exists() {
        eprintln!("Skipped {} (exists)", path.display());
        false
    } else {
        write_sample_config(&path)?;
        eprintln!("Created {}", path.display());
        true
    };

    let ctx = AppContext::open(Some(&path))?;
    print_json(&json!({
        "config": path.display().to_string(),
        "config_created": created,
        "database": ctx.cfg.database_path().display().to_string(),
    }))?;
    Ok(exit_codes::SUCCESS)
}
