//! Process exit codes. Part of the CLI contract.

use ragbench_core::errors::{BenchError, ConfigError};

pub const SUCCESS: i32 = 0;
pub const RUN_FAILED: i32 = 1; // run finished failed or cancelled
pub const CONFIG_ERROR: i32 = 2;
pub const PRECONDITION_FAILED: i32 = 3; // missing run/dataset, invalid state

pub fn for_error(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.chain().find_map(|e| e.downcast_ref::<BenchError>()) {
        return e.exit_code();
    }
    if err.chain().any(|e| e.downcast_ref::<ConfigError>().is_some()) {
        return CONFIG_ERROR;
    }
    RUN_FAILED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_error_taxonomy() {
        let e: anyhow::Error = BenchError::AlreadyRunning("r1".into()).into();
        assert_eq!(for_error(&e), PRECONDITION_FAILED);
        let e: anyhow::Error = BenchError::Cancelled("r1".into()).into();
        assert_eq!(for_error(&e), RUN_FAILED);
        let e = anyhow::Error::new(ConfigError("bad".into())).context("loading ragbench.yaml");
        assert_eq!(for_error(&e), CONFIG_ERROR);
        assert_eq!(for_error(&anyhow::anyhow!("disk full")), RUN_FAILED);
    }
}
