use crate::model::RunStatus;
use std::fmt::{Display, Formatter};

/// Precondition failures raised before any run state is touched. The exceptions are
/// `DatasetNotFound` and `EmptyDataset` on start, which mark the run failed. Callers
/// surface these as client errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BenchError {
    #[error("run not found: {0}")]
    RunNotFound(String),
    #[error("dataset not found: {0}")]
    DatasetNotFound(String),
    #[error("run {0} is already running")]
    AlreadyRunning(String),
    #[error("run {0} is already completed")]
    AlreadyCompleted(String),
    #[error("run {run_id} cannot move from {from} to {to}")]
    InvalidTransition {
        run_id: String,
        from: RunStatus,
        to: RunStatus,
    },
    #[error("dataset {0} has no active questions")]
    EmptyDataset(String),
    #[error("run {run_id} must be completed before comparing (status: {status})")]
    NotCompleted { run_id: String, status: RunStatus },
    #[error("run {0} has no aggregate metrics")]
    MissingAggregateMetrics(String),
    #[error("run {0} was cancelled")]
    Cancelled(String),
}

impl BenchError {
    /// Error a caller should surface for a start request on a run in `status`.
    pub fn for_start(run_id: &str, status: RunStatus) -> Self {
        match status {
            RunStatus::Running => Self::AlreadyRunning(run_id.to_string()),
            RunStatus::Completed => Self::AlreadyCompleted(run_id.to_string()),
            other => Self::InvalidTransition {
                run_id: run_id.to_string(),
                from: other,
                to: RunStatus::Running,
            },
        }
    }

    /// Process exit code used by the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Cancelled(_) => 1,
            _ => 3,
        }
    }
}

/// Pipeline stage a per-question failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Retrieval,
    Generation,
    Judge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionErrorKind {
    Retrieval,
    Generation,
    Judge,
    ProviderRateLimit,
    ProviderTimeout,
    ProviderServer,
    Network,
    Other,
}

impl QuestionErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Retrieval => "retrieval",
            Self::Generation => "generation",
            Self::Judge => "judge",
            Self::ProviderRateLimit => "provider_rate_limit",
            Self::ProviderTimeout => "provider_timeout",
            Self::ProviderServer => "provider_server",
            Self::Network => "network",
            Self::Other => "other",
        }
    }
}

/// A contained per-question failure. Never escalates to run failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct QuestionError {
    pub kind: QuestionErrorKind,
    pub message: String,
    /// True when `kind` was inferred from the message text rather than the stage.
    pub classified_from_message: bool,
}

impl QuestionError {
    pub fn new(kind: QuestionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            classified_from_message: false,
        }
    }

    /// Attribute an error to the stage it came from, unless the message names a
    /// more specific infrastructure cause.
    pub fn at_stage(stage: Stage, err: &anyhow::Error) -> Self {
        let message = format!("{:#}", err);
        let classified = Self::classify_message(message.clone());
        if classified.kind != QuestionErrorKind::Other {
            return classified;
        }
        let kind = match stage {
            Stage::Retrieval => QuestionErrorKind::Retrieval,
            Stage::Generation => QuestionErrorKind::Generation,
            Stage::Judge => QuestionErrorKind::Judge,
        };
        Self::new(kind, message)
    }

    pub fn classify_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let msg = message.to_lowercase();
        let kind = if msg.contains("rate limit") || has_status_code(&msg, &["429"]) {
            QuestionErrorKind::ProviderRateLimit
        } else if msg.contains("timeout") || msg.contains("timed out") || msg.contains("deadline") {
            QuestionErrorKind::ProviderTimeout
        } else if has_status_code(&msg, &["500", "502", "503", "504"])
            || msg.contains("provider error")
        {
            QuestionErrorKind::ProviderServer
        } else if msg.contains("network") || msg.contains("connection") || msg.contains("dns") {
            QuestionErrorKind::Network
        } else {
            QuestionErrorKind::Other
        };
        Self {
            kind,
            message,
            classified_from_message: kind != QuestionErrorKind::Other,
        }
    }
}

/// `codes` appearing as a standalone number, so "1500 tokens" is not a 500.
fn has_status_code(msg: &str, codes: &[&str]) -> bool {
    msg.split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| codes.contains(&token))
}

#[derive(Debug)]
pub struct ConfigError(pub String);

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConfigError: {}", self.0)
    }
}
impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_errors_are_distinct() {
        assert_eq!(
            BenchError::for_start("r1", RunStatus::Running),
            BenchError::AlreadyRunning("r1".into())
        );
        assert_eq!(
            BenchError::for_start("r1", RunStatus::Completed),
            BenchError::AlreadyCompleted("r1".into())
        );
        assert!(matches!(
            BenchError::for_start("r1", RunStatus::Failed),
            BenchError::InvalidTransition { .. }
        ));
    }

    #[test]
    fn stage_attribution_prefers_infra_signals() {
        let err = anyhow::anyhow!("search backend returned 503");
        assert_eq!(
            QuestionError::at_stage(Stage::Retrieval, &err).kind,
            QuestionErrorKind::ProviderServer
        );
        let err = anyhow::anyhow!("index missing");
        let qe = QuestionError::at_stage(Stage::Retrieval, &err);
        assert_eq!(qe.kind, QuestionErrorKind::Retrieval);
        assert!(!qe.classified_from_message);
    }

    #[test]
    fn classify_message_maps_infra_errors() {
        assert_eq!(
            QuestionError::classify_message("provider returned 429").kind,
            QuestionErrorKind::ProviderRateLimit
        );
        assert_eq!(
            QuestionError::classify_message("request timeout while calling provider").kind,
            QuestionErrorKind::ProviderTimeout
        );
        assert_eq!(
            QuestionError::classify_message("network dns resolution failed").kind,
            QuestionErrorKind::Network
        );
        assert!(QuestionError::classify_message("provider returned 429").classified_from_message);
    }

    #[test]
    fn status_codes_must_stand_alone() {
        assert_eq!(
            QuestionError::classify_message("HTTP 503 Service Unavailable").kind,
            QuestionErrorKind::ProviderServer
        );
        assert_eq!(
            QuestionError::classify_message("upstream status: 502").kind,
            QuestionErrorKind::ProviderServer
        );
        assert_eq!(
            QuestionError::classify_message("openai error (500): internal").kind,
            QuestionErrorKind::ProviderServer
        );

        let long_prompt = QuestionError::classify_message("prompt of 1500 tokens was rejected");
        assert_eq!(long_prompt.kind, QuestionErrorKind::Other);
        assert!(!long_prompt.classified_from_message);
        assert_eq!(
            QuestionError::classify_message("request id 4291 rejected").kind,
            QuestionErrorKind::Other
        );
    }
}
