//! Run progress as reported by the engine after each persisted result.

use std::sync::Arc;

/// `percent` is `round(completed / total * 100)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub percent: u8,
    pub completed: usize,
    pub total: usize,
}

impl ProgressEvent {
    pub fn new(completed: usize, total: usize) -> Self {
        Self {
            percent: percent(completed, total),
            completed,
            total,
        }
    }
}

pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

/// Called in question order, once per question.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_to_nearest() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(0, 0), 0);
    }
}
