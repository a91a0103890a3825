use std::time::Duration;

/// Returned by a bounded blocking pop when nothing was pushed before the
/// timeout ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no item became available within {timeout:?}")]
pub struct PopTimeoutError {
    pub timeout: Duration,
}
