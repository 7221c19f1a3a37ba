//! Execution seam - anything that can run an accepted statement

use crate::execution::result::QueryOutcome;
use async_trait::async_trait;

/// Runs a statement the safety gate has accepted.
///
/// Implementations never fail: errors become [`QueryOutcome::Error`] here,
/// so a bad statement cannot take the process down.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Executor name for logs.
    fn name(&self) -> &'static str;

    async fn execute(&self, sql: &str) -> QueryOutcome;
}
