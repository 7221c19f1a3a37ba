//! Execution module - statement executors and their results

pub mod engine;
pub mod postgres;
pub mod result;

pub use engine::SqlExecutor;
pub use postgres::PgExecutor;
pub use result::QueryOutcome;
