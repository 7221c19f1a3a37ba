pub mod config;
pub mod db;
pub mod error;
pub mod execution;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod safety;
pub mod sanitize;

pub use config::AppConfig;
pub use error::{AskDbError, Result};
pub use execution::QueryOutcome;
pub use pipeline::QueryPipeline;
