use thiserror::Error;

/// Message surfaced when the safety gate turns a statement away.
pub const UNSAFE_QUERY_MESSAGE: &str = "Unsafe query detected. Only SELECT queries are allowed.";

#[derive(Error, Debug)]
pub enum AskDbError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Schema introspection error: {0}")]
    Introspection(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Unsafe query detected. Only SELECT queries are allowed.")]
    UnsafeQuery,

    #[error("Unsafe query detected. Only SELECT queries are allowed. {0}")]
    UnsafeStatement(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AskDbError>;
