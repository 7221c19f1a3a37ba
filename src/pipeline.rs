//! Query Pipeline - question in, rows or error out
//!
//! question → prompt → completion → sanitize → gate → execute
//!
//! Each stage is awaited in turn and nothing is kept between requests except
//! the schema text captured at construction.

use crate::db::SchemaDescription;
use crate::error::Result;
use crate::execution::{QueryOutcome, SqlExecutor};
use crate::llm::CompletionClient;
use crate::prompt::PromptBuilder;
use crate::safety::SafetyGate;
use crate::sanitize::clean_sql;
use tracing::{debug, info, warn};

pub struct QueryPipeline {
    prompt: PromptBuilder,
    completion: Box<dyn CompletionClient>,
    executor: Box<dyn SqlExecutor>,
    gate: SafetyGate,
}

impl QueryPipeline {
    pub fn new(
        schema: &SchemaDescription,
        completion: Box<dyn CompletionClient>,
        executor: Box<dyn SqlExecutor>,
    ) -> Self {
        Self {
            prompt: PromptBuilder::new(schema),
            completion,
            executor,
            gate: SafetyGate::default(),
        }
    }

    pub fn with_gate(mut self, gate: SafetyGate) -> Self {
        self.gate = gate;
        self
    }

    /// Ask the model for SQL and sanitize what comes back. Not gated.
    pub async fn generate_sql(&self, question: &str) -> Result<String> {
        let prompt = self.prompt.build(question);
        let raw = self.completion.complete(&prompt).await?;
        debug!("Raw completion from {}: {:?}", self.completion.name(), raw);

        let sql = clean_sql(raw.trim());
        info!("🔍 Generated SQL: {}", sql);
        Ok(sql)
    }

    /// Run one question end to end. Every failure comes back as an outcome.
    pub async fn run(&self, question: &str) -> QueryOutcome {
        let sql = match self.generate_sql(question).await {
            Ok(sql) => sql,
            Err(e) => {
                warn!("SQL generation failed: {}", e);
                return QueryOutcome::error(e.to_string());
            }
        };

        if let Err(e) = self.gate.check(&sql) {
            return QueryOutcome::error(e.to_string());
        }

        let outcome = self.executor.execute(&sql).await;
        if !outcome.is_error() {
            debug!("{} returned {} rows", self.executor.name(), outcome.row_count());
        }
        outcome
    }
}
