//! PostgreSQL executor - one connection per statement

use crate::config::DatabaseConfig;
use crate::db::{row_to_map, with_connection, RowMap};
use crate::error::{AskDbError, Result};
use crate::execution::engine::SqlExecutor;
use crate::execution::result::QueryOutcome;
use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use std::time::Instant;
use tracing::{info, warn};

pub struct PgExecutor {
    options: PgConnectOptions,
}

impl PgExecutor {
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        Ok(Self {
            options: config.connect_options()?,
        })
    }

    /// Run `sql` and materialize every row.
    pub async fn fetch_rows(&self, sql: &str) -> Result<Vec<RowMap>> {
        let sql = sql.to_string();
        with_connection(&self.options, move |conn| {
            Box::pin(async move {
                let rows = sqlx::query(&sql)
                    .fetch_all(&mut *conn)
                    .await
                    .map_err(|e| AskDbError::Execution(database_message(&e)))?;
                let rows: Vec<RowMap> = rows.iter().map(row_to_map).collect();
                Ok::<_, AskDbError>(rows)
            })
        })
        .await
    }
}

#[async_trait]
impl SqlExecutor for PgExecutor {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn execute(&self, sql: &str) -> QueryOutcome {
        let start_time = Instant::now();
        match self.fetch_rows(sql).await {
            Ok(rows) => {
                info!(
                    "✅ Query returned {} rows in {}ms",
                    rows.len(),
                    start_time.elapsed().as_millis()
                );
                QueryOutcome::Rows(rows)
            }
            Err(e) => {
                warn!("Query failed: {}", e);
                QueryOutcome::error(e.to_string())
            }
        }
    }
}

/// The server's own message when there is one, otherwise sqlx's description.
fn database_message(error: &sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    }
}
