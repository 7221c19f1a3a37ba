//! Schema Introspector - column listing from `information_schema`
//!
//! Produces the flat `table.column` text that grounds the prompt. It is
//! fetched once at startup and never refreshed, so it goes stale if the
//! catalog changes while the process runs.

use crate::config::DatabaseConfig;
use crate::db::connection::with_connection;
use crate::error::{AskDbError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

const COLUMNS_QUERY: &str = r#"
    SELECT c.table_name::text, c.column_name::text
    FROM information_schema.columns c
    WHERE c.table_schema = 'public'
      AND (cardinality($1::text[]) = 0 OR c.table_name::text = ANY($1::text[]))
    ORDER BY c.table_name, c.ordinal_position
"#;

/// One column of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Ordered `table.column` listing, grouped by table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescription {
    columns: Vec<ColumnRef>,
}

impl SchemaDescription {
    /// Build from `(table, column)` pairs, keeping their order.
    pub fn from_pairs<I, T, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, C)>,
        T: Into<String>,
        C: Into<String>,
    {
        Self {
            columns: pairs
                .into_iter()
                .map(|(table, column)| ColumnRef {
                    table: table.into(),
                    column: column.into(),
                })
                .collect(),
        }
    }

    pub fn columns(&self) -> &[ColumnRef] {
        &self.columns
    }

    /// Distinct table names in listing order.
    pub fn tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = Vec::new();
        for col in &self.columns {
            if !tables.contains(&col.table.as_str()) {
                tables.push(&col.table);
            }
        }
        tables
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// One `table.column` per line.
    pub fn render(&self) -> String {
        self.columns
            .iter()
            .map(ColumnRef::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for SchemaDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Reads column metadata for the `public` schema.
pub struct SchemaIntrospector<'a> {
    config: &'a DatabaseConfig,
}

impl<'a> SchemaIntrospector<'a> {
    pub fn new(config: &'a DatabaseConfig) -> Self {
        Self { config }
    }

    /// List `table.column` pairs, restricted to `tables` unless it is empty.
    pub async fn describe(&self, tables: &[String]) -> Result<SchemaDescription> {
        let options = self.config.connect_options()?;
        let filter = tables.to_vec();

        info!(
            "Introspecting schema on {} (tables: {})",
            self.config.display_target(),
            if filter.is_empty() { "all".to_string() } else { filter.join(", ") }
        );

        let pairs = with_connection(&options, move |conn| {
            Box::pin(async move {
                sqlx::query_as::<_, (String, String)>(COLUMNS_QUERY)
                    .bind(&filter)
                    .fetch_all(&mut *conn)
                    .await
                    .map_err(|e| AskDbError::Introspection(e.to_string()))
            })
        })
        .await?;

        let schema = SchemaDescription::from_pairs(pairs);
        info!(
            "Schema loaded: {} columns across {} tables",
            schema.len(),
            schema.tables().len()
        );
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_one_pair_per_line() {
        let schema = SchemaDescription::from_pairs(vec![("users", "id"), ("users", "name")]);

        assert_eq!(schema.render(), "users.id\nusers.name");
        assert_eq!(schema.to_string(), schema.render());
        assert_eq!(schema.len(), 2);
    }

    #[test]
    fn test_tables_are_distinct_and_ordered() {
        let schema = SchemaDescription::from_pairs(vec![
            ("conveyance", "id"),
            ("users", "id"),
            ("users", "lft"),
            ("visit", "user_id"),
        ]);

        assert_eq!(schema.tables(), vec!["conveyance", "users", "visit"]);
    }

    #[test]
    fn test_empty_schema_renders_empty_text() {
        let schema = SchemaDescription::default();
        assert!(schema.is_empty());
        assert_eq!(schema.render(), "");
    }
}
