//! Query Outcome - what a request hands back to the caller

use crate::db::RowMap;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Rows on success, an error descriptor otherwise.
///
/// Serializes to a JSON array of row objects, or to `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    Rows(Vec<RowMap>),
    Error { error: String },
}

impl QueryOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        QueryOutcome::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryOutcome::Error { .. })
    }

    pub fn rows(&self) -> Option<&[RowMap]> {
        match self {
            QueryOutcome::Rows(rows) => Some(rows),
            QueryOutcome::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            QueryOutcome::Rows(_) => None,
            QueryOutcome::Error { error } => Some(error),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows().map_or(0, <[RowMap]>::len)
    }

    /// Two-space indented JSON; non-ASCII text is kept as is.
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rows_serialize_as_array_in_column_order() {
        let mut row = RowMap::new();
        row.insert("name".to_string(), json!("Zoë"));
        row.insert("id".to_string(), json!(7));
        let outcome = QueryOutcome::Rows(vec![row]);

        let text = outcome.to_pretty_json().unwrap();
        assert_eq!(text, "[\n  {\n    \"name\": \"Zoë\",\n    \"id\": 7\n  }\n]");
        assert_eq!(outcome.row_count(), 1);
        assert!(!outcome.is_error());
    }

    #[test]
    fn test_error_serializes_as_object() {
        let outcome = QueryOutcome::error("relation \"nope\" does not exist");

        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"error": "relation \"nope\" does not exist"})
        );
        assert_eq!(outcome.row_count(), 0);
        assert_eq!(outcome.error_message(), Some("relation \"nope\" does not exist"));
    }

    #[test]
    fn test_empty_result_is_empty_array() {
        let outcome = QueryOutcome::Rows(Vec::new());
        assert_eq!(outcome.to_pretty_json().unwrap(), "[]");
    }
}
