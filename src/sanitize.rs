//! SQL Sanitizer - turns a raw completion into one candidate statement
//!
//! Models like to wrap SQL in Markdown fences or quote markers and to keep
//! talking after the statement. This strips the markers and cuts everything
//! after the first `;`. Prose *before* the statement is left alone and shows
//! up later as an execution error.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LEADING_FENCE: Regex = Regex::new(r"(?i)^```[a-z]*").unwrap();
}

const MARKERS: [&str; 3] = ["```", "'''", "\"\"\""];

/// Clean raw model output down to a single statement.
///
/// 1. drop a leading fence (with optional language tag)
/// 2. drop every remaining fence and triple-quote marker
/// 3. trim
/// 4. keep only what precedes the first `;`, re-terminated
pub fn clean_sql(raw: &str) -> String {
    let mut sql = LEADING_FENCE.replace(raw, "").into_owned();
    for marker in MARKERS {
        sql = sql.replace(marker, "");
    }

    let sql = sql.trim();
    match sql.find(';') {
        Some(idx) => format!("{};", sql[..idx].trim()),
        None => sql.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_block_with_trailing_prose() {
        let raw = "```sql\nSELECT * FROM users;\nExtra prose ```";
        assert_eq!(clean_sql(raw), "SELECT * FROM users;");
    }

    #[test]
    fn test_fence_without_language_tag() {
        let raw = "```\nSELECT id FROM visit;\n```";
        assert_eq!(clean_sql(raw), "SELECT id FROM visit;");
    }

    #[test]
    fn test_fence_tag_is_case_insensitive() {
        let raw = "```SQL\nselect 1;```";
        assert_eq!(clean_sql(raw), "select 1;");
    }

    #[test]
    fn test_truncates_at_first_semicolon() {
        let raw = "SELECT 1; DROP TABLE users; SELECT 2;";
        let cleaned = clean_sql(raw);

        assert_eq!(cleaned, "SELECT 1;");
        assert_eq!(cleaned.matches(';').count(), 1);
    }

    #[test]
    fn test_no_semicolon_returns_trimmed_text() {
        assert_eq!(clean_sql("   SELECT name FROM users  \n"), "SELECT name FROM users");
    }

    #[test]
    fn test_triple_quotes_removed() {
        assert_eq!(
            clean_sql("\"\"\"SELECT id FROM users;\"\"\""),
            "SELECT id FROM users;"
        );
        assert_eq!(clean_sql("'''SELECT id FROM users'''"), "SELECT id FROM users");
    }

    #[test]
    fn test_leading_prose_is_kept() {
        let raw = "Here is the query: SELECT * FROM users; Hope it helps";
        assert_eq!(clean_sql(raw), "Here is the query: SELECT * FROM users;");
    }

    #[test]
    fn test_indented_fence_only_loses_markers() {
        // the language tag survives when the fence is not at the very start
        let raw = "  ```sql\nSELECT 1;```";
        assert_eq!(clean_sql(raw), "sql\nSELECT 1;");
    }
}
