//! Safety Gate - decides whether a sanitized statement may run
//!
//! The default gate only checks that the statement starts with `SELECT`.
//! That is a weak boundary: a SELECT can still call volatile functions,
//! carry a second statement, or read tables outside the prompt's scope.
//! [`GateMode::Strict`] adds a parser check for callers that want more, but
//! it is opt-in and the database role should stay read-only either way.

use crate::error::{AskDbError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use sqlparser::ast::Statement;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use tracing::warn;

lazy_static! {
    static ref SELECT_PREFIX: Regex = Regex::new(r"(?i)^\s*SELECT\s+").unwrap();
}

/// True iff `sql` starts (after leading whitespace) with `SELECT` and a space.
pub fn is_safe(sql: &str) -> bool {
    SELECT_PREFIX.is_match(sql)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GateMode {
    /// `SELECT` prefix check only.
    #[default]
    Prefix,
    /// Prefix check, then the statement must parse as exactly one query.
    Strict,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyGate {
    mode: GateMode,
}

impl SafetyGate {
    pub fn new(mode: GateMode) -> Self {
        Self { mode }
    }

    pub fn strict() -> Self {
        Self::new(GateMode::Strict)
    }

    /// Accept or reject a sanitized statement.
    pub fn check(&self, sql: &str) -> Result<()> {
        if !is_safe(sql) {
            warn!("Rejected non-SELECT statement: {}", sql);
            return Err(AskDbError::UnsafeQuery);
        }

        if self.mode == GateMode::Strict {
            check_single_query(sql)?;
        }

        Ok(())
    }
}

fn check_single_query(sql: &str) -> Result<()> {
    let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql).map_err(|e| {
        warn!("Strict gate could not parse statement: {}", e);
        AskDbError::UnsafeStatement(format!("Statement does not parse: {}", e))
    })?;

    match statements.as_slice() {
        [Statement::Query(_)] => Ok(()),
        [_] => Err(AskDbError::UnsafeStatement(
            "Statement is not a query.".to_string(),
        )),
        _ => Err(AskDbError::UnsafeStatement(format!(
            "Expected one statement, found {}.",
            statements.len()
        ))),
    }
}
