//! Datastore executor boundary.
//!
//! ShardSQL never talks to a database driver directly. Everything that reaches
//! the datastore (shard queries, double-writes, sequence bootstrap and
//! `nextval` calls) goes through a [`SqlExecutor`]. The sharding router itself
//! implements this trait so it can stand in for the pool it wraps.
//!
//! Cancellation: every method is a plain future. Dropping it, or wrapping it in
//! `tokio::time::timeout`, is how callers cancel or bound a call; nothing in
//! between adds timeouts of its own.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::Result;
use crate::value::Value;

/// A result row, positional.
pub type Row = Vec<Value>;

/// Outcome of a statement that does not return rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Id reported by the datastore (e.g. MySQL `LAST_INSERT_ID()`), if any
    pub last_insert_id: Option<i64>,
}

/// Rows returned by a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl QueryRows {
    pub fn single(column: &str, value: Value) -> Self {
        Self {
            columns: vec![column.to_string()],
            rows: vec![vec![value]],
        }
    }
}

/// Executes SQL text with positional arguments.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Run a statement that does not return rows.
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult>;

    /// Run a statement and collect its rows.
    async fn query(&self, sql: &str, args: &[Value]) -> Result<QueryRows>;

    /// Run a statement and return its first row.
    async fn query_row(&self, sql: &str, args: &[Value]) -> Result<Option<Row>> {
        let rows = self.query(sql, args).await?;
        Ok(rows.rows.into_iter().next())
    }

    /// Start a transaction. `None` means the executor has no transaction support.
    async fn begin(&self) -> Result<Option<Arc<dyn SqlExecutor>>> {
        Ok(None)
    }

    async fn commit(&self) -> Result<()> {
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        Ok(())
    }

    /// Human readable name used in log lines.
    fn name(&self) -> &str {
        "sql-executor"
    }
}
