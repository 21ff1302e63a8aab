//! In-memory executor used by tests across the workspace.
//!
//! `RecordingExecutor` records every statement it receives and emulates the
//! two counter idioms used by sequence-based key generation:
//! `SELECT nextval('...')` (PostgreSQL) and
//! `UPDATE ... SET id = LAST_INSERT_ID(id + 1)` (MySQL).

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::{Result, ShardSqlError};
use crate::executor::{ExecResult, QueryRows, Row, SqlExecutor};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Execute,
    Query,
    Begin,
    Commit,
    Rollback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Name of the executor that received the call
    pub executor: String,
    pub kind: CallKind,
    pub sql: String,
    pub args: Vec<Value>,
}

#[derive(Default)]
struct SharedState {
    calls: Mutex<Vec<RecordedCall>>,
    fail_on: Mutex<Vec<String>>,
    rows: Mutex<Option<QueryRows>>,
    counter: AtomicI64,
}

#[derive(Clone)]
pub struct RecordingExecutor {
    name: String,
    transactional: bool,
    state: Arc<SharedState>,
}

impl RecordingExecutor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            transactional: false,
            state: Arc::new(SharedState::default()),
        }
    }

    /// Executor whose `begin()` hands out a transaction handle.
    pub fn transactional(name: &str) -> Self {
        Self {
            transactional: true,
            ..Self::new(name)
        }
    }

    /// A second executor sharing this one's call log and counters.
    pub fn fork(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            transactional: self.transactional,
            state: Arc::clone(&self.state),
        }
    }

    /// Fail every statement containing `fragment`.
    pub fn fail_on(&self, fragment: &str) {
        self.state.fail_on.lock().push(fragment.to_string());
    }

    pub fn set_counter(&self, value: i64) {
        self.state.counter.store(value, Ordering::SeqCst);
    }

    pub fn set_rows(&self, rows: QueryRows) {
        *self.state.rows.lock() = Some(rows);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.calls.lock().clone()
    }

    /// SQL text of every recorded call, in order.
    pub fn statements(&self) -> Vec<String> {
        self.state.calls.lock().iter().map(|c| c.sql.clone()).collect()
    }

    /// SQL text of calls received by the executor named `name`.
    pub fn statements_for(&self, name: &str) -> Vec<String> {
        self.state
            .calls
            .lock()
            .iter()
            .filter(|c| c.executor == name)
            .map(|c| c.sql.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.state.calls.lock().clear();
    }

    fn record(&self, kind: CallKind, sql: &str, args: &[Value]) -> Result<()> {
        self.state.calls.lock().push(RecordedCall {
            executor: self.name.clone(),
            kind,
            sql: sql.to_string(),
            args: args.to_vec(),
        });

        let failing = self.state.fail_on.lock().iter().any(|f| sql.contains(f.as_str()));
        if failing {
            return Err(ShardSqlError::Datastore(format!(
                "{}: injected failure for '{}'",
                self.name, sql
            )));
        }
        Ok(())
    }

    fn next_counter(&self) -> i64 {
        self.state.counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl SqlExecutor for RecordingExecutor {
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        self.record(CallKind::Execute, sql, args)?;
        if sql.contains("LAST_INSERT_ID(") {
            return Ok(ExecResult {
                rows_affected: 1,
                last_insert_id: Some(self.next_counter()),
            });
        }
        Ok(ExecResult {
            rows_affected: 1,
            last_insert_id: None,
        })
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<QueryRows> {
        self.record(CallKind::Query, sql, args)?;
        if sql.contains("nextval(") {
            return Ok(QueryRows::single("nextval", Value::Int(self.next_counter())));
        }
        Ok(self.state.rows.lock().clone().unwrap_or_default())
    }

    async fn query_row(&self, sql: &str, args: &[Value]) -> Result<Option<Row>> {
        let rows = self.query(sql, args).await?;
        Ok(rows.rows.into_iter().next())
    }

    async fn begin(&self) -> Result<Option<Arc<dyn SqlExecutor>>> {
        if !self.transactional {
            return Ok(None);
        }
        self.record(CallKind::Begin, "BEGIN", &[])?;
        let tx = self.fork(&format!("{}:tx", self.name));
        Ok(Some(Arc::new(tx)))
    }

    async fn commit(&self) -> Result<()> {
        self.record(CallKind::Commit, "COMMIT", &[])
    }

    async fn rollback(&self) -> Result<()> {
        self.record(CallKind::Rollback, "ROLLBACK", &[])
    }

    fn name(&self) -> &str {
        &self.name
    }
}
