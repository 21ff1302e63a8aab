use std::sync::Arc;

use async_trait::async_trait;

use shardsql_commons::{Result, ShardSqlError, SqlExecutor};

use super::PrimaryKeyGenerator;
use crate::config::{PrimaryKeyKind, SequenceDialect};

/// Ids drawn from a per-table counter living in the datastore.
pub struct SequenceKeyGenerator {
    table: String,
    dialect: SequenceDialect,
    sequence: String,
    executor: Arc<dyn SqlExecutor>,
}

impl SequenceKeyGenerator {
    pub fn new(table: &str, dialect: SequenceDialect, executor: Arc<dyn SqlExecutor>) -> Self {
        Self {
            table: table.to_string(),
            dialect,
            sequence: Self::sequence_name(table),
            executor,
        }
    }

    /// `shardsql_<table>_id_seq`
    pub fn sequence_name(table: &str) -> String {
        format!("shardsql_{}_id_seq", table)
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// Statements that create the counter if it does not exist yet.
    pub fn bootstrap_statements(&self) -> Vec<String> {
        match self.dialect {
            SequenceDialect::Postgres => vec![format!(
                "CREATE SEQUENCE IF NOT EXISTS \"{}\" START 1",
                self.sequence
            )],
            SequenceDialect::MySql => vec![
                format!(
                    "CREATE TABLE IF NOT EXISTS `{}` (id BIGINT UNSIGNED NOT NULL)",
                    self.sequence
                ),
                // Seed exactly once; concurrent bootstraps must not add a second row
                format!(
                    "INSERT INTO `{seq}` (id) SELECT 0 FROM DUAL WHERE NOT EXISTS (SELECT 1 FROM `{seq}`)",
                    seq = self.sequence
                ),
            ],
        }
    }

    /// Create the counter. Idempotent.
    pub async fn bootstrap(&self) -> Result<()> {
        for sql in self.bootstrap_statements() {
            self.executor.execute(&sql, &[]).await.map_err(|e| {
                ShardSqlError::PrimaryKey(format!(
                    "failed to create id sequence for '{}': {}",
                    self.table, e
                ))
            })?;
        }
        log::debug!(
            "Bootstrapped {:?} id sequence '{}' for table '{}'",
            self.dialect,
            self.sequence,
            self.table
        );
        Ok(())
    }

    async fn next_postgres(&self) -> Result<i64> {
        let sql = format!("SELECT nextval('{}')", self.sequence);
        let row = self
            .executor
            .query_row(&sql, &[])
            .await
            .map_err(|e| self.generation_error(e))?;

        row.and_then(|r| r.first().and_then(|v| v.as_i64())).ok_or_else(|| {
            ShardSqlError::PrimaryKey(format!("nextval('{}') returned no integer", self.sequence))
        })
    }

    async fn next_mysql(&self) -> Result<i64> {
        let sql = format!("UPDATE `{}` SET id = LAST_INSERT_ID(id + 1)", self.sequence);
        let res = self
            .executor
            .execute(&sql, &[])
            .await
            .map_err(|e| self.generation_error(e))?;

        res.last_insert_id.ok_or_else(|| {
            ShardSqlError::PrimaryKey(format!(
                "counter table '{}' did not report LAST_INSERT_ID()",
                self.sequence
            ))
        })
    }

    fn generation_error(&self, e: ShardSqlError) -> ShardSqlError {
        ShardSqlError::PrimaryKey(format!(
            "failed to generate id for '{}' from '{}': {}",
            self.table, self.sequence, e
        ))
    }
}

#[async_trait]
impl PrimaryKeyGenerator for SequenceKeyGenerator {
    async fn generate(&self, _shard_index: u32) -> Result<i64> {
        match self.dialect {
            SequenceDialect::Postgres => self.next_postgres().await,
            SequenceDialect::MySql => self.next_mysql().await,
        }
    }

    fn kind(&self) -> PrimaryKeyKind {
        PrimaryKeyKind::Sequence(self.dialect)
    }
}
