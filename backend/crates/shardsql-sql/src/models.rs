use shardsql_commons::StatementKind;
use shardsql_configs::defaults::default_skip_hints;
use shardsql_configs::{ResolverSettings, SqlDialectKind};

/// Outcome of resolving one statement.
///
/// `logical_query` targets the logical table and is what a double-write
/// executes; `shard_query` targets the physical shard table. For statements
/// that were not sharded both hold the input text byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub kind: StatementKind,
    /// Logical table, when the statement was sharded
    pub table: Option<String>,
    /// Shard suffix, when the statement was sharded
    pub suffix: Option<String>,
    pub logical_query: String,
    pub shard_query: String,
}

impl ResolvedQuery {
    pub fn passthrough(sql: &str, kind: StatementKind) -> Self {
        Self {
            kind,
            table: None,
            suffix: None,
            logical_query: sql.to_string(),
            shard_query: sql.to_string(),
        }
    }

    pub fn is_sharded(&self) -> bool {
        self.table.is_some()
    }

    /// `orders_1` for a query routed to suffix `_1` of `orders`.
    pub fn physical_table(&self) -> Option<String> {
        match (&self.table, &self.suffix) {
            (Some(table), Some(suffix)) => Some(format!("{}{}", table, suffix)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    pub dialect: SqlDialectKind,
    /// Comment texts that make a SELECT bypass sharding
    pub skip_hints: Vec<String>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            dialect: SqlDialectKind::default(),
            skip_hints: default_skip_hints(),
        }
    }
}

impl From<&ResolverSettings> for ResolverOptions {
    fn from(settings: &ResolverSettings) -> Self {
        Self {
            dialect: settings.dialect,
            skip_hints: settings.skip_hints.clone(),
        }
    }
}
