//! Migration planning: which physical tables a schema migration must create.
//!
//! Schema migration itself is out of scope; this only expands logical table
//! names into the shard tables (and, under double-write, the logical table)
//! that a migration tool has to materialize.

use shardsql_commons::{Result, ShardSqlError};

use crate::registry::ShardRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardedTablePlan {
    pub logical: String,
    /// Shard tables in shard-index order
    pub physical: Vec<String>,
    /// Logical table stays in use (double-write)
    pub keep_logical: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPlan {
    pub sharded: Vec<ShardedTablePlan>,
    /// Tables that are migrated as-is
    pub plain: Vec<String>,
}

impl MigrationPlan {
    /// Plan for every registered table, sorted by name.
    pub fn for_registry(registry: &ShardRegistry) -> Result<Self> {
        let names: Vec<&str> = registry.tables().iter().map(|t| t.table()).collect();
        Self::split_tables(registry, &names)
    }

    /// Split `tables` into sharded and plain tables.
    ///
    /// A double-written table appears in both lists: its shards are created and
    /// the logical table is kept.
    pub fn split_tables(registry: &ShardRegistry, tables: &[&str]) -> Result<Self> {
        let mut plan = MigrationPlan::default();

        for &table in tables {
            let Some(config) = registry.get(table) else {
                plan.plain.push(table.to_string());
                continue;
            };

            if config.suffixes().is_empty() {
                return Err(ShardSqlError::Configuration(format!(
                    "table '{}' has no enumerated suffixes; cannot plan shard tables",
                    table
                )));
            }

            if config.double_write() {
                plan.plain.push(table.to_string());
            }
            plan.sharded.push(ShardedTablePlan {
                logical: table.to_string(),
                physical: config.physical_tables(),
                keep_logical: config.double_write(),
            });
        }

        Ok(plan)
    }

    /// Every table a migration has to create, sharded tables first.
    pub fn tables_to_create(&self) -> Vec<String> {
        self.sharded
            .iter()
            .flat_map(|s| s.physical.iter().cloned())
            .chain(self.plain.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShardConfig;
    use shardsql_commons::test_helpers::RecordingExecutor;
    use std::sync::Arc;

    async fn registry() -> ShardRegistry {
        ShardRegistry::builder()
            .register(ShardConfig::new("user_id", 2), ["orders"])
            .register(ShardConfig::new("user_id", 2).double_write(true), ["payments"])
            .compile(Arc::new(RecordingExecutor::new("main")))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_split_tables() {
        let registry = registry().await;
        let plan = MigrationPlan::split_tables(&registry, &["orders", "users", "payments"]).unwrap();

        assert_eq!(plan.sharded.len(), 2);
        assert_eq!(plan.sharded[0].physical, vec!["orders_0", "orders_1"]);
        assert!(!plan.sharded[0].keep_logical);
        assert!(plan.sharded[1].keep_logical);
        assert_eq!(plan.plain, vec!["users", "payments"]);
    }

    #[tokio::test]
    async fn test_tables_to_create() {
        let registry = registry().await;
        let plan = MigrationPlan::for_registry(&registry).unwrap();
        assert_eq!(
            plan.tables_to_create(),
            vec!["orders_0", "orders_1", "payments_0", "payments_1", "payments"]
        );
    }

    #[tokio::test]
    async fn test_table_without_suffixes() {
        let registry = ShardRegistry::builder()
            .register(
                ShardConfig::new("region", 0)
                    .sharding_algorithm(|_| Ok("_eu".to_string()))
                    .custom_primary_key(|_| 0),
                ["orders"],
            )
            .compile(Arc::new(RecordingExecutor::new("main")))
            .await
            .unwrap();

        assert!(MigrationPlan::split_tables(&registry, &["orders"]).is_err());
    }
}
