//! Migration planning from a settings file, without touching a datastore.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use shardsql_commons::{ExecResult, QueryRows, Result, SqlExecutor, Value};
use shardsql_configs::ShardingSettings;
use shardsql_sharding::{MigrationPlan, PrimaryKeyKind, ShardConfig, ShardRegistry};

/// Executor that records statements instead of running them.
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    statements: Mutex<Vec<String>>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }
}

#[async_trait]
impl SqlExecutor for DryRunExecutor {
    async fn execute(&self, sql: &str, _args: &[Value]) -> Result<ExecResult> {
        log::info!("[dry-run] {}", sql);
        self.statements.lock().push(sql.to_string());
        Ok(ExecResult::default())
    }

    async fn query(&self, sql: &str, _args: &[Value]) -> Result<QueryRows> {
        log::info!("[dry-run] {}", sql);
        self.statements.lock().push(sql.to_string());
        Ok(QueryRows::default())
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

/// Output of [`plan_from_settings`].
#[derive(Debug, Clone)]
pub struct PlanReport {
    pub plan: MigrationPlan,
    /// Sequence bootstrap statements the datastore would receive
    pub bootstrap: Vec<String>,
}

impl PlanReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        for sharded in &self.plan.sharded {
            let _ = writeln!(
                out,
                "{} -> {} shard table(s){}",
                sharded.logical,
                sharded.physical.len(),
                if sharded.keep_logical { " + logical (double-write)" } else { "" }
            );
            for table in &sharded.physical {
                let _ = writeln!(out, "  {}", table);
            }
        }
        for table in &self.plan.plain {
            if !self.plan.sharded.iter().any(|s| &s.logical == table) {
                let _ = writeln!(out, "{} (not sharded)", table);
            }
        }
        if !self.bootstrap.is_empty() {
            let _ = writeln!(out, "bootstrap:");
            for sql in &self.bootstrap {
                let _ = writeln!(out, "  {};", sql);
            }
        }
        out
    }
}

/// Compile `settings` against a dry-run executor and plan `tables`
/// (every configured table when empty).
///
/// `custom` primary keys get a placeholder generator: planning never
/// generates ids.
pub async fn plan_from_settings(
    settings: &ShardingSettings,
    tables: &[String],
) -> anyhow::Result<PlanReport> {
    let executor = Arc::new(DryRunExecutor::new());

    let mut builder = ShardRegistry::builder();
    for table in &settings.tables {
        let mut config = ShardConfig::from_settings(table);
        if config.primary_key_kind() == PrimaryKeyKind::Custom {
            config = config.custom_primary_key(|_| 0);
        }
        builder = builder.register(config, table.names.iter().cloned());
    }
    let registry = builder
        .compile(executor.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to compile sharding config: {}", e))?;

    let plan = if tables.is_empty() {
        MigrationPlan::for_registry(&registry)?
    } else {
        let names: Vec<&str> = tables.iter().map(String::as_str).collect();
        MigrationPlan::split_tables(&registry, &names)?
    };

    Ok(PlanReport {
        plan,
        bootstrap: executor.statements(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardsql_configs::{PrimaryKeyGeneratorSetting, TableShardSettings};

    #[tokio::test]
    async fn test_plan_custom_and_sequence_tables() {
        let mut settings = ShardingSettings::default();
        let mut orders = TableShardSettings::new(&["orders"], "user_id", 2);
        orders.primary_key_generator = PrimaryKeyGeneratorSetting::PgSequence;
        let mut events = TableShardSettings::new(&["events"], "tenant_id", 3);
        events.primary_key_generator = PrimaryKeyGeneratorSetting::Custom;
        settings.tables = vec![orders, events];

        let report = plan_from_settings(&settings, &[]).await.unwrap();
        assert_eq!(report.plan.sharded.len(), 2);
        assert_eq!(report.bootstrap.len(), 1);

        let rendered = report.render();
        assert!(rendered.contains("events -> 3 shard table(s)"));
        assert!(rendered.contains("  orders_1"));
        assert!(rendered.contains("CREATE SEQUENCE IF NOT EXISTS \"shardsql_orders_id_seq\""));
    }

    #[tokio::test]
    async fn test_plan_selected_tables() {
        let mut settings = ShardingSettings::default();
        let mut orders = TableShardSettings::new(&["orders"], "user_id", 2);
        orders.double_write = true;
        settings.tables = vec![orders];

        let tables = vec!["orders".to_string(), "users".to_string()];
        let report = plan_from_settings(&settings, &tables).await.unwrap();
        let rendered = report.render();
        assert!(rendered.contains("orders -> 2 shard table(s) + logical (double-write)"));
        assert!(rendered.contains("users (not sharded)"));
        assert!(!rendered.contains("orders (not sharded)"));
    }
}
