//! One-stop setup: register tables, then initialize against a pool.

use std::collections::HashMap;
use std::sync::Arc;

use shardsql_commons::{Result, SqlExecutor};
use shardsql_configs::ShardingSettings;
use shardsql_sharding::{ShardConfig, ShardRegistry, ShardRegistryBuilder, TableRef};
use shardsql_sql::ResolverOptions;

use crate::conn_pool::ShardingConnPool;
use crate::observer::QueryObserver;
use crate::replicas::ReplicaSet;

/// ```rust,no_run
/// # use std::sync::Arc;
/// # use shardsql_commons::SqlExecutor;
/// # async fn setup(pool: Arc<dyn SqlExecutor>) -> shardsql_commons::Result<()> {
/// use shardsql_router::ShardingBuilder;
/// use shardsql_sharding::ShardConfig;
///
/// let router = ShardingBuilder::new()
///     .register(ShardConfig::new("user_id", 4), ["orders", "order_items"])
///     .initialize(pool)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ShardingBuilder {
    registry: ShardRegistryBuilder,
    options: ResolverOptions,
    replicas: HashMap<String, ReplicaSet>,
    observers: Vec<Arc<dyn QueryObserver>>,
}

impl ShardingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pre-loaded with every `[[tables]]` entry and the `[resolver]` section.
    pub fn from_settings(settings: &ShardingSettings) -> Self {
        let mut builder = Self::new().resolver_options(ResolverOptions::from(&settings.resolver));
        for table in &settings.tables {
            builder = builder.register(ShardConfig::from_settings(table), table.names.iter().cloned());
        }
        builder
    }

    pub fn register<I, T>(mut self, config: ShardConfig, tables: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TableRef>,
    {
        self.registry = self.registry.register(config, tables);
        self
    }

    pub fn resolver_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn replicas(mut self, table: &str, set: ReplicaSet) -> Self {
        self.replicas.insert(table.to_string(), set);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn QueryObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Compile the registry (bootstrapping sequences through `pool`) and wrap `pool`.
    pub async fn initialize(self, pool: Arc<dyn SqlExecutor>) -> Result<ShardingConnPool> {
        let registry: ShardRegistry = self.registry.compile(Arc::clone(&pool)).await?;

        let mut builder = ShardingConnPool::builder(pool)
            .registry(Arc::new(registry))
            .resolver_options(self.options);
        for (table, set) in self.replicas {
            builder = builder.replicas(&table, set);
        }
        for observer in self.observers {
            builder = builder.observer(observer);
        }
        Ok(builder.build())
    }
}
