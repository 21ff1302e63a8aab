//! Intercepting connection pool.
//!
//! [`ShardingConnPool`] wraps the application's pool and implements the same
//! [`SqlExecutor`] trait, so it can be dropped in wherever the pool was used.
//! Every call is resolved first; the rewritten statement then runs on the
//! connection chosen for its table and kind.
//!
//! Double-write and the shard write are two separate statements. Outside a
//! transaction they are not atomic: the logical-table write may succeed while
//! the shard write fails, or the reverse. A failed double-write is logged and
//! does not stop the shard write.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use shardsql_commons::{ExecResult, QueryRows, Result, Row, SqlExecutor, Value};
use shardsql_sharding::ShardRegistry;
use shardsql_sql::{QueryResolver, ResolvedQuery, ResolverOptions};

use crate::observer::QueryObserver;
use crate::replicas::ReplicaSet;

#[derive(Clone)]
pub struct ShardingConnPool {
    inner: Arc<dyn SqlExecutor>,
    resolver: QueryResolver,
    replicas: Arc<HashMap<String, ReplicaSet>>,
    observers: Arc<Vec<Arc<dyn QueryObserver>>>,
    in_transaction: bool,
}

impl ShardingConnPool {
    pub fn builder(pool: Arc<dyn SqlExecutor>) -> ShardingConnPoolBuilder {
        ShardingConnPoolBuilder::new(pool)
    }

    pub fn registry(&self) -> &Arc<ShardRegistry> {
        self.resolver.registry()
    }

    pub fn resolver(&self) -> &QueryResolver {
        &self.resolver
    }

    /// The wrapped pool, bypassing sharding (migrations, admin statements).
    pub fn unsharded(&self) -> Arc<dyn SqlExecutor> {
        Arc::clone(&self.inner)
    }

    /// Resolve `sql`, notify observers, run the double-write if one is due and
    /// return the rewritten statement with the connection it must run on.
    async fn route(&self, sql: &str, args: &[Value]) -> Result<(ResolvedQuery, Arc<dyn SqlExecutor>)> {
        let resolved = self.resolver.resolve(sql, args).await.map_err(|e| {
            if e.is_resolution_error() {
                log::debug!("Rejected statement before execution: {}", e);
            }
            e
        })?;

        for observer in self.observers.iter() {
            observer.on_resolved(&resolved);
        }

        if self.needs_double_write(&resolved) {
            if let Err(e) = self.inner.execute(&resolved.logical_query, args).await {
                log::warn!(
                    "Double-write to '{}' failed, continuing with shard write: {}",
                    resolved.table.as_deref().unwrap_or_default(),
                    e
                );
            }
        }

        let conn = self.connection_for(&resolved);
        Ok((resolved, conn))
    }

    fn needs_double_write(&self, resolved: &ResolvedQuery) -> bool {
        if !resolved.kind.is_write() {
            return false;
        }
        resolved
            .table
            .as_deref()
            .and_then(|table| self.registry().get(table))
            .is_some_and(|config| config.double_write())
    }

    fn connection_for(&self, resolved: &ResolvedQuery) -> Arc<dyn SqlExecutor> {
        let picked = resolved
            .table
            .as_deref()
            .and_then(|table| self.replicas.get(table))
            .and_then(|set| set.pick(resolved.kind));

        match picked {
            Some(conn) => {
                log::trace!(
                    "Routing {} on '{}' to replica '{}'",
                    resolved.kind,
                    resolved.table.as_deref().unwrap_or_default(),
                    conn.name()
                );
                conn
            },
            None => Arc::clone(&self.inner),
        }
    }

    /// Router bound to a transaction handle: same registry and observers,
    /// every statement on `tx`.
    fn bound_to(&self, tx: Arc<dyn SqlExecutor>) -> Self {
        Self {
            inner: tx,
            resolver: self.resolver.clone(),
            replicas: Arc::new(HashMap::new()),
            observers: Arc::clone(&self.observers),
            in_transaction: true,
        }
    }
}

#[async_trait]
impl SqlExecutor for ShardingConnPool {
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecResult> {
        let (resolved, conn) = self.route(sql, args).await?;
        conn.execute(&resolved.shard_query, args).await
    }

    async fn query(&self, sql: &str, args: &[Value]) -> Result<QueryRows> {
        let (resolved, conn) = self.route(sql, args).await?;
        conn.query(&resolved.shard_query, args).await
    }

    async fn query_row(&self, sql: &str, args: &[Value]) -> Result<Option<Row>> {
        let (resolved, conn) = self.route(sql, args).await?;
        conn.query_row(&resolved.shard_query, args).await
    }

    async fn begin(&self) -> Result<Option<Arc<dyn SqlExecutor>>> {
        if self.in_transaction {
            log::debug!("begin inside a transaction joins the open transaction");
            return Ok(Some(Arc::new(self.clone())));
        }
        let router = match self.inner.begin().await? {
            Some(tx) => self.bound_to(tx),
            None => {
                log::debug!("'{}' has no transaction support, begin is a no-op", self.inner.name());
                self.clone()
            },
        };
        Ok(Some(Arc::new(router)))
    }

    async fn commit(&self) -> Result<()> {
        self.inner.commit().await
    }

    async fn rollback(&self) -> Result<()> {
        self.inner.rollback().await
    }

    fn name(&self) -> &str {
        "sharding-conn-pool"
    }
}

impl fmt::Debug for ShardingConnPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardingConnPool")
            .field("inner", &self.inner.name())
            .field("tables", &self.registry().len())
            .field("replicas", &self.replicas)
            .field("observers", &self.observers.len())
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}

pub struct ShardingConnPoolBuilder {
    pool: Arc<dyn SqlExecutor>,
    registry: Option<Arc<ShardRegistry>>,
    options: ResolverOptions,
    replicas: HashMap<String, ReplicaSet>,
    observers: Vec<Arc<dyn QueryObserver>>,
}

impl ShardingConnPoolBuilder {
    pub fn new(pool: Arc<dyn SqlExecutor>) -> Self {
        Self {
            pool,
            registry: None,
            options: ResolverOptions::default(),
            replicas: HashMap::new(),
            observers: Vec::new(),
        }
    }

    pub fn registry(mut self, registry: Arc<ShardRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn resolver_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Connections for shard statements of the logical `table`.
    pub fn replicas(mut self, table: &str, set: ReplicaSet) -> Self {
        self.replicas.insert(table.to_string(), set);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn QueryObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn build(self) -> ShardingConnPool {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(ShardRegistry::empty()));
        ShardingConnPool {
            inner: self.pool,
            resolver: QueryResolver::new(registry, self.options),
            replicas: Arc::new(self.replicas),
            observers: Arc::new(self.observers),
            in_transaction: false,
        }
    }
}
