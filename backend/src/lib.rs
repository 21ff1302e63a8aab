//! ShardSQL: table sharding middleware.
//!
//! Re-exports the workspace crates under one name and hosts the logging
//! bootstrap and the migration-planning helpers used by `shardsql-plan`.

pub mod logging;
pub mod plan;

pub use shardsql_commons::{
    ExecResult, QueryRows, Result, Row, ShardSqlError, SqlExecutor, StatementKind, Value,
};
pub use shardsql_configs::ShardingSettings;
pub use shardsql_router::{LastQuery, QueryObserver, ReplicaSet, ShardingBuilder, ShardingConnPool};
pub use shardsql_sharding::{
    EntityTableMapper, MigrationPlan, PrimaryKeyKind, SequenceDialect, ShardConfig, ShardRegistry,
    TableRef,
};
pub use shardsql_sql::{QueryResolver, ResolvedQuery, ResolverOptions};
