//! Shard registry for ShardSQL.
//!
//! Callers describe how logical tables are split with [`ShardConfig`] and
//! compile them into a [`ShardRegistry`]. The registry answers the questions
//! the SQL resolver asks at query time: which suffix a sharding-key value or
//! primary key maps to, which shard index a suffix is, and what id a new row
//! on that shard should get.

pub mod algorithm;
pub mod config;
pub mod migration;
pub mod pk;
pub mod registry;

pub use algorithm::{default_sharding_algorithm, shard_index_of, SuffixFormat};
pub use config::{
    CustomKeyFn, EntityTableMapper, PrimaryKeyKind, PrimaryKeyShardingAlgorithm, SequenceDialect,
    ShardConfig, ShardingAlgorithm, SuffixEnumerator, TableRef,
};
pub use migration::{MigrationPlan, ShardedTablePlan};
pub use pk::PrimaryKeyGenerator;
pub use registry::{ShardRegistry, ShardRegistryBuilder, TableShardConfig};
