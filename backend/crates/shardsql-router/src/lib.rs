//! Connection router for ShardSQL.
//!
//! Wraps a datastore pool so that statements written against logical tables
//! run against their shard tables, with optional double-write to the logical
//! table and per-table read/write replicas.

pub mod builder;
pub mod conn_pool;
pub mod observer;
pub mod replicas;

pub use builder::ShardingBuilder;
pub use conn_pool::{ShardingConnPool, ShardingConnPoolBuilder};
pub use observer::{LastQuery, QueryObserver};
pub use replicas::ReplicaSet;
