//! shardsql-configs
//!
//! Sharding configuration types and loader for ShardSQL.

pub mod config;

pub use config::*;
pub use config::defaults;
