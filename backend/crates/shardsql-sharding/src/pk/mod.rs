//! Primary-key generators.
//!
//! Each sharded table owns one generator, chosen by its [`PrimaryKeyKind`].
//! Generators are asked for a new id per inserted row, given the shard index
//! the row is routed to.

mod custom;
mod sequence;
mod snowflake;

use async_trait::async_trait;

use shardsql_commons::Result;

use crate::config::PrimaryKeyKind;

pub use custom::CustomKeyGenerator;
pub use sequence::SequenceKeyGenerator;
pub use snowflake::{SnowflakeArena, SnowflakeKeyGenerator};

#[async_trait]
pub trait PrimaryKeyGenerator: Send + Sync {
    /// New id for a row landing on `shard_index`.
    ///
    /// A return value of `0` means the caller should leave the id to the
    /// datastore.
    async fn generate(&self, shard_index: u32) -> Result<i64>;

    fn kind(&self) -> PrimaryKeyKind;
}
