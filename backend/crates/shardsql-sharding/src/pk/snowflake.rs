use std::sync::Arc;

use async_trait::async_trait;

use shardsql_commons::{Result, ShardSqlError, SnowflakeGenerator};

use super::PrimaryKeyGenerator;
use crate::config::PrimaryKeyKind;

/// One snowflake generator per node id `0..1024`, created once per registry.
///
/// The shard index doubles as the node id, so ids generated for shard `i`
/// carry `i` in their node bits and can be routed back without a lookup.
pub struct SnowflakeArena {
    nodes: Box<[SnowflakeGenerator]>,
}

impl SnowflakeArena {
    pub fn new() -> Result<Self> {
        let nodes = (0..SnowflakeGenerator::NODE_COUNT as u16)
            .map(SnowflakeGenerator::new)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            nodes: nodes.into_boxed_slice(),
        })
    }

    pub fn next_id(&self, node: u32) -> Result<i64> {
        self.nodes
            .get(node as usize)
            .ok_or_else(|| {
                ShardSqlError::PrimaryKey(format!(
                    "snowflake node {} out of range 0..{}",
                    node,
                    self.nodes.len()
                ))
            })?
            .next_id()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

pub struct SnowflakeKeyGenerator {
    arena: Arc<SnowflakeArena>,
}

impl SnowflakeKeyGenerator {
    pub fn new(arena: Arc<SnowflakeArena>) -> Self {
        Self { arena }
    }
}

#[async_trait]
impl PrimaryKeyGenerator for SnowflakeKeyGenerator {
    async fn generate(&self, shard_index: u32) -> Result<i64> {
        self.arena.next_id(shard_index)
    }

    fn kind(&self) -> PrimaryKeyKind {
        PrimaryKeyKind::Snowflake
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ids_carry_shard_index() {
        let arena = Arc::new(SnowflakeArena::new().unwrap());
        assert_eq!(arena.len(), 1024);

        let generator = SnowflakeKeyGenerator::new(arena);
        for shard in [0u32, 1, 3, 1023] {
            let id = generator.generate(shard).await.unwrap();
            assert!(id > 0);
            assert_eq!(SnowflakeGenerator::node_id_of(id) as u32, shard);
        }
    }

    #[tokio::test]
    async fn test_ids_are_increasing_per_shard() {
        let generator = SnowflakeKeyGenerator::new(Arc::new(SnowflakeArena::new().unwrap()));
        let a = generator.generate(2).await.unwrap();
        let b = generator.generate(2).await.unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_out_of_range_shard() {
        let generator = SnowflakeKeyGenerator::new(Arc::new(SnowflakeArena::new().unwrap()));
        let err = generator.generate(1024).await.unwrap_err();
        assert!(matches!(err, ShardSqlError::PrimaryKey(_)));
    }
}
