use async_trait::async_trait;

use shardsql_commons::Result;

use super::PrimaryKeyGenerator;
use crate::config::{CustomKeyFn, PrimaryKeyKind};

/// Wraps a caller-supplied `shard index -> id` function.
pub struct CustomKeyGenerator {
    f: CustomKeyFn,
}

impl CustomKeyGenerator {
    pub fn new(f: CustomKeyFn) -> Self {
        Self { f }
    }
}

#[async_trait]
impl PrimaryKeyGenerator for CustomKeyGenerator {
    async fn generate(&self, shard_index: u32) -> Result<i64> {
        Ok((self.f)(shard_index))
    }

    fn kind(&self) -> PrimaryKeyKind {
        PrimaryKeyKind::Custom
    }
}
