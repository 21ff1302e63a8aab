//! Sharding policy as supplied by callers, before compilation.

use std::fmt;
use std::sync::Arc;

use shardsql_commons::{Result, Value};
use shardsql_configs::{PrimaryKeyGeneratorSetting, TableShardSettings};

/// `value -> suffix`, e.g. `101 -> "_1"`
pub type ShardingAlgorithm = Arc<dyn Fn(&Value) -> Result<String> + Send + Sync>;

/// Enumerates every suffix of a table, in shard-index order
pub type SuffixEnumerator = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

/// `primary key -> suffix`, used when a statement filters on `id` only
pub type PrimaryKeyShardingAlgorithm = Arc<dyn Fn(i64) -> String + Send + Sync>;

/// `shard index -> id`; returning `0` means "do not fill an id"
pub type CustomKeyFn = Arc<dyn Fn(u32) -> i64 + Send + Sync>;

/// Flavor of datastore counter backing [`PrimaryKeyKind::Sequence`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceDialect {
    /// `CREATE SEQUENCE` + `nextval()`
    Postgres,
    /// Single-row counter table + `LAST_INSERT_ID()`
    MySql,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimaryKeyKind {
    Snowflake,
    Sequence(SequenceDialect),
    Custom,
}

impl From<PrimaryKeyGeneratorSetting> for PrimaryKeyKind {
    fn from(setting: PrimaryKeyGeneratorSetting) -> Self {
        match setting {
            PrimaryKeyGeneratorSetting::Snowflake => PrimaryKeyKind::Snowflake,
            PrimaryKeyGeneratorSetting::PgSequence => {
                PrimaryKeyKind::Sequence(SequenceDialect::Postgres)
            },
            PrimaryKeyGeneratorSetting::MysqlSequence => {
                PrimaryKeyKind::Sequence(SequenceDialect::MySql)
            },
            PrimaryKeyGeneratorSetting::Custom => PrimaryKeyKind::Custom,
        }
    }
}

/// Resolves an application entity to its logical table name.
pub trait EntityTableMapper: Send + Sync {
    fn table_name(&self) -> Result<String>;
}

/// A table to register: either a literal name or an entity resolved through a mapper.
#[derive(Clone)]
pub enum TableRef {
    Name(String),
    Entity(Arc<dyn EntityTableMapper>),
}

impl TableRef {
    pub fn entity<M: EntityTableMapper + 'static>(mapper: M) -> Self {
        TableRef::Entity(Arc::new(mapper))
    }

    pub fn resolve(&self) -> Result<String> {
        match self {
            TableRef::Name(name) => Ok(name.clone()),
            TableRef::Entity(mapper) => mapper.table_name(),
        }
    }
}

impl fmt::Debug for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableRef::Name(name) => f.debug_tuple("Name").field(name).finish(),
            TableRef::Entity(_) => f.write_str("Entity(..)"),
        }
    }
}

impl From<&str> for TableRef {
    fn from(name: &str) -> Self {
        TableRef::Name(name.to_string())
    }
}

impl From<String> for TableRef {
    fn from(name: String) -> Self {
        TableRef::Name(name)
    }
}

/// Sharding policy for one or more logical tables.
///
/// ```rust
/// use shardsql_sharding::{PrimaryKeyKind, ShardConfig};
///
/// let config = ShardConfig::new("user_id", 4)
///     .double_write(true)
///     .primary_key(PrimaryKeyKind::Snowflake);
/// assert_eq!(config.number_of_shards(), 4);
/// ```
#[derive(Clone)]
pub struct ShardConfig {
    pub(crate) sharding_key: String,
    pub(crate) number_of_shards: u32,
    pub(crate) double_write: bool,
    pub(crate) suffix_prefix: String,
    pub(crate) sharding_algorithm: Option<ShardingAlgorithm>,
    pub(crate) sharding_suffixes: Option<SuffixEnumerator>,
    pub(crate) sharding_algorithm_by_primary_key: Option<PrimaryKeyShardingAlgorithm>,
    pub(crate) primary_key_kind: PrimaryKeyKind,
    pub(crate) primary_key_fn: Option<CustomKeyFn>,
}

impl ShardConfig {
    pub fn new(sharding_key: &str, number_of_shards: u32) -> Self {
        Self {
            sharding_key: sharding_key.to_string(),
            number_of_shards,
            double_write: false,
            suffix_prefix: "_".to_string(),
            sharding_algorithm: None,
            sharding_suffixes: None,
            sharding_algorithm_by_primary_key: None,
            primary_key_kind: PrimaryKeyKind::Snowflake,
            primary_key_fn: None,
        }
    }

    /// Build a config from a `[[tables]]` entry. `custom` entries still need
    /// [`ShardConfig::custom_primary_key`] before compiling.
    pub fn from_settings(settings: &TableShardSettings) -> Self {
        Self::new(&settings.sharding_key, settings.number_of_shards)
            .double_write(settings.double_write)
            .suffix_prefix(&settings.suffix_prefix)
            .primary_key(settings.primary_key_generator.into())
    }

    pub fn double_write(mut self, enabled: bool) -> Self {
        self.double_write = enabled;
        self
    }

    pub fn suffix_prefix(mut self, prefix: &str) -> Self {
        self.suffix_prefix = prefix.to_string();
        self
    }

    pub fn sharding_algorithm<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<String> + Send + Sync + 'static,
    {
        self.sharding_algorithm = Some(Arc::new(f));
        self
    }

    pub fn sharding_suffixes<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        self.sharding_suffixes = Some(Arc::new(f));
        self
    }

    pub fn sharding_algorithm_by_primary_key<F>(mut self, f: F) -> Self
    where
        F: Fn(i64) -> String + Send + Sync + 'static,
    {
        self.sharding_algorithm_by_primary_key = Some(Arc::new(f));
        self
    }

    pub fn primary_key(mut self, kind: PrimaryKeyKind) -> Self {
        self.primary_key_kind = kind;
        self
    }

    /// Use a caller-supplied generator (sets the kind to [`PrimaryKeyKind::Custom`]).
    pub fn custom_primary_key<F>(mut self, f: F) -> Self
    where
        F: Fn(u32) -> i64 + Send + Sync + 'static,
    {
        self.primary_key_kind = PrimaryKeyKind::Custom;
        self.primary_key_fn = Some(Arc::new(f));
        self
    }

    pub fn sharding_key(&self) -> &str {
        &self.sharding_key
    }

    pub fn number_of_shards(&self) -> u32 {
        self.number_of_shards
    }

    pub fn primary_key_kind(&self) -> PrimaryKeyKind {
        self.primary_key_kind
    }
}

impl fmt::Debug for ShardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardConfig")
            .field("sharding_key", &self.sharding_key)
            .field("number_of_shards", &self.number_of_shards)
            .field("double_write", &self.double_write)
            .field("suffix_prefix", &self.suffix_prefix)
            .field("custom_algorithm", &self.sharding_algorithm.is_some())
            .field("custom_suffixes", &self.sharding_suffixes.is_some())
            .field("custom_primary_key_algorithm", &self.sharding_algorithm_by_primary_key.is_some())
            .field("primary_key_kind", &self.primary_key_kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OrderEntity;

    impl EntityTableMapper for OrderEntity {
        fn table_name(&self) -> Result<String> {
            Ok("orders".to_string())
        }
    }

    #[test]
    fn test_from_settings() {
        let mut settings = TableShardSettings::new(&["orders"], "user_id", 8);
        settings.double_write = true;
        settings.primary_key_generator = PrimaryKeyGeneratorSetting::MysqlSequence;

        let config = ShardConfig::from_settings(&settings);
        assert_eq!(config.sharding_key(), "user_id");
        assert_eq!(config.number_of_shards(), 8);
        assert!(config.double_write);
        assert_eq!(
            config.primary_key_kind(),
            PrimaryKeyKind::Sequence(SequenceDialect::MySql)
        );
    }

    #[test]
    fn test_custom_primary_key_sets_kind() {
        let config = ShardConfig::new("user_id", 4).custom_primary_key(|_| 0);
        assert_eq!(config.primary_key_kind(), PrimaryKeyKind::Custom);
        assert!(config.primary_key_fn.is_some());
    }

    #[test]
    fn test_table_ref_resolution() {
        assert_eq!(TableRef::from("orders").resolve().unwrap(), "orders");
        assert_eq!(TableRef::entity(OrderEntity).resolve().unwrap(), "orders");
    }
}
