//! Compiled, immutable registry of sharded tables.
//!
//! [`ShardRegistryBuilder::compile`] turns caller-supplied [`ShardConfig`]s into
//! one [`TableShardConfig`] per logical table: defaults filled in, suffixes
//! enumerated once, and a primary-key generator attached. Once built, the
//! registry is only read and is shared behind an `Arc`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use shardsql_commons::{Result, ShardSqlError, SnowflakeGenerator, SqlExecutor, Value};
use shardsql_configs::defaults::MAX_SNOWFLAKE_SHARDS;
use shardsql_configs::ShardingSettings;

use crate::algorithm::{default_sharding_algorithm, shard_index_of, SuffixFormat};
use crate::config::{
    PrimaryKeyKind, PrimaryKeyShardingAlgorithm, ShardConfig, ShardingAlgorithm, TableRef,
};
use crate::pk::{
    CustomKeyGenerator, PrimaryKeyGenerator, SequenceKeyGenerator, SnowflakeArena,
    SnowflakeKeyGenerator,
};

/// Fully resolved sharding policy of one logical table.
pub struct TableShardConfig {
    table: String,
    sharding_key: String,
    number_of_shards: u32,
    double_write: bool,
    algorithm: ShardingAlgorithm,
    algorithm_by_primary_key: Option<PrimaryKeyShardingAlgorithm>,
    suffixes: Vec<String>,
    key_generator: Arc<dyn PrimaryKeyGenerator>,
}

impl TableShardConfig {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn sharding_key(&self) -> &str {
        &self.sharding_key
    }

    pub fn number_of_shards(&self) -> u32 {
        self.number_of_shards
    }

    pub fn double_write(&self) -> bool {
        self.double_write
    }

    /// Every suffix of this table, in shard-index order.
    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    pub fn primary_key_kind(&self) -> PrimaryKeyKind {
        self.key_generator.kind()
    }

    pub fn has_primary_key_algorithm(&self) -> bool {
        self.algorithm_by_primary_key.is_some()
    }

    /// Suffix for a sharding-key value.
    pub fn suffix_for_value(&self, value: &Value) -> Result<String> {
        self.enumerated((self.algorithm)(value)?)
    }

    /// Suffix for a primary key, when the table can route by id.
    pub fn suffix_for_primary_key(&self, id: i64) -> Result<String> {
        match &self.algorithm_by_primary_key {
            Some(f) => self.enumerated(f(id)),
            None => Err(ShardSqlError::Configuration(format!(
                "table '{}' cannot route by primary key; configure a primary key sharding algorithm",
                self.table
            ))),
        }
    }

    /// A computed suffix must be one of the enumerated suffixes. Tables whose
    /// enumeration is empty accept whatever the algorithm returns.
    fn enumerated(&self, suffix: String) -> Result<String> {
        if self.suffixes.is_empty() || self.suffixes.contains(&suffix) {
            return Ok(suffix);
        }
        Err(ShardSqlError::Configuration(format!(
            "table '{}': sharding algorithm produced suffix '{}', which the suffix enumerator \
             does not list",
            self.table, suffix
        )))
    }

    pub fn shard_index(&self, suffix: &str) -> Result<u32> {
        shard_index_of(suffix, &self.suffixes)
    }

    pub fn physical_table(&self, suffix: &str) -> String {
        format!("{}{}", self.table, suffix)
    }

    /// Physical tables of every shard, in shard-index order.
    pub fn physical_tables(&self) -> Vec<String> {
        self.suffixes.iter().map(|s| self.physical_table(s)).collect()
    }

    pub async fn generate_primary_key(&self, shard_index: u32) -> Result<i64> {
        self.key_generator.generate(shard_index).await
    }
}

impl fmt::Debug for TableShardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableShardConfig")
            .field("table", &self.table)
            .field("sharding_key", &self.sharding_key)
            .field("number_of_shards", &self.number_of_shards)
            .field("double_write", &self.double_write)
            .field("suffixes", &self.suffixes)
            .field("primary_key_kind", &self.primary_key_kind())
            .finish()
    }
}

/// Logical table name -> compiled policy.
#[derive(Debug, Clone, Default)]
pub struct ShardRegistry {
    tables: HashMap<String, Arc<TableShardConfig>>,
}

impl ShardRegistry {
    pub fn builder() -> ShardRegistryBuilder {
        ShardRegistryBuilder::default()
    }

    /// A registry with no sharded tables; every statement passes through.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile a registry straight from `[[tables]]` settings.
    pub async fn from_settings(
        settings: &ShardingSettings,
        executor: Arc<dyn SqlExecutor>,
    ) -> Result<Self> {
        let mut builder = Self::builder();
        for table in &settings.tables {
            builder = builder.register(ShardConfig::from_settings(table), table.names.iter().cloned());
        }
        builder.compile(executor).await
    }

    pub fn get(&self, table: &str) -> Option<&Arc<TableShardConfig>> {
        self.tables.get(table)
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Registered tables sorted by name.
    pub fn tables(&self) -> Vec<&Arc<TableShardConfig>> {
        let sorted: BTreeMap<&str, &Arc<TableShardConfig>> =
            self.tables.iter().map(|(k, v)| (k.as_str(), v)).collect();
        sorted.into_values().collect()
    }
}

struct Registration {
    config: ShardConfig,
    tables: Vec<TableRef>,
}

/// Collects registrations; nothing is validated until [`compile`](Self::compile).
#[derive(Default)]
pub struct ShardRegistryBuilder {
    registrations: Vec<Registration>,
}

/// Per-table result of the validation pass, before any datastore call.
struct PlannedTable {
    table: String,
    config: ShardConfig,
    algorithm: ShardingAlgorithm,
    algorithm_by_primary_key: Option<PrimaryKeyShardingAlgorithm>,
    suffixes: Vec<String>,
}

impl ShardRegistryBuilder {
    pub fn register<I, T>(mut self, config: ShardConfig, tables: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TableRef>,
    {
        self.registrations.push(Registration {
            config,
            tables: tables.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Validate every registration and build the registry.
    ///
    /// Sequence-backed tables get their counters created through `executor`;
    /// all other validation happens first, so a rejected configuration never
    /// touches the datastore.
    pub async fn compile(self, executor: Arc<dyn SqlExecutor>) -> Result<ShardRegistry> {
        let mut seen = HashSet::new();
        let mut planned = Vec::new();

        for registration in &self.registrations {
            validate_config(&registration.config)?;
            for table_ref in &registration.tables {
                let table = table_ref.resolve()?;
                if table.trim().is_empty() {
                    return Err(ShardSqlError::Configuration(
                        "table name cannot be empty".to_string(),
                    ));
                }
                if !seen.insert(table.clone()) {
                    return Err(ShardSqlError::Configuration(format!(
                        "table '{}' is registered more than once",
                        table
                    )));
                }
                planned.push(plan_table(table, &registration.config)?);
            }
        }

        let needs_arena = planned
            .iter()
            .any(|p| p.config.primary_key_kind == PrimaryKeyKind::Snowflake);
        let arena = if needs_arena {
            Some(Arc::new(SnowflakeArena::new()?))
        } else {
            None
        };

        let mut tables = HashMap::with_capacity(planned.len());
        for plan in planned {
            let key_generator: Arc<dyn PrimaryKeyGenerator> = match plan.config.primary_key_kind {
                PrimaryKeyKind::Snowflake => match &arena {
                    Some(arena) => Arc::new(SnowflakeKeyGenerator::new(Arc::clone(arena))),
                    None => {
                        return Err(ShardSqlError::Configuration(
                            "snowflake generators were not initialized".to_string(),
                        ))
                    },
                },
                PrimaryKeyKind::Sequence(dialect) => {
                    let generator =
                        SequenceKeyGenerator::new(&plan.table, dialect, Arc::clone(&executor));
                    generator.bootstrap().await?;
                    Arc::new(generator)
                },
                PrimaryKeyKind::Custom => match &plan.config.primary_key_fn {
                    Some(f) => Arc::new(CustomKeyGenerator::new(Arc::clone(f))),
                    None => {
                        return Err(ShardSqlError::Configuration(format!(
                            "table '{}': custom primary key requires a generator function",
                            plan.table
                        )))
                    },
                },
            };

            log::debug!(
                "Registered sharded table '{}' (key={}, shards={}, suffixes={}, pk={:?}, double_write={})",
                plan.table,
                plan.config.sharding_key,
                plan.config.number_of_shards,
                plan.suffixes.len(),
                plan.config.primary_key_kind,
                plan.config.double_write
            );

            let compiled = TableShardConfig {
                table: plan.table.clone(),
                sharding_key: plan.config.sharding_key.clone(),
                number_of_shards: plan.config.number_of_shards,
                double_write: plan.config.double_write,
                algorithm: plan.algorithm,
                algorithm_by_primary_key: plan.algorithm_by_primary_key,
                suffixes: plan.suffixes,
                key_generator,
            };
            tables.insert(plan.table, Arc::new(compiled));
        }

        log::info!("Compiled sharding registry with {} table(s)", tables.len());
        Ok(ShardRegistry { tables })
    }
}

fn validate_config(config: &ShardConfig) -> Result<()> {
    if config.sharding_key.trim().is_empty() {
        return Err(ShardSqlError::Configuration("sharding key cannot be empty".to_string()));
    }

    match config.primary_key_kind {
        PrimaryKeyKind::Snowflake if config.number_of_shards > MAX_SNOWFLAKE_SHARDS => {
            return Err(ShardSqlError::Configuration(format!(
                "number_of_shards should be less than or equal to {} for snowflake primary keys, got {}",
                MAX_SNOWFLAKE_SHARDS, config.number_of_shards
            )));
        },
        PrimaryKeyKind::Custom if config.primary_key_fn.is_none() => {
            return Err(ShardSqlError::Configuration(
                "custom primary key requires a generator function".to_string(),
            ));
        },
        _ => {},
    }

    if config.sharding_algorithm.is_none() && config.number_of_shards == 0 {
        return Err(ShardSqlError::Configuration(
            "specify number_of_shards or a custom sharding algorithm".to_string(),
        ));
    }

    Ok(())
}

fn plan_table(table: String, config: &ShardConfig) -> Result<PlannedTable> {
    let format = (config.number_of_shards > 0)
        .then(|| SuffixFormat::for_shards(&config.suffix_prefix, config.number_of_shards));

    let algorithm = match (&config.sharding_algorithm, &format) {
        (Some(f), _) => Arc::clone(f),
        (None, Some(format)) => default_sharding_algorithm(format.clone(), config.number_of_shards),
        (None, None) => {
            return Err(ShardSqlError::Configuration(format!(
                "table '{}': specify number_of_shards or a custom sharding algorithm",
                table
            )))
        },
    };

    let suffixes = match &config.sharding_suffixes {
        Some(enumerate) => enumerate(),
        None => (0..config.number_of_shards as i64)
            .map(|i| algorithm(&Value::Int(i)))
            .collect::<Result<Vec<_>>>()?,
    };

    let mut unique = HashSet::new();
    for suffix in &suffixes {
        if !unique.insert(suffix.as_str()) {
            return Err(ShardSqlError::Configuration(format!(
                "table '{}': suffix '{}' is listed more than once",
                table, suffix
            )));
        }
    }

    if config.primary_key_kind == PrimaryKeyKind::Snowflake {
        for suffix in &suffixes {
            let index = shard_index_of(suffix, &suffixes)?;
            if index > SnowflakeGenerator::MAX_NODE_ID as u32 {
                return Err(ShardSqlError::Configuration(format!(
                    "table '{}': suffix '{}' maps to shard {}, beyond the snowflake node range",
                    table, suffix, index
                )));
            }
        }
    }

    let algorithm_by_primary_key = match (&config.sharding_algorithm_by_primary_key, &format) {
        (Some(f), _) => Some(Arc::clone(f)),
        (None, Some(format)) if config.primary_key_kind == PrimaryKeyKind::Snowflake => {
            let format = format.clone();
            let by_id: PrimaryKeyShardingAlgorithm = Arc::new(move |id: i64| {
                format.render(SnowflakeGenerator::node_id_of(id) as u32)
            });
            Some(by_id)
        },
        _ => None,
    };

    Ok(PlannedTable {
        table,
        config: config.clone(),
        algorithm,
        algorithm_by_primary_key,
        suffixes,
    })
}
