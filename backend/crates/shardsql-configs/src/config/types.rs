use super::defaults::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Top-level sharding configuration, usually loaded from `sharding.toml`
///
/// ```toml
/// [logging]
/// level = "debug"
///
/// [resolver]
/// dialect = "postgres"
///
/// [[tables]]
/// names = ["orders"]
/// sharding_key = "user_id"
/// number_of_shards = 4
/// primary_key_generator = "snowflake"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShardingSettings {
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub resolver: ResolverSettings,
    #[serde(default)]
    pub tables: Vec<TableShardSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `compact` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,

    #[serde(default = "default_true")]
    pub log_to_console: bool,

    /// Optional log file; console only when unset
    #[serde(default)]
    pub file_path: Option<String>,

    /// Per-target level overrides, e.g. `shardsql_router = "trace"`
    #[serde(default)]
    pub targets: HashMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_to_console: true,
            file_path: None,
            targets: HashMap::new(),
        }
    }
}

/// SQL dialect used when parsing intercepted statements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialectKind {
    #[default]
    Generic,
    #[serde(alias = "postgresql")]
    Postgres,
    Mysql,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSettings {
    #[serde(default)]
    pub dialect: SqlDialectKind,

    #[serde(default = "default_skip_hints")]
    pub skip_hints: Vec<String>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            dialect: SqlDialectKind::default(),
            skip_hints: default_skip_hints(),
        }
    }
}

/// Primary key strategy as written in configuration files.
///
/// Unknown strings fail deserialization, so an unrecognized strategy never
/// survives past loading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryKeyGeneratorSetting {
    #[default]
    Snowflake,
    PgSequence,
    MysqlSequence,
    /// Requires a generator function attached in code before compilation
    Custom,
}

/// Sharding policy shared by one or more logical tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableShardSettings {
    /// Logical table names this policy applies to
    pub names: Vec<String>,

    /// Column whose value selects the shard
    pub sharding_key: String,

    pub number_of_shards: u32,

    /// Also write every row to the logical table (migration window)
    #[serde(default)]
    pub double_write: bool,

    /// Text placed between the logical name and the shard number (`orders` + `_` + `01`)
    #[serde(default = "default_suffix_prefix")]
    pub suffix_prefix: String,

    #[serde(default)]
    pub primary_key_generator: PrimaryKeyGeneratorSetting,
}

impl TableShardSettings {
    pub fn new(names: &[&str], sharding_key: &str, number_of_shards: u32) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            sharding_key: sharding_key.to_string(),
            number_of_shards,
            double_write: false,
            suffix_prefix: default_suffix_prefix(),
            primary_key_generator: PrimaryKeyGeneratorSetting::default(),
        }
    }
}
