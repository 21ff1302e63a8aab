// Default value functions

pub fn default_true() -> bool {
    true
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_log_format() -> String {
    "compact".to_string()
}

pub fn default_suffix_prefix() -> String {
    "_".to_string()
}

/// Comment hints that make a SELECT bypass sharding, e.g. `SELECT /* nosharding */ ...`
pub fn default_skip_hints() -> Vec<String> {
    vec!["nosharding".to_string(), "skip-sharding".to_string()]
}

/// Largest shard count addressable by snowflake ids (10 node bits)
pub const MAX_SNOWFLAKE_SHARDS: u32 = 1024;

/// Environment variable overriding `[logging].level`
pub const ENV_LOG_LEVEL: &str = "SHARDSQL_LOG_LEVEL";

/// Environment variable overriding `[logging].format`
pub const ENV_LOG_FORMAT: &str = "SHARDSQL_LOG_FORMAT";
