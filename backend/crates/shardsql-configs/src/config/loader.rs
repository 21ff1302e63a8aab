use super::defaults::{ENV_LOG_FORMAT, ENV_LOG_LEVEL, MAX_SNOWFLAKE_SHARDS};
use super::types::{PrimaryKeyGeneratorSetting, ShardingSettings};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

impl ShardingSettings {
    /// Load configuration from a TOML file, apply environment overrides and validate
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let mut config: ShardingSettings = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;

        config.finalize()?;

        Ok(config)
    }

    /// Override logging settings from `SHARDSQL_LOG_LEVEL` / `SHARDSQL_LOG_FORMAT`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
            if !level.trim().is_empty() {
                self.logging.level = level.trim().to_lowercase();
            }
        }
        if let Ok(format) = std::env::var(ENV_LOG_FORMAT) {
            if !format.trim().is_empty() {
                self.logging.format = format.trim().to_lowercase();
            }
        }
    }

    pub fn finalize(&mut self) -> anyhow::Result<()> {
        self.apply_env_overrides();
        self.validate()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> anyhow::Result<()> {
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            ));
        }

        let valid_formats = ["compact", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_formats.join(", ")
            ));
        }

        for (target, level) in &self.logging.targets {
            if !valid_levels.contains(&level.as_str()) {
                return Err(anyhow::anyhow!(
                    "Invalid log level '{}' for target '{}'. Must be one of: {}",
                    level,
                    target,
                    valid_levels.join(", ")
                ));
            }
        }

        let mut seen = HashSet::new();
        for (idx, table) in self.tables.iter().enumerate() {
            if table.names.is_empty() {
                return Err(anyhow::anyhow!("tables[{}]: names cannot be empty", idx));
            }
            if table.sharding_key.trim().is_empty() {
                return Err(anyhow::anyhow!("tables[{}]: sharding_key cannot be empty", idx));
            }
            if table.number_of_shards == 0 {
                return Err(anyhow::anyhow!("tables[{}]: number_of_shards cannot be 0", idx));
            }
            if table.primary_key_generator == PrimaryKeyGeneratorSetting::Snowflake
                && table.number_of_shards > MAX_SNOWFLAKE_SHARDS
            {
                return Err(anyhow::anyhow!(
                    "tables[{}]: snowflake number_of_shards should be <= {}, got {}",
                    idx,
                    MAX_SNOWFLAKE_SHARDS,
                    table.number_of_shards
                ));
            }
            for name in &table.names {
                if name.trim().is_empty() {
                    return Err(anyhow::anyhow!("tables[{}]: table name cannot be empty", idx));
                }
                if !seen.insert(name.as_str()) {
                    return Err(anyhow::anyhow!(
                        "table '{}' is configured more than once",
                        name
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{SqlDialectKind, TableShardSettings};
    use std::io::Write;

    const SAMPLE: &str = r#"
[logging]
level = "debug"

[resolver]
dialect = "postgres"

[[tables]]
names = ["orders", "order_items"]
sharding_key = "user_id"
number_of_shards = 4
double_write = true
primary_key_generator = "pg_sequence"
"#;

    #[test]
    fn test_default_config_is_valid() {
        let config = ShardingSettings::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.resolver.skip_hints, vec!["nosharding", "skip-sharding"]);
    }

    #[test]
    fn test_parse_sample() {
        let config = ShardingSettings::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.resolver.dialect, SqlDialectKind::Postgres);
        assert_eq!(config.tables.len(), 1);

        let table = &config.tables[0];
        assert_eq!(table.names, vec!["orders", "order_items"]);
        assert_eq!(table.suffix_prefix, "_");
        assert!(table.double_write);
        assert_eq!(table.primary_key_generator, PrimaryKeyGeneratorSetting::PgSequence);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = ShardingSettings::from_file(file.path()).unwrap();
        assert_eq!(config.tables[0].number_of_shards, 4);
    }

    #[test]
    fn test_missing_file() {
        let err = ShardingSettings::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_unknown_primary_key_generator_rejected() {
        let toml = r#"
[[tables]]
names = ["orders"]
sharding_key = "user_id"
number_of_shards = 4
primary_key_generator = "uuid"
"#;
        let err = ShardingSettings::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_snowflake_shard_limit() {
        let mut config = ShardingSettings::default();
        config.tables.push(TableShardSettings::new(&["orders"], "user_id", 2048));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let mut config = ShardingSettings::default();
        config.tables.push(TableShardSettings::new(&["orders"], "user_id", 4));
        config.tables.push(TableShardSettings::new(&["orders"], "shop_id", 8));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = ShardingSettings::default();
        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());
    }
}
