pub mod defaults;
mod loader;
pub mod types;

pub use types::{
    LoggingSettings, PrimaryKeyGeneratorSetting, ResolverSettings, ShardingSettings,
    SqlDialectKind, TableShardSettings,
};
