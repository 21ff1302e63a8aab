// Error types module
use thiserror::Error;

/// Main error type for ShardSQL
///
/// Query-time variants abort a call before anything reaches the datastore.
/// `Configuration` is raised while compiling the registry and halts startup.
#[derive(Error, Debug)]
pub enum ShardSqlError {
    #[error("sharding key or id required, and use operator =")]
    MissingShardingKey,

    #[error("Invalid id format: {0}")]
    InvalidId(String),

    #[error("can not insert different suffix table in one query: {first} vs {second}")]
    InsertSuffixMismatch { first: String, second: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported construct: {0}")]
    UnsupportedConstruct(String),

    #[error("Bind argument {index} out of range ({len} arguments supplied)")]
    ArgumentOutOfRange { index: usize, len: usize },

    #[error("Invalid statement: {0}")]
    InvalidStatement(String),

    #[error("Primary key generation failed: {0}")]
    PrimaryKey(String),

    #[error("Datastore error: {0}")]
    Datastore(String),
}

impl ShardSqlError {
    /// True for errors raised while resolving a query (nothing was executed).
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            ShardSqlError::MissingShardingKey
                | ShardSqlError::InvalidId(_)
                | ShardSqlError::InsertSuffixMismatch { .. }
                | ShardSqlError::UnsupportedConstruct(_)
                | ShardSqlError::ArgumentOutOfRange { .. }
                | ShardSqlError::InvalidStatement(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ShardSqlError>;
