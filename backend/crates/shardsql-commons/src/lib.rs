//! # shardsql-commons
//!
//! Shared types used across all ShardSQL crates (`shardsql-sharding`,
//! `shardsql-sql`, `shardsql-router`):
//!
//! - [`Value`]: positional argument bound to a placeholder
//! - [`StatementKind`]: closed set of statement categories used for routing
//! - [`ShardSqlError`]: the single error type every layer propagates
//! - [`SqlExecutor`]: the datastore boundary (execute / query / transactions)
//! - [`SnowflakeGenerator`]: time-ordered ids carrying a 10-bit node id
//!
//! ## Example Usage
//!
//! ```rust
//! use shardsql_commons::{StatementKind, Value};
//!
//! let user_id = Value::from(101i64);
//! assert_eq!(user_id.as_i64(), Some(101));
//! assert!(StatementKind::Select.is_read());
//! ```

pub mod errors;
pub mod executor;
pub mod ids;
pub mod statement_kind;
pub mod value;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use errors::{Result, ShardSqlError};
pub use executor::{ExecResult, QueryRows, Row, SqlExecutor};
pub use ids::SnowflakeGenerator;
pub use statement_kind::StatementKind;
pub use value::Value;
