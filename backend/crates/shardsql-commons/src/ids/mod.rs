//! Id generation primitives.

pub mod snowflake;

pub use snowflake::SnowflakeGenerator;
