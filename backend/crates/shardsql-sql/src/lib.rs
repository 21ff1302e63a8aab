//! SQL resolver for ShardSQL.
//!
//! Turns a statement written against a logical table into the statement that
//! must run against one of its shard tables:
//!
//! ```text
//! parse ──▶ find target table ──▶ find sharding value ──▶ suffix ──▶ rewrite ──▶ render
//! ```
//!
//! Statements the resolver cannot or should not shard (unparseable SQL, DDL,
//! joins, unregistered tables, `/* nosharding */` selects) pass through with
//! their text untouched.

pub mod models;
pub mod parser;
pub mod resolver;

pub use models::{ResolvedQuery, ResolverOptions};
pub use resolver::QueryResolver;
