//! Default sharding algorithm and suffix helpers.

use std::sync::Arc;

use shardsql_commons::{Result, ShardSqlError, Value};

use crate::config::ShardingAlgorithm;

/// Textual shape of a numeric suffix: prefix plus zero-padded shard number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixFormat {
    prefix: String,
    width: usize,
}

impl SuffixFormat {
    /// Width follows the decimal width of the shard count: 4 shards -> `_0`,
    /// 64 shards -> `_00`, 1024 shards -> `_0000`.
    pub fn for_shards(prefix: &str, number_of_shards: u32) -> Self {
        let width = match number_of_shards {
            0..=9 => 1,
            10..=99 => 2,
            100..=999 => 3,
            1000..=9999 => 4,
            n => n.to_string().len(),
        };
        Self {
            prefix: prefix.to_string(),
            width,
        }
    }

    pub fn render(&self, shard: u32) -> String {
        format!("{}{:0width$}", self.prefix, shard, width = self.width)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

/// Integer value of a sharding key under the default algorithm.
///
/// Integers are used as-is, numeric strings are parsed the same way ids are
/// (see [`Value::as_i64`]), and any other string is reduced to its CRC32
/// (IEEE) checksum.
pub fn sharding_number(value: &Value) -> Result<i64> {
    match value {
        Value::Int(v) => Ok(*v),
        Value::Text(s) => Ok(value
            .as_i64()
            .unwrap_or_else(|| crc32fast::hash(s.as_bytes()) as i64)),
        other => Err(ShardSqlError::UnsupportedConstruct(format!(
            "default sharding algorithm only supports integer and string values, got {}; \
             configure a custom sharding algorithm",
            other.type_name()
        ))),
    }
}

/// `value mod number_of_shards`, rendered through `format`.
pub fn default_sharding_algorithm(format: SuffixFormat, number_of_shards: u32) -> ShardingAlgorithm {
    Arc::new(move |value: &Value| {
        let n = sharding_number(value)?;
        let shard = n.rem_euclid(number_of_shards as i64) as u32;
        Ok(format.render(shard))
    })
}

/// Shard index of `suffix`: its trailing digits when present, otherwise its
/// position in the enumerated suffix list.
pub fn shard_index_of(suffix: &str, suffixes: &[String]) -> Result<u32> {
    let digits: String = suffix
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    if !digits.is_empty() {
        if let Ok(index) = digits.parse::<u32>() {
            return Ok(index);
        }
    }

    suffixes
        .iter()
        .position(|s| s == suffix)
        .map(|idx| idx as u32)
        .ok_or_else(|| {
            ShardSqlError::Configuration(format!(
                "table suffix '{}' is not in the enumerated suffixes; the suffix enumerator \
                 must list every suffix the sharding algorithm produces",
                suffix
            ))
        })
}
