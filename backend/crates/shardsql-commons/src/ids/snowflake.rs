// Snowflake ID generator
use parking_lot::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::{Result, ShardSqlError};

/// Snowflake ID generator for time-ordered unique identifiers
///
/// Format (64 bits):
/// - 41 bits: timestamp in milliseconds since custom epoch
/// - 10 bits: node ID (the shard index the generator is bound to)
/// - 12 bits: sequence number
///
/// The node bits make the owning shard recoverable from an id alone, see
/// [`SnowflakeGenerator::node_id_of`].
#[derive(Debug)]
pub struct SnowflakeGenerator {
    /// Node ID (0-1023)
    node_id: u16,

    /// Custom epoch (milliseconds since Unix epoch)
    epoch: u64,

    state: Mutex<GeneratorState>,
}

#[derive(Debug)]
struct GeneratorState {
    last_timestamp: u64,
    sequence: u16,
}

impl SnowflakeGenerator {
    /// Custom epoch: 2024-01-01 00:00:00 UTC
    pub const DEFAULT_EPOCH: u64 = 1704067200000;

    /// Maximum node ID
    pub const MAX_NODE_ID: u16 = 1023;

    /// Number of distinct node IDs
    pub const NODE_COUNT: usize = Self::MAX_NODE_ID as usize + 1;

    const MAX_SEQUENCE: u16 = 4095;
    const NODE_SHIFT: u64 = 12;
    const TIMESTAMP_SHIFT: u64 = 22;

    /// Create a generator bound to `node_id`
    pub fn new(node_id: u16) -> Result<Self> {
        Self::with_epoch(node_id, Self::DEFAULT_EPOCH)
    }

    pub fn with_epoch(node_id: u16, epoch: u64) -> Result<Self> {
        if node_id > Self::MAX_NODE_ID {
            return Err(ShardSqlError::Configuration(format!(
                "snowflake node id must be <= {}, got {}",
                Self::MAX_NODE_ID,
                node_id
            )));
        }

        Ok(Self {
            node_id,
            epoch,
            state: Mutex::new(GeneratorState {
                last_timestamp: 0,
                sequence: 0,
            }),
        })
    }

    pub fn node_id(&self) -> u16 {
        self.node_id
    }

    /// Generate the next Snowflake ID
    pub fn next_id(&self) -> Result<i64> {
        let mut state = self.state.lock();

        let mut timestamp = current_timestamp()?;

        if timestamp < state.last_timestamp {
            return Err(ShardSqlError::PrimaryKey(format!(
                "Clock moved backwards. Refusing to generate id for {} milliseconds",
                state.last_timestamp - timestamp
            )));
        }

        if timestamp == state.last_timestamp {
            state.sequence = (state.sequence + 1) & Self::MAX_SEQUENCE;

            if state.sequence == 0 {
                // Sequence exhausted for this millisecond
                timestamp = wait_next_millis(state.last_timestamp)?;
            }
        } else {
            state.sequence = 0;
        }

        state.last_timestamp = timestamp;

        let id = ((timestamp - self.epoch) << Self::TIMESTAMP_SHIFT)
            | ((self.node_id as u64) << Self::NODE_SHIFT)
            | (state.sequence as u64);

        Ok(id as i64)
    }

    /// Extract the node ID from a Snowflake ID without a generator instance.
    pub fn node_id_of(id: i64) -> u16 {
        (((id as u64) >> Self::NODE_SHIFT) & Self::MAX_NODE_ID as u64) as u16
    }

    /// Extract timestamp (ms since Unix epoch) from a Snowflake ID
    pub fn extract_timestamp(&self, id: i64) -> u64 {
        ((id as u64) >> Self::TIMESTAMP_SHIFT) + self.epoch
    }

    /// Extract sequence from a Snowflake ID
    pub fn extract_sequence(&self, id: i64) -> u16 {
        ((id as u64) & Self::MAX_SEQUENCE as u64) as u16
    }
}

fn current_timestamp() -> Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .map_err(|e| ShardSqlError::PrimaryKey(format!("Failed to get current timestamp: {}", e)))
}

fn wait_next_millis(last_timestamp: u64) -> Result<u64> {
    let mut timestamp = current_timestamp()?;
    while timestamp <= last_timestamp {
        std::hint::spin_loop();
        timestamp = current_timestamp()?;
    }
    Ok(timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_snowflake_uniqueness() {
        let gen = SnowflakeGenerator::new(1).unwrap();
        let mut ids = HashSet::new();

        for _ in 0..10000 {
            let id = gen.next_id().unwrap();
            assert!(ids.insert(id), "Duplicate ID generated: {}", id);
        }
    }

    #[test]
    fn test_snowflake_ordering() {
        let gen = SnowflakeGenerator::new(1).unwrap();
        let mut last_id = 0i64;

        for _ in 0..1000 {
            let id = gen.next_id().unwrap();
            assert!(id > last_id, "IDs not in order: {} <= {}", id, last_id);
            last_id = id;
        }
    }

    #[test]
    fn test_extract_timestamp() {
        let gen = SnowflakeGenerator::new(1).unwrap();
        let id = gen.next_id().unwrap();
        let timestamp = gen.extract_timestamp(id);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;

        assert!((timestamp as i64 - now as i64).abs() < 1000);
    }

    #[test]
    fn test_node_id_roundtrip() {
        for node in [0u16, 1, 42, 511, SnowflakeGenerator::MAX_NODE_ID] {
            let gen = SnowflakeGenerator::new(node).unwrap();
            let id = gen.next_id().unwrap();
            assert_eq!(SnowflakeGenerator::node_id_of(id), node);
        }
    }

    #[test]
    fn test_extract_sequence() {
        let gen = SnowflakeGenerator::new(1).unwrap();
        let id1 = gen.next_id().unwrap();
        let id2 = gen.next_id().unwrap();
        assert!(id2 > id1);
        assert!(gen.extract_sequence(id2) <= SnowflakeGenerator::MAX_SEQUENCE);
    }

    #[test]
    fn test_invalid_node_id() {
        let err = SnowflakeGenerator::new(2000).unwrap_err();
        assert!(matches!(err, ShardSqlError::Configuration(_)));
    }

    #[test]
    fn test_concurrent_generation() {
        use std::sync::Arc;
        use std::thread;

        let gen = Arc::new(SnowflakeGenerator::new(7).unwrap());
        let mut handles = vec![];

        for _ in 0..10 {
            let gen_clone = Arc::clone(&gen);
            handles.push(thread::spawn(move || {
                (0..100).map(|_| gen_clone.next_id().unwrap()).collect::<Vec<_>>()
            }));
        }

        let mut all_ids = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all_ids.insert(id), "Duplicate ID in concurrent test");
            }
        }

        assert_eq!(all_ids.len(), 1000);
    }
}
