//! Read/write connection sets per logical table.

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use shardsql_commons::{SqlExecutor, StatementKind};

/// Connections a table's shard statements may run on.
///
/// Reads pick uniformly among `reads`, writes among `writes`. An empty side
/// falls back to the router's default pool.
#[derive(Clone, Default)]
pub struct ReplicaSet {
    reads: Vec<Arc<dyn SqlExecutor>>,
    writes: Vec<Arc<dyn SqlExecutor>>,
}

impl ReplicaSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(mut self, executor: Arc<dyn SqlExecutor>) -> Self {
        self.reads.push(executor);
        self
    }

    pub fn write(mut self, executor: Arc<dyn SqlExecutor>) -> Self {
        self.writes.push(executor);
        self
    }

    pub fn reads(&self) -> &[Arc<dyn SqlExecutor>] {
        &self.reads
    }

    pub fn writes(&self) -> &[Arc<dyn SqlExecutor>] {
        &self.writes
    }

    /// A random connection for `kind`, if this set has any for it.
    pub fn pick(&self, kind: StatementKind) -> Option<Arc<dyn SqlExecutor>> {
        let candidates = if kind.is_read() {
            &self.reads
        } else {
            &self.writes
        };
        match candidates.len() {
            0 => None,
            1 => Some(Arc::clone(&candidates[0])),
            n => {
                let idx = rand::rng().random_range(0..n);
                Some(Arc::clone(&candidates[idx]))
            },
        }
    }
}

impl fmt::Debug for ReplicaSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |list: &[Arc<dyn SqlExecutor>]| {
            list.iter().map(|e| e.name().to_string()).collect::<Vec<_>>()
        };
        f.debug_struct("ReplicaSet")
            .field("reads", &names(&self.reads))
            .field("writes", &names(&self.writes))
            .finish()
    }
}
