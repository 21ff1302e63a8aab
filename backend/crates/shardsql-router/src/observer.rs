//! Hooks invoked after every resolution.

use parking_lot::RwLock;
use shardsql_sql::ResolvedQuery;

/// Called by the router once a statement is resolved, before it executes.
pub trait QueryObserver: Send + Sync {
    fn on_resolved(&self, resolved: &ResolvedQuery);
}

/// Keeps the most recent shard-table rendering.
///
/// Last writer wins; under concurrent callers the stored text is from
/// whichever call finished resolving last. Intended for tests and debugging.
#[derive(Debug, Default)]
pub struct LastQuery {
    query: RwLock<Option<String>>,
}

impl LastQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        self.query.read().clone()
    }
}

impl QueryObserver for LastQuery {
    fn on_resolved(&self, resolved: &ResolvedQuery) {
        *self.query.write() = Some(resolved.shard_query.clone());
    }
}
