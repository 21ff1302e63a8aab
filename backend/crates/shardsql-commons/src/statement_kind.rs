use serde::{Deserialize, Serialize};
use std::fmt;

/// Statement category used for routing decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    /// DDL, administrative statements and anything that failed to parse
    Other,
}

impl StatementKind {
    pub fn is_read(&self) -> bool {
        matches!(self, StatementKind::Select)
    }

    pub fn is_write(&self) -> bool {
        matches!(
            self,
            StatementKind::Insert | StatementKind::Update | StatementKind::Delete
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
            StatementKind::Other => "OTHER",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_split() {
        assert!(StatementKind::Select.is_read());
        assert!(!StatementKind::Select.is_write());
        for kind in [StatementKind::Insert, StatementKind::Update, StatementKind::Delete] {
            assert!(kind.is_write());
            assert!(!kind.is_read());
        }
        assert!(!StatementKind::Other.is_read());
        assert!(!StatementKind::Other.is_write());
    }
}
