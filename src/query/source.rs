//! Data source identity

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies which batch loader owns a query: a (source, collection) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataSourceId {
    /// Database name
    pub source: String,
    /// Collection name
    pub collection: String,
}

impl DataSourceId {
    pub fn new(source: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for DataSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.source, self.collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_display() {
        assert_eq!(DataSourceId::new("shop", "orders").to_string(), "shop.orders");
    }

    #[test]
    fn test_identity_is_pairwise() {
        let mut seen = HashSet::new();
        seen.insert(DataSourceId::new("a", "b"));
        assert!(seen.contains(&DataSourceId::new("a", "b")));
        assert!(!seen.contains(&DataSourceId::new("b", "a")));
    }
}
