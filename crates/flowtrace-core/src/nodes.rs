use crate::NodeId;
use serde::{Deserialize, Serialize};

/// Ascending, duplicate-free set of node ids.
///
/// Order is load-bearing: a PMF entry belongs to the candidate at the same
/// position.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<NodeId>", into = "Vec<NodeId>")]
pub struct NodeSet(Vec<NodeId>);

impl NodeSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Sort and deduplicate arbitrary ids
    pub fn from_unsorted(ids: impl IntoIterator<Item = NodeId>) -> Self {
        let mut ids: Vec<NodeId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self(ids)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.0.binary_search(&node).is_ok()
    }

    /// Position of `node` in the set
    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.0.binary_search(&node).ok()
    }

    pub fn as_slice(&self) -> &[NodeId] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<NodeId> {
        self.0
    }
}

impl std::ops::Deref for NodeSet {
    type Target = [NodeId];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<NodeId>> for NodeSet {
    fn from(ids: Vec<NodeId>) -> Self {
        NodeSet::from_unsorted(ids)
    }
}

impl From<NodeSet> for Vec<NodeId> {
    fn from(set: NodeSet) -> Self {
        set.0
    }
}

impl FromIterator<NodeId> for NodeSet {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        NodeSet::from_unsorted(iter)
    }
}

impl<'a> IntoIterator for &'a NodeSet {
    type Item = &'a NodeId;
    type IntoIter = std::slice::Iter<'a, NodeId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_and_distinct() {
        let set = NodeSet::from_unsorted(vec![7, 3, 3, 9, 1, 7]);
        assert_eq!(set.as_slice(), &[1, 3, 7, 9]);
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_lookup() {
        let set: NodeSet = [4, 2, 8].into_iter().collect();
        assert!(set.contains(8));
        assert!(!set.contains(5));
        assert_eq!(set.position(4), Some(1));
        assert_eq!(set.position(5), None);
    }

    #[test]
    fn test_empty() {
        let set = NodeSet::new();
        assert!(set.is_empty());
        assert_eq!(set, NodeSet::from_unsorted(Vec::new()));
    }
}
