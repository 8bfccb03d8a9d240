//! Trie node types

use super::PrefixTrie;
use crate::bits::{capacity, BitPath, ADDRESS_BITS};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle to a node in a trie's arena
///
/// Handles stay valid for the life of the trie: nodes are never removed,
/// only retired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The root node of every trie
    pub const ROOT: NodeId = NodeId(0);

    pub(crate) fn from_index(index: usize) -> Self {
        NodeId(index as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A vertex of the trie
///
/// Children are owned through the arena and keyed by the next path bit. The
/// parent link is a plain handle and only used to push size deltas upward.
#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub(crate) path: BitPath,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: [Option<NodeId>; 2],
    /// Hosts claimed by this node and everything registered under it
    pub(crate) size: u64,
    /// Whether this node is a registered network boundary
    pub(crate) terminal: bool,
}

impl Node {
    pub(crate) fn root() -> Self {
        Node {
            path: BitPath::ROOT,
            parent: None,
            children: [None, None],
            size: 0,
            terminal: false,
        }
    }

    pub(crate) fn child_of(parent: NodeId, path: BitPath) -> Self {
        Node {
            path,
            parent: Some(parent),
            children: [None, None],
            size: 0,
            terminal: false,
        }
    }

    pub(crate) fn prefix_len(&self) -> u8 {
        self.path.prefix_len()
    }

    /// A true leaf has no structural children at all
    pub(crate) fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    /// Share of the block's capacity claimed by `size`
    ///
    /// A /31 is a point-to-point pair and a /32 is always fully occupied.
    pub(crate) fn fullness(&self) -> f64 {
        match self.prefix_len() {
            ADDRESS_BITS => 1.0,
            31 => self.size as f64 / 2.0,
            len => self.size as f64 / capacity(len) as f64,
        }
    }
}

/// A read-only view of one node in a [`PrefixTrie`]
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    trie: &'a PrefixTrie,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub(crate) fn new(trie: &'a PrefixTrie, id: NodeId) -> Self {
        NodeRef { trie, id }
    }

    fn node(&self) -> &'a Node {
        self.trie.node(self.id)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Depth in the trie; the root is 0
    pub fn prefix_len(&self) -> u8 {
        self.node().prefix_len()
    }

    pub fn size(&self) -> u64 {
        self.node().size
    }

    pub fn is_terminal(&self) -> bool {
        self.node().terminal
    }

    pub fn is_leaf(&self) -> bool {
        self.node().is_leaf()
    }

    pub fn fullness(&self) -> f64 {
        self.node().fullness()
    }

    pub fn bit_path(&self) -> BitPath {
        self.node().path
    }

    /// The canonical network this node addresses
    pub fn network(&self) -> Ipv4Net {
        self.node().path.network()
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node().parent.map(|id| NodeRef::new(self.trie, id))
    }

    /// Existing children, bit 0 first
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let trie = self.trie;
        self.node()
            .children
            .iter()
            .flatten()
            .map(move |&id| NodeRef::new(trie, id))
    }

    pub fn summary(&self) -> NodeSummary {
        NodeSummary {
            network: self.network(),
            prefix_len: self.prefix_len(),
            size: self.size(),
            terminal: self.is_terminal(),
        }
    }
}

impl fmt::Display for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.network())
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("network", &self.network())
            .field("size", &self.size())
            .field("terminal", &self.is_terminal())
            .finish()
    }
}

/// Owned snapshot of a node, for reporting
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub network: Ipv4Net,
    pub prefix_len: u8,
    pub size: u64,
    pub terminal: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(text: &str, size: u64) -> Node {
        let path = BitPath::of(&text.parse().unwrap());
        Node {
            size,
            ..Node::child_of(NodeId::ROOT, path)
        }
    }

    #[test]
    fn test_fullness_by_block_size() {
        assert_eq!(leaf("10.0.0.0/24", 128).fullness(), 0.5);
        assert_eq!(leaf("10.0.0.0/31", 1).fullness(), 0.5);
        assert_eq!(leaf("10.0.0.0/32", 0).fullness(), 1.0);
    }

    #[test]
    fn test_new_root_is_empty_leaf() {
        let root = Node::root();
        assert_eq!(root.prefix_len(), 0);
        assert!(root.is_leaf());
        assert!(!root.terminal);
        assert_eq!(root.size, 0);
    }

    #[test]
    fn test_node_summary_serializes_canonical_network() {
        let summary = NodeSummary {
            network: "10.0.0.0/8".parse().unwrap(),
            prefix_len: 8,
            size: 1 << 24,
            terminal: true,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["network"], "10.0.0.0/8");
        assert_eq!(json["size"], 16777216);
    }
}
