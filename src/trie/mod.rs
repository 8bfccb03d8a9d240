//! Binary prefix trie over the IPv4 address space
//!
//! This implements a straight 32-level trie where:
//! - Each node is one bit position of an address path, with at most two children
//! - Sizes track how many hosts are registered at or below each node
//! - Deleting inside a registered block splits it around the hole

mod node;
mod tree;

pub use node::{NodeId, NodeRef, NodeSummary};
pub use tree::{InsertPolicy, PrefixTrie};
