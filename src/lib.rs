//! # cidrtree
//!
//! An address-space-aware IPv4 prefix trie.
//!
//! Networks are indexed in a straight 32-level binary trie keyed by address
//! bits. Each node tracks how many hosts are registered beneath it, so the
//! trie can answer containment and size queries, punch holes out of
//! registered blocks, and promote densely allocated blocks.
//!
//! ## Core Concepts
//!
//! - **Registration**: a terminal node; the network it addresses is present
//! - **Supernet**: the registered network covering a query
//! - **Hole punching**: deleting inside a registration splits it around the hole
//! - **Aggregation**: leaves whose accounted hosts reach a fullness threshold
//!   become registrations
//!
//! ## Example
//!
//! ```
//! use cidrtree::{parse_network, PrefixTrie};
//!
//! let mut trie = PrefixTrie::new();
//! trie.insert(parse_network("10.0.0.0/8")?);
//! trie.delete(parse_network("10.1.0.0/16")?);
//!
//! assert!(trie.contains(parse_network("10.2.0.0/16")?));
//! assert!(!trie.contains(parse_network("10.1.5.0/24")?));
//! # Ok::<(), cidrtree::Error>(())
//! ```

pub mod bits;
pub mod config;
pub mod input;
pub mod ops;
pub mod trie;

mod error;

pub use bits::{parse_network, BitPath};
pub use config::Config;
pub use error::{Error, Result};
pub use input::Entry;
pub use trie::{InsertPolicy, NodeId, NodeRef, NodeSummary, PrefixTrie};

/// Re-exported so callers can name networks without depending on ipnet
pub use ipnet::Ipv4Net;
