//! Prefix trie over the IPv4 address space

use super::node::{Node, NodeId, NodeRef};
use crate::bits::{capacity, BitPath};
use crate::{Error, Result};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace};

/// How insertions treat networks that are already covered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertPolicy {
    /// Skip networks that are registered or covered by a registration, and
    /// never count the same host twice
    #[default]
    Dedupe,
    /// Record every insertion down to its own prefix length and add its raw
    /// host count along the path
    Tally,
}

impl InsertPolicy {
    pub fn dedupes(self) -> bool {
        self == InsertPolicy::Dedupe
    }
}

/// A straight 32-level binary trie of IPv4 networks
///
/// Nodes live in an arena and refer to each other through [`NodeId`]s:
/// - children are keyed by the next address bit (at most two per node)
/// - every node carries the number of hosts registered at or below it
/// - terminal nodes are the registered networks; a terminal ancestor masks
///   whatever structure remains below it
pub struct PrefixTrie {
    nodes: Vec<Node>,
    /// Canonical network → terminal node, for every terminal node
    index: HashMap<Ipv4Net, NodeId>,
    policy: InsertPolicy,
}

impl PrefixTrie {
    /// Create an empty trie with the [`InsertPolicy::Dedupe`] policy
    pub fn new() -> Self {
        Self::with_policy(InsertPolicy::default())
    }

    pub fn with_policy(policy: InsertPolicy) -> Self {
        PrefixTrie {
            nodes: vec![Node::root()],
            index: HashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> InsertPolicy {
        self.policy
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef::new(self, NodeId::ROOT)
    }

    /// Number of structural nodes, root and retired nodes included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Hosts accounted at the root
    pub fn total_size(&self) -> u64 {
        self.nodes[0].size
    }

    /// Number of top-level registered networks
    pub fn len(&self) -> usize {
        self.subnets().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The node at exactly `net`, if the structure reaches it
    pub fn get(&self, net: Ipv4Net) -> Option<NodeRef<'_>> {
        self.find(BitPath::of(&net))
            .map(|id| NodeRef::new(self, id))
    }

    /// Whether a registered network covers or equals `net`
    pub fn contains(&self, net: Ipv4Net) -> bool {
        self.supernet(net).is_some()
    }

    /// Register a network
    ///
    /// Returns `true` if the set of registered networks changed. Under
    /// [`InsertPolicy::Dedupe`], inserting a network that is already
    /// registered or covered is a no-op.
    pub fn insert(&mut self, net: Ipv4Net) -> bool {
        let net = net.trunc();
        let path = BitPath::of(&net);
        let hosts = capacity(path.prefix_len());

        if self.policy.dedupes() {
            if self.index.contains_key(&net) {
                trace!(%net, "insert skipped: already registered");
                return false;
            }
            if let Some(cover) = self.covering(path) {
                trace!(%net, covered_by = %self.node(cover).path.network(), "insert skipped: covered");
                return false;
            }
        }

        let (target, created) = self.descend(path);
        // An existing node may already account for hosts registered below it.
        let delta = if self.policy.dedupes() && !created {
            hosts.saturating_sub(self.node(target).size)
        } else {
            hosts
        };
        self.claim(target, delta);

        let changed = !self.node(target).terminal;
        self.set_terminal(target, true);
        debug!(%net, hosts, created, "inserted network");
        changed
    }

    /// Attribute `hosts` allocated addresses to `net` without registering it
    ///
    /// The hosts count toward the block's fullness for [`aggregate`]. Returns
    /// the number of hosts added to the root's total: under
    /// [`InsertPolicy::Dedupe`] that is clamped to the unclaimed room of the
    /// block and of every block enclosing it, and is zero when a registration
    /// already covers the block.
    ///
    /// [`aggregate`]: PrefixTrie::aggregate
    pub fn account(&mut self, net: Ipv4Net, hosts: u64) -> u64 {
        let net = net.trunc();
        let path = BitPath::of(&net);
        if hosts == 0 {
            return 0;
        }
        if self.policy.dedupes() && self.covering(path).is_some() {
            trace!(%net, hosts, "account skipped: covered");
            return 0;
        }

        let (target, _) = self.descend(path);
        let hosts = match self.policy {
            InsertPolicy::Dedupe => {
                hosts.min(capacity(path.prefix_len()).saturating_sub(self.node(target).size))
            }
            InsertPolicy::Tally => hosts.min(capacity(path.prefix_len())),
        };
        let hosts = self.claim(target, hosts);
        debug!(%net, hosts, "accounted hosts");
        hosts
    }

    /// Remove a network, punching a hole in any registration that covers it
    ///
    /// The rest of a covering registration stays registered, re-expressed as
    /// sibling blocks around the hole. Returns the number of hosts released
    /// from the root's total; deleting an absent network returns 0.
    pub fn delete(&mut self, net: Ipv4Net) -> u64 {
        let net = net.trunc();
        let path = BitPath::of(&net);

        let covered = self.covering(path).is_some();
        let live = self
            .find(path)
            .map(|id| self.node(id))
            .is_some_and(|node| node.size > 0 || node.terminal);
        if !covered && !live {
            trace!(%net, "delete skipped: absent");
            return 0;
        }

        let mut current = NodeId::ROOT;
        for depth in 0..path.prefix_len() {
            let bit = path.bit(depth);
            let (next, _) = self.child_or_create(current, bit);
            let (sibling, _) = self.child_or_create(current, bit ^ 1);
            if self.node(current).terminal {
                self.split(current, [next, sibling]);
            }
            current = next;
        }

        let released = self.node(current).size;
        self.retire(current);
        if let Some(parent) = self.node(current).parent {
            self.release(parent, released);
        }
        debug!(%net, released, "deleted network");
        released
    }

    /// The registered network that covers or equals `net`
    ///
    /// Under [`InsertPolicy::Tally`] nested registrations can exist, and the
    /// most specific one on the path is reported.
    pub fn supernet(&self, net: Ipv4Net) -> Option<NodeRef<'_>> {
        self.covering(BitPath::of(&net))
            .map(|id| NodeRef::new(self, id))
    }

    /// Registered networks in address order, not descending into a
    /// registered network's own structure
    pub fn subnets(&self) -> Vec<NodeRef<'_>> {
        let mut result = Vec::new();
        self.collect_terminals(NodeId::ROOT, false, &mut result);
        result
    }

    /// Every terminal node in address order, including those nested below
    /// another terminal node
    pub fn terminals(&self) -> Vec<NodeRef<'_>> {
        let mut result = Vec::new();
        self.collect_terminals(NodeId::ROOT, true, &mut result);
        result
    }

    /// Canonical networks of [`subnets`](PrefixTrie::subnets)
    pub fn networks(&self) -> Vec<Ipv4Net> {
        self.subnets().iter().map(NodeRef::network).collect()
    }

    /// Hosts registered within `net`
    ///
    /// A registration covering `net` from above counts as the whole block,
    /// or as the registration's own size if that is smaller.
    pub fn sizeof(&self, net: Ipv4Net) -> u64 {
        let path = BitPath::of(&net);
        let mut current = NodeId::ROOT;
        for depth in 0..path.prefix_len() {
            let node = self.node(current);
            if node.terminal {
                return capacity(path.prefix_len()).min(node.size);
            }
            match self.node(current).children[path.bit(depth)] {
                Some(next) => current = next,
                None => return 0,
            }
        }
        self.registered(current)
    }

    /// Register every unregistered leaf whose fullness reaches `threshold`
    ///
    /// One flat pass: promoting a leaf does not re-evaluate its parent, and
    /// sibling leaves are not merged. Leaves with no accounted hosts are
    /// never promoted. Returns the number of promoted leaves.
    pub fn aggregate(&mut self, threshold: f64) -> Result<usize> {
        if !(threshold.is_finite() && threshold > 0.0) {
            return Err(Error::InvalidThreshold(threshold));
        }

        let dense: Vec<NodeId> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| {
                node.is_leaf() && !node.terminal && node.size > 0 && node.fullness() >= threshold
            })
            .map(|(index, _)| NodeId::from_index(index))
            .collect();

        for &id in &dense {
            self.set_terminal(id, true);
        }
        debug!(threshold, promoted = dense.len(), "aggregated dense leaves");
        Ok(dense.len())
    }

    /// Insert every registered network of `other` into this trie
    pub fn merge(&mut self, other: &PrefixTrie) {
        let before = self.total_size();
        for net in other.networks() {
            self.insert(net);
        }
        debug!(before, after = self.total_size(), "merged trie");
    }

    // === Internal helpers ===

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Walk existing structure to exactly `path`
    fn find(&self, path: BitPath) -> Option<NodeId> {
        let mut current = NodeId::ROOT;
        for depth in 0..path.prefix_len() {
            current = self.node(current).children[path.bit(depth)]?;
        }
        Some(current)
    }

    /// Terminal node at or above `path`
    ///
    /// Under dedupe the walk stops at the first terminal, otherwise it keeps
    /// going and reports the deepest one.
    fn covering(&self, path: BitPath) -> Option<NodeId> {
        let mut current = NodeId::ROOT;
        let mut found = None;
        for depth in 0..=path.prefix_len() {
            if self.node(current).terminal {
                found = Some(current);
                if self.policy.dedupes() {
                    break;
                }
            }
            if depth == path.prefix_len() {
                break;
            }
            match self.node(current).children[path.bit(depth)] {
                Some(next) => current = next,
                None => break,
            }
        }
        found
    }

    /// Walk to `path`, creating missing nodes
    ///
    /// Returns the target and whether it was newly created.
    fn descend(&mut self, path: BitPath) -> (NodeId, bool) {
        let mut current = NodeId::ROOT;
        let mut created = false;
        for depth in 0..path.prefix_len() {
            (current, created) = self.child_or_create(current, path.bit(depth));
        }
        (current, created)
    }

    fn child_or_create(&mut self, parent: NodeId, bit: usize) -> (NodeId, bool) {
        if let Some(child) = self.node(parent).children[bit] {
            return (child, false);
        }
        let path = self.node(parent).path.child(bit);
        let child = NodeId::from_index(self.nodes.len());
        self.nodes.push(Node::child_of(parent, path));
        self.node_mut(parent).children[bit] = Some(child);
        (child, true)
    }

    /// Flip the terminal flag, keeping the index in step
    fn set_terminal(&mut self, id: NodeId, terminal: bool) {
        let network = self.node(id).path.network();
        self.node_mut(id).terminal = terminal;
        if terminal {
            self.index.insert(network, id);
        } else {
            self.index.remove(&network);
        }
    }

    /// Add `hosts` to `from` and each of its ancestors
    ///
    /// Under dedupe every node takes at most its unclaimed room, and only what
    /// it took moves further up. Returns the hosts added at the root.
    fn claim(&mut self, from: NodeId, mut hosts: u64) -> u64 {
        let dedupe = self.policy.dedupes();
        let mut cursor = Some(from);
        while let Some(id) = cursor {
            let node = self.node_mut(id);
            if dedupe {
                hosts = hosts.min(capacity(node.prefix_len()).saturating_sub(node.size));
            }
            node.size = node.size.saturating_add(hosts);
            cursor = node.parent;
        }
        hosts
    }

    /// Subtract `hosts` from `from` and each of its ancestors
    fn release(&mut self, from: NodeId, hosts: u64) {
        let mut cursor = Some(from);
        while let Some(id) = cursor {
            let node = self.node_mut(id);
            node.size = node.size.saturating_sub(hosts);
            cursor = node.parent;
        }
    }

    /// Re-express a terminal node as its two halves
    ///
    /// The node keeps its size. The half on the path being deleted takes up to
    /// a full half of it and the other half takes the rest.
    fn split(&mut self, id: NodeId, [on_path, off_path]: [NodeId; 2]) {
        let half = capacity(self.node(id).prefix_len() + 1);
        let size = self.node(id).size;
        let taken = size.min(half);
        self.node_mut(on_path).size = taken;
        self.node_mut(off_path).size = size - taken;
        self.set_terminal(on_path, true);
        self.set_terminal(off_path, true);
        self.set_terminal(id, false);
        trace!(network = %self.node(id).path.network(), size, "split registration");
    }

    /// Clear the terminal flag and size of a node and its whole subtree
    fn retire(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if self.node(id).terminal {
                self.set_terminal(id, false);
            }
            let node = self.node_mut(id);
            node.size = 0;
            stack.extend(node.children.iter().flatten());
        }
    }

    /// Hosts registered at or below a node
    fn registered(&self, id: NodeId) -> u64 {
        let node = self.node(id);
        if node.terminal {
            return node.size;
        }
        node.children
            .iter()
            .flatten()
            .map(|&child| self.registered(child))
            .sum()
    }

    fn collect_terminals<'a>(&'a self, id: NodeId, nested: bool, out: &mut Vec<NodeRef<'a>>) {
        let node = self.node(id);
        if node.terminal {
            out.push(NodeRef::new(self, id));
            if !nested {
                return;
            }
        }
        // Bit 0 before bit 1 keeps the output in address order.
        for &child in node.children.iter().flatten() {
            self.collect_terminals(child, nested, out);
        }
    }
}

impl Default for PrefixTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PrefixTrie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefixTrie")
            .field("policy", &self.policy)
            .field("nodes", &self.nodes.len())
            .field("total_size", &self.total_size())
            .field("subnets", &self.networks())
            .finish()
    }
}

impl fmt::Display for PrefixTrie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.subnets().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", node)?;
        }
        Ok(())
    }
}

impl Extend<Ipv4Net> for PrefixTrie {
    fn extend<I: IntoIterator<Item = Ipv4Net>>(&mut self, iter: I) {
        for net in iter {
            self.insert(net);
        }
    }
}

impl FromIterator<Ipv4Net> for PrefixTrie {
    fn from_iter<I: IntoIterator<Item = Ipv4Net>>(iter: I) -> Self {
        let mut trie = PrefixTrie::new();
        trie.extend(iter);
        trie
    }
}
