//! Difference, union and flattening of tries
//!
//! These work on the canonical networks of every terminal node, nested ones
//! included, and rebuild a fresh trie from the resulting set.

use crate::trie::{NodeRef, PrefixTrie};
use ipnet::Ipv4Net;
use std::collections::BTreeSet;
use tracing::debug;

/// Canonical networks of every terminal node, in address order
pub fn flatten(trie: &PrefixTrie) -> Vec<Ipv4Net> {
    trie.terminals().iter().map(NodeRef::network).collect()
}

/// Networks of `a` whose exact string form does not appear in `b`
pub fn difference(a: &PrefixTrie, b: &PrefixTrie) -> PrefixTrie {
    let exclude: BTreeSet<Ipv4Net> = flatten(b).into_iter().collect();
    let kept: BTreeSet<Ipv4Net> = flatten(a)
        .into_iter()
        .filter(|net| !exclude.contains(net))
        .collect();
    debug!(kept = kept.len(), excluded = exclude.len(), "trie difference");
    rebuild(a, kept)
}

/// Networks present in either `a` or `b`
pub fn union(a: &PrefixTrie, b: &PrefixTrie) -> PrefixTrie {
    let all: BTreeSet<Ipv4Net> = flatten(a).into_iter().chain(flatten(b)).collect();
    debug!(networks = all.len(), "trie union");
    rebuild(a, all)
}

/// Insert in ascending (address, prefix length) order so supernets land first
fn rebuild(template: &PrefixTrie, networks: BTreeSet<Ipv4Net>) -> PrefixTrie {
    let mut trie = PrefixTrie::with_policy(template.policy());
    trie.extend(networks);
    trie
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie::InsertPolicy;

    fn trie(networks: &[&str]) -> PrefixTrie {
        networks.iter().map(|n| n.parse::<Ipv4Net>().unwrap()).collect()
    }

    fn strings(networks: Vec<Ipv4Net>) -> Vec<String> {
        networks.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_flatten_sorted() {
        let t = trie(&["192.168.0.0/24", "10.0.0.0/8", "172.16.0.0/12"]);
        assert_eq!(
            strings(flatten(&t)),
            ["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/24"]
        );
    }

    #[test]
    fn test_difference() {
        let a = trie(&["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/24"]);
        let b = trie(&["172.16.0.0/12", "192.168.1.0/24"]);

        let diff = difference(&a, &b);
        assert_eq!(strings(flatten(&diff)), ["10.0.0.0/8", "192.168.0.0/24"]);
        assert_eq!(diff.total_size(), (1 << 24) + 256);
    }

    #[test]
    fn test_difference_compares_exact_networks() {
        let a = trie(&["10.0.0.0/8"]);
        let b = trie(&["10.1.0.0/16"]);
        assert_eq!(strings(flatten(&difference(&a, &b))), ["10.0.0.0/8"]);
    }

    #[test]
    fn test_union_collapses_covered_networks() {
        let a = trie(&["10.1.0.0/16", "192.168.0.0/24"]);
        let b = trie(&["10.0.0.0/8"]);

        let merged = union(&a, &b);
        assert_eq!(strings(merged.networks()), ["10.0.0.0/8", "192.168.0.0/24"]);
        assert_eq!(merged.total_size(), (1 << 24) + 256);
    }

    #[test]
    fn test_difference_then_union_restores_union() {
        let a = trie(&["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/24"]);
        let b = trie(&["172.16.0.0/12", "203.0.113.0/24"]);

        let restored = union(&difference(&a, &b), &b);
        assert_eq!(flatten(&restored), flatten(&union(&a, &b)));
    }

    #[test]
    fn test_result_keeps_left_policy() {
        let a = PrefixTrie::with_policy(InsertPolicy::Tally);
        let b = PrefixTrie::new();
        assert_eq!(union(&a, &b).policy(), InsertPolicy::Tally);
        assert_eq!(difference(&b, &a).policy(), InsertPolicy::Dedupe);
    }
}
