//! Reading network lists
//!
//! One entry per line: `CIDR` registers a network, `CIDR HOSTS` accounts
//! allocated hosts inside a block. Blank lines and `#` comments are skipped.

use crate::bits::parse_network;
use crate::trie::{InsertPolicy, PrefixTrie};
use crate::{Error, Result};
use ipnet::Ipv4Net;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// One line of a network list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry {
    pub network: Ipv4Net,
    /// Allocated hosts, if the line carried a count
    pub hosts: Option<u64>,
}

/// Parse every entry from a reader
pub fn read_entries<R: BufRead>(reader: R) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        entries.push(parse_entry(text).map_err(|_| {
            Error::InvalidNetwork(format!("line {}: {}", number + 1, text))
        })?);
    }
    Ok(entries)
}

/// Parse every entry from a file, or from stdin when `path` is `-`
pub fn load_entries(path: impl AsRef<Path>) -> Result<Vec<Entry>> {
    let path = path.as_ref();
    if path == Path::new("-") {
        return read_entries(io::stdin().lock());
    }
    read_entries(BufReader::new(File::open(path)?))
}

/// Build a trie from entries
pub fn build(entries: &[Entry], policy: InsertPolicy) -> PrefixTrie {
    let mut trie = PrefixTrie::with_policy(policy);
    for entry in entries {
        match entry.hosts {
            Some(hosts) => {
                trie.account(entry.network, hosts);
            }
            None => {
                trie.insert(entry.network);
            }
        }
    }
    trie
}

fn parse_entry(text: &str) -> Result<Entry> {
    let mut fields = text.split_whitespace();
    let network = parse_network(fields.next().unwrap_or_default())?;
    let hosts = match fields.next() {
        Some(count) => Some(
            count
                .parse::<u64>()
                .map_err(|_| Error::InvalidNetwork(text.to_string()))?,
        ),
        None => None,
    };
    if fields.next().is_some() {
        return Err(Error::InvalidNetwork(text.to_string()));
    }
    Ok(Entry { network, hosts })
}
