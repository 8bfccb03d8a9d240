//! Bit-path codec for IPv4 prefixes
//!
//! An address maps to a 32-bit path read most significant bit first. A prefix
//! of length `L` is the first `L` bits of that path, and decoding pads the
//! remaining host bits with zeros, so a decoded prefix is always the
//! canonical network address.

use crate::{Error, Result};
use ipnet::{Ipv4Net, Ipv4Subnets};
use std::fmt;
use std::net::Ipv4Addr;

/// Number of bits in an IPv4 address path
pub const ADDRESS_BITS: u8 = 32;

/// Encode an address as its 32-bit path
pub fn encode(addr: Ipv4Addr) -> u32 {
    u32::from(addr)
}

/// Decode the first `len` bits of `path` back to an address
pub fn decode(path: u32, len: u8) -> Ipv4Addr {
    Ipv4Addr::from(path & mask(len))
}

/// Network mask with the first `len` bits set
pub fn mask(len: u8) -> u32 {
    match len {
        0 => 0,
        len => u32::MAX << (ADDRESS_BITS - len.min(ADDRESS_BITS)),
    }
}

/// Number of host addresses in a block with the given prefix length
pub fn capacity(len: u8) -> u64 {
    1u64 << (ADDRESS_BITS - len.min(ADDRESS_BITS))
}

/// Parse `a.b.c.d/n` into its canonical (host-masked) network
pub fn parse_network(text: &str) -> Result<Ipv4Net> {
    let text = text.trim();
    text.parse::<Ipv4Net>()
        .map(|net| net.trunc())
        .map_err(|_| Error::InvalidNetwork(text.to_string()))
}

/// Split the whole IPv4 space into `2^bits` blocks of length `bits`
pub fn split_space(bits: u8) -> Result<Ipv4Subnets> {
    Ipv4Net::default()
        .subnets(bits)
        .map_err(|_| Error::InvalidNetwork(format!("0.0.0.0/0 cannot be split into /{}", bits)))
}

/// The leading bits of an address that identify one trie vertex
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BitPath {
    bits: u32,
    len: u8,
}

impl BitPath {
    /// The empty path (the trie root)
    pub const ROOT: BitPath = BitPath { bits: 0, len: 0 };

    /// Path of a network, truncated to its prefix length
    pub fn of(net: &Ipv4Net) -> Self {
        let len = net.prefix_len();
        BitPath {
            bits: encode(net.network()) & mask(len),
            len,
        }
    }

    /// Number of bits in the path
    pub fn prefix_len(&self) -> u8 {
        self.len
    }

    /// Bit at `depth`, counted from the most significant bit
    pub fn bit(&self, depth: u8) -> usize {
        debug_assert!(depth < ADDRESS_BITS);
        ((self.bits >> (ADDRESS_BITS - 1 - depth)) & 1) as usize
    }

    /// This path with one more bit appended
    pub fn child(&self, bit: usize) -> BitPath {
        debug_assert!(self.len < ADDRESS_BITS);
        BitPath {
            bits: self.bits | ((bit as u32 & 1) << (ADDRESS_BITS - 1 - self.len)),
            len: self.len + 1,
        }
    }

    /// The canonical network this path addresses
    pub fn network(&self) -> Ipv4Net {
        Ipv4Net::new(decode(self.bits, self.len), self.len)
            .expect("bit path length never exceeds 32")
    }
}

impl fmt::Display for BitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for depth in 0..self.len {
            write!(f, "{}", self.bit(depth))?;
        }
        Ok(())
    }
}

impl fmt::Debug for BitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitPath({}/{})", decode(self.bits, self.len), self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        for text in ["0.0.0.0", "10.1.2.3", "192.168.0.255", "255.255.255.255"] {
            let addr: Ipv4Addr = text.parse().unwrap();
            assert_eq!(decode(encode(addr), 32), addr);
        }
    }

    #[test]
    fn test_decode_zero_pads_host_bits() {
        let path = encode("10.1.2.3".parse().unwrap());
        assert_eq!(decode(path, 16), "10.1.0.0".parse::<Ipv4Addr>().unwrap());
        assert_eq!(decode(path, 0), Ipv4Addr::UNSPECIFIED);
    }

    #[test]
    fn test_path_recovers_canonical_network() {
        let net = parse_network("192.168.7.9/20").unwrap();
        assert_eq!(net.to_string(), "192.168.0.0/20");
        assert_eq!(BitPath::of(&net).network(), net);
    }

    #[test]
    fn test_path_bits() {
        let path = BitPath::of(&parse_network("128.0.0.0/2").unwrap());
        assert_eq!(path.prefix_len(), 2);
        assert_eq!(path.bit(0), 1);
        assert_eq!(path.bit(1), 0);
        assert_eq!(path.to_string(), "10");
        assert_eq!(BitPath::ROOT.to_string(), "");
    }

    #[test]
    fn test_child() {
        let path = BitPath::ROOT.child(1).child(1);
        assert_eq!(path.network().to_string(), "192.0.0.0/2");
        assert_eq!(path, BitPath::of(&parse_network("192.0.0.0/2").unwrap()));
        assert_eq!(BitPath::ROOT.child(0).to_string(), "0");
    }

    #[test]
    fn test_capacity() {
        assert_eq!(capacity(32), 1);
        assert_eq!(capacity(24), 256);
        assert_eq!(capacity(0), 1 << 32);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for text in ["10.0.0.0", "10.0.0.0/33", "300.0.0.0/8", "not a network", ""] {
            assert!(matches!(
                parse_network(text),
                Err(Error::InvalidNetwork(_))
            ));
        }
    }

    #[test]
    fn test_split_space() {
        let parts: Vec<_> = split_space(2).unwrap().map(|n| n.to_string()).collect();
        assert_eq!(
            parts,
            ["0.0.0.0/2", "64.0.0.0/2", "128.0.0.0/2", "192.0.0.0/2"]
        );
        assert!(split_space(33).is_err());
    }
}
