//! CIDR address range value type.
//!
//! This file contains the core address arithmetic: parsing and formatting of
//! "a.b.c.d/n" blocks, containment and overlap checks, and the usable-host
//! boundaries including the /31 point-to-point and /32 host-route conventions.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::IpamError;

/// Width of an IPv4 address in bits
pub const ADDRESS_BITS: u8 = 32;

/// Network mask for a prefix length, as the raw address bits
fn mask(prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        n => u32::MAX << (ADDRESS_BITS - n),
    }
}

/// An immutable CIDR block: a network address plus a prefix length.
///
/// Construction validates that the address is aligned to its own block size
/// (all host bits zero); a misaligned value is rejected, never truncated.
/// Ordering is by network address ascending, then prefix length ascending,
/// so a block sorts before its own smaller sub-blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddressRange {
    network: u32,
    prefix_len: u8,
}

impl AddressRange {
    /// Construct a range from raw network bits and a prefix length.
    ///
    /// Fails with `InvalidCidr` if the prefix length exceeds 32 or the
    /// address has host bits set.
    pub fn new(network: u32, prefix_len: u8) -> Result<Self, IpamError> {
        if prefix_len > ADDRESS_BITS {
            return Err(IpamError::InvalidCidr {
                text: format!("{}/{}", Ipv4Addr::from(network), prefix_len),
                reason: format!("prefix length {} is outside 0..=32", prefix_len),
            });
        }
        if network & !mask(prefix_len) != 0 {
            return Err(IpamError::InvalidCidr {
                text: format!("{}/{}", Ipv4Addr::from(network), prefix_len),
                reason: format!(
                    "address is not aligned to a /{} boundary",
                    prefix_len
                ),
            });
        }
        Ok(AddressRange { network, prefix_len })
    }

    /// The network address of the block
    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.network)
    }

    /// The prefix length of the block
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Number of addresses in the block: 2^(32 - prefix length).
    /// A /0 holds 2^32 addresses, hence the u64 return type.
    pub fn block_size(&self) -> u64 {
        1u64 << (ADDRESS_BITS - self.prefix_len)
    }

    /// First (lowest) address in the block, as raw bits
    pub fn first(&self) -> u32 {
        self.network
    }

    /// Last (highest) address in the block, as raw bits
    pub fn last(&self) -> u32 {
        (self.network as u64 + self.block_size() - 1) as u32
    }

    /// First address usable for a host.
    ///
    /// For prefixes shorter than /31 the network address is reserved, so the
    /// first usable host is network + 1. A /31 has no reserved addresses and
    /// a /32 is its own single usable address.
    pub fn first_usable(&self) -> Ipv4Addr {
        if self.prefix_len >= 31 {
            Ipv4Addr::from(self.first())
        } else {
            Ipv4Addr::from(self.first() + 1)
        }
    }

    /// Last address usable for a host, excluding the broadcast address for
    /// prefixes shorter than /31.
    pub fn last_usable(&self) -> Ipv4Addr {
        if self.prefix_len >= 31 {
            Ipv4Addr::from(self.last())
        } else {
            Ipv4Addr::from(self.last() - 1)
        }
    }

    /// True iff `other` lies entirely within this block
    pub fn contains(&self, other: &AddressRange) -> bool {
        self.first() <= other.first() && other.last() <= self.last()
    }

    /// True iff the two blocks share at least one address.
    /// Equal ranges overlap; adjacent ranges do not.
    pub fn overlaps(&self, other: &AddressRange) -> bool {
        self.first() <= other.last() && other.first() <= self.last()
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix_len)
    }
}

impl FromStr for AddressRange {
    type Err = IpamError;

    /// Parse canonical "a.b.c.d/n" notation.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let (addr_text, prefix_text) = text.split_once('/').ok_or_else(|| {
            IpamError::InvalidCidr {
                text: text.to_string(),
                reason: "expected 'a.b.c.d/n' notation".to_string(),
            }
        })?;

        let addr: Ipv4Addr = addr_text.parse().map_err(|_| IpamError::InvalidCidr {
            text: text.to_string(),
            reason: format!("'{}' is not a valid dotted-quad address", addr_text),
        })?;

        let prefix_len: u8 = prefix_text.parse().map_err(|_| IpamError::InvalidCidr {
            text: text.to_string(),
            reason: format!("'{}' is not a valid prefix length", prefix_text),
        })?;

        AddressRange::new(u32::from(addr), prefix_len)
    }
}
