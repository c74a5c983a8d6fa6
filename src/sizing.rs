//! Host-count to prefix-length conversion.
//!
//! Blocks of /30 and larger reserve a network and a broadcast address, so a
//! request for N hosts needs a block of at least N + 2 addresses. A /31 or
//! /32 has no reserved addresses at all, which is why requests for up to two
//! hosts take the point-to-point path without the +2 overhead.

use crate::error::IpamError;
use crate::range::ADDRESS_BITS;

/// Total number of IPv4 addresses
const ADDRESS_SPACE: u64 = 1 << 32;

/// Compute the minimal sufficient prefix length for `count` usable hosts.
///
/// Counts of 0 and 1 yield a /32, a count of 2 yields a /31, and anything
/// larger gets network/broadcast overhead applied before rounding up to the
/// next power-of-two block. Fails with `CapacityOutOfRange` when no IPv4
/// block can hold the request.
pub fn prefix_for_host_count(count: u64) -> Result<u8, IpamError> {
    if count <= 2 {
        // Point-to-point request: no network/broadcast overhead
        return Ok(if count == 2 { 31 } else { 32 });
    }

    let needed = count
        .checked_add(2)
        .filter(|n| *n <= ADDRESS_SPACE)
        .ok_or(IpamError::CapacityOutOfRange { count })?;

    let block_size = needed.next_power_of_two();
    Ok(ADDRESS_BITS - block_size.trailing_zeros() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiny_counts_take_point_to_point_path() {
        assert_eq!(prefix_for_host_count(0).unwrap(), 32);
        assert_eq!(prefix_for_host_count(1).unwrap(), 32);
        assert_eq!(prefix_for_host_count(2).unwrap(), 31);
    }

    #[test]
    fn test_overhead_applied_above_two_hosts() {
        // 3 + 2 = 5, smallest block >= 5 is 8 addresses
        assert_eq!(prefix_for_host_count(3).unwrap(), 29);
        assert_eq!(prefix_for_host_count(6).unwrap(), 29);
        assert_eq!(prefix_for_host_count(7).unwrap(), 28);
        // 254 + 2 = 256 exactly
        assert_eq!(prefix_for_host_count(254).unwrap(), 24);
        assert_eq!(prefix_for_host_count(255).unwrap(), 23);
    }

    #[test]
    fn test_largest_representable_count() {
        // 2^32 - 2 hosts plus overhead is exactly the whole address space
        assert_eq!(prefix_for_host_count((1 << 32) - 2).unwrap(), 0);
    }

    #[test]
    fn test_count_beyond_address_space_fails() {
        let err = prefix_for_host_count((1 << 32) - 1).unwrap_err();
        assert_eq!(err, IpamError::CapacityOutOfRange { count: (1 << 32) - 1 });
        assert!(prefix_for_host_count(u64::MAX).is_err());
    }
}
