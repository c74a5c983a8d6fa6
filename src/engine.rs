//! Reservation strategies and the first-fit search.
//!
//! All four reservation strategies funnel through one search primitive so
//! grants are deterministic: the lowest-addressed, correctly aligned free
//! block always wins. First-fit trades potential fragmentation for
//! reproducibility.

use log::{debug, info, warn};

use crate::consumed::ConsumedSet;
use crate::error::IpamError;
use crate::range::{AddressRange, ADDRESS_BITS};
use crate::sizing::prefix_for_host_count;

/// Prefix length used for point-to-point link reservations
pub const P2P_PREFIX_LEN: u8 = 31;

/// A single reservation request, dispatched through one explicit match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationRequest {
    /// Reserve the first free block of 2^(32-n) addresses
    ByPrefix(u8),
    /// Reserve exactly this range, no search
    Exact(AddressRange),
    /// Reserve the smallest block holding this many usable hosts
    ByCount(u64),
    /// Reserve a /31 link block
    PointToPoint,
}

/// Outcome of a release request. A miss is benign, not an error: partial
/// releases are never valid, so "nothing removed" carries no risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released(AddressRange),
    NotPresent(AddressRange),
}

/// Round `value` up to the next multiple of `block_size`
fn align_up(value: u64, block_size: u64) -> u64 {
    value.div_ceil(block_size) * block_size
}

/// Find the lowest free, aligned block of the requested prefix length.
///
/// Candidates are multiples of the block size in the full 32-bit address
/// space, not offsets from the root's start. `consumed` must be sorted
/// ascending and pairwise non-overlapping, which `ConsumedSet` guarantees;
/// each consumed member that blocks the cursor bumps it past that member to
/// the next aligned address, so the scan is a single pass.
pub fn find_first_fit(
    root: AddressRange,
    consumed: &[AddressRange],
    prefix_len: u8,
) -> Result<AddressRange, IpamError> {
    if prefix_len > ADDRESS_BITS {
        return Err(IpamError::InvalidCidr {
            text: format!("/{}", prefix_len),
            reason: format!("prefix length {} is outside 0..=32", prefix_len),
        });
    }

    let block_size = 1u64 << (ADDRESS_BITS - prefix_len);
    let mut candidate = align_up(root.first() as u64, block_size);

    for member in consumed {
        if (member.last() as u64) < candidate {
            continue;
        }
        if member.first() as u64 >= candidate + block_size {
            // gap before this member is large enough
            break;
        }
        candidate = align_up(member.last() as u64 + 1, block_size);
    }

    if candidate + block_size - 1 <= root.last() as u64 {
        AddressRange::new(candidate as u32, prefix_len)
    } else {
        debug!(
            "first-fit scan exhausted root {} looking for a /{}",
            root, prefix_len
        );
        Err(IpamError::NoSpaceAvailable { prefix_len, root })
    }
}

/// Execute one reservation against a consumed set.
///
/// The granted range is added to the set before returning; validation
/// happens before any mutation, so a failure leaves the set untouched.
pub fn reserve(
    set: &mut ConsumedSet,
    request: ReservationRequest,
) -> Result<AddressRange, IpamError> {
    match request {
        ReservationRequest::ByPrefix(prefix_len) => {
            let granted = find_first_fit(set.root(), set.ranges(), prefix_len)?;
            set.add(granted)?;
            info!("Reserved {} from root {}", granted, set.root());
            Ok(granted)
        }
        ReservationRequest::Exact(range) => {
            set.add(range)?;
            info!("Reserved exact range {} from root {}", range, set.root());
            Ok(range)
        }
        ReservationRequest::ByCount(count) => {
            let prefix_len = prefix_for_host_count(count)?;
            debug!("Host count {} sized to /{}", count, prefix_len);
            reserve(set, ReservationRequest::ByPrefix(prefix_len))
        }
        ReservationRequest::PointToPoint => {
            reserve(set, ReservationRequest::ByPrefix(P2P_PREFIX_LEN))
        }
    }
}

/// Execute a batch of reservations strictly in the order given.
///
/// Each element observes the set state left by the previous one, and a
/// failure does not roll back earlier successes in the same batch. That is
/// the documented contract: callers wanting atomic batches must validate
/// up front themselves.
pub fn reserve_batch(
    set: &mut ConsumedSet,
    requests: &[ReservationRequest],
) -> Vec<Result<AddressRange, IpamError>> {
    requests
        .iter()
        .map(|request| {
            let result = reserve(set, *request);
            if let Err(ref error) = result {
                warn!("Batch element {:?} failed: {}", request, error);
            }
            result
        })
        .collect()
}

/// Release a previously reserved range.
///
/// Only an exact match is removed. A request for a range that is not a
/// current member logs a warning and reports `NotPresent`; it never fails,
/// since partial releases are unsupported and "nothing to remove" is a
/// benign outcome.
pub fn release(set: &mut ConsumedSet, range: AddressRange) -> ReleaseOutcome {
    match set.remove(&range) {
        Ok(()) => {
            info!("Released {} back to root {}", range, set.root());
            ReleaseOutcome::Released(range)
        }
        Err(error) => {
            warn!("Nothing removed: {}", error);
            ReleaseOutcome::NotPresent(range)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(text: &str) -> AddressRange {
        text.parse().unwrap()
    }

    fn set(root: &str) -> ConsumedSet {
        ConsumedSet::new(range(root))
    }

    #[test]
    fn test_first_fit_prefers_lowest_address() {
        let mut consumed = set("10.0.0.0/8");
        consumed.add(range("10.0.1.0/24")).unwrap();
        let granted = find_first_fit(consumed.root(), consumed.ranges(), 24).unwrap();
        assert_eq!(granted, range("10.0.0.0/24"));
    }

    #[test]
    fn test_first_fit_skips_past_blocking_members() {
        let mut consumed = set("10.0.0.0/8");
        consumed.add(range("10.0.0.0/16")).unwrap();
        consumed.add(range("10.1.0.0/16")).unwrap();
        let granted = find_first_fit(consumed.root(), consumed.ranges(), 16).unwrap();
        assert_eq!(granted, range("10.2.0.0/16"));
    }

    #[test]
    fn test_first_fit_uses_absolute_alignment() {
        // root starts mid-way through a /8-sized stride; a /8 candidate must
        // be a multiple of 2^24 in the full space, and none fits this root
        let root = range("10.128.0.0/9");
        assert!(matches!(
            find_first_fit(root, &[], 8),
            Err(IpamError::NoSpaceAvailable { .. })
        ));
        // while a same-size request aligns exactly on the root itself
        assert_eq!(find_first_fit(root, &[], 9).unwrap(), root);
    }

    #[test]
    fn test_first_fit_fills_aligned_gap_between_members() {
        let mut consumed = set("10.0.0.0/8");
        consumed.add(range("10.0.0.0/24")).unwrap();
        consumed.add(range("10.0.2.0/24")).unwrap();
        let granted = find_first_fit(consumed.root(), consumed.ranges(), 24).unwrap();
        assert_eq!(granted, range("10.0.1.0/24"));
        // a /23 cannot use that gap: 10.0.1.0 is not /23-aligned
        let wider = find_first_fit(consumed.root(), consumed.ranges(), 23).unwrap();
        assert_eq!(wider, range("10.0.4.0/23"));
    }

    #[test]
    fn test_reserve_by_prefix_consumes_space() {
        let mut consumed = set("10.0.0.0/8");
        let first = reserve(&mut consumed, ReservationRequest::ByPrefix(24)).unwrap();
        let second = reserve(&mut consumed, ReservationRequest::ByPrefix(24)).unwrap();
        assert_eq!(first, range("10.0.0.0/24"));
        assert_eq!(second, range("10.0.1.0/24"));
        assert_eq!(consumed.len(), 2);
    }

    #[test]
    fn test_reserve_exact_validates_through_set() {
        let mut consumed = set("10.0.0.0/8");
        reserve(&mut consumed, ReservationRequest::Exact(range("10.5.0.0/16"))).unwrap();
        assert!(matches!(
            reserve(&mut consumed, ReservationRequest::Exact(range("10.5.5.0/24"))),
            Err(IpamError::Overlap { .. })
        ));
        assert!(matches!(
            reserve(&mut consumed, ReservationRequest::Exact(range("11.0.0.0/16"))),
            Err(IpamError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_reserve_by_count_delegates_to_sizing() {
        let mut consumed = set("10.0.0.0/8");
        let granted = reserve(&mut consumed, ReservationRequest::ByCount(254)).unwrap();
        assert_eq!(granted.prefix_len(), 24);
        let tiny = reserve(&mut consumed, ReservationRequest::ByCount(1)).unwrap();
        assert_eq!(tiny.prefix_len(), 32);
    }

    #[test]
    fn test_reserve_point_to_point() {
        let mut consumed = set("10.0.0.0/8");
        let granted = reserve(&mut consumed, ReservationRequest::PointToPoint).unwrap();
        assert_eq!(granted, range("10.0.0.0/31"));
    }

    #[test]
    fn test_exhaustion_of_small_root() {
        let mut consumed = set("10.0.0.0/23");
        assert!(reserve(&mut consumed, ReservationRequest::ByPrefix(24)).is_ok());
        assert!(reserve(&mut consumed, ReservationRequest::ByPrefix(24)).is_ok());
        assert!(matches!(
            reserve(&mut consumed, ReservationRequest::ByPrefix(24)),
            Err(IpamError::NoSpaceAvailable { .. })
        ));
    }

    #[test]
    fn test_batch_commits_successes_without_rollback() {
        let mut consumed = set("10.0.0.0/23");
        let results = reserve_batch(
            &mut consumed,
            &[
                ReservationRequest::ByPrefix(24),
                ReservationRequest::ByPrefix(24),
                ReservationRequest::ByPrefix(24),
                ReservationRequest::ByPrefix(25),
            ],
        );
        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(matches!(results[2], Err(IpamError::NoSpaceAvailable { .. })));
        // the failure does not undo earlier grants, and later elements still run
        assert!(matches!(results[3], Err(IpamError::NoSpaceAvailable { .. })));
        assert_eq!(consumed.len(), 2);
    }

    #[test]
    fn test_batch_elements_observe_earlier_grants() {
        let mut consumed = set("10.0.0.0/8");
        let results = reserve_batch(
            &mut consumed,
            &[
                ReservationRequest::ByPrefix(24),
                ReservationRequest::Exact(range("10.0.1.0/24")),
            ],
        );
        assert_eq!(results[0], Ok(range("10.0.0.0/24")));
        assert_eq!(results[1], Ok(range("10.0.1.0/24")));

        let collision = reserve_batch(
            &mut consumed,
            &[ReservationRequest::Exact(range("10.0.1.0/24"))],
        );
        assert!(matches!(collision[0], Err(IpamError::Overlap { .. })));
    }

    #[test]
    fn test_release_exact_and_miss() {
        let mut consumed = set("10.0.0.0/8");
        reserve(&mut consumed, ReservationRequest::Exact(range("10.0.0.0/16"))).unwrap();

        assert_eq!(
            release(&mut consumed, range("10.0.0.0/24")),
            ReleaseOutcome::NotPresent(range("10.0.0.0/24"))
        );
        assert!(consumed.contains(&range("10.0.0.0/16")));

        assert_eq!(
            release(&mut consumed, range("10.0.0.0/16")),
            ReleaseOutcome::Released(range("10.0.0.0/16"))
        );
        assert!(consumed.is_empty());

        // releasing again is a benign no-op
        assert_eq!(
            release(&mut consumed, range("10.0.0.0/16")),
            ReleaseOutcome::NotPresent(range("10.0.0.0/16"))
        );
    }
}
