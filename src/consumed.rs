//! Consumed-range tracking for a single root block.
//!
//! A `ConsumedSet` holds the sub-blocks already granted out of one root
//! range, ordered by network address. Every mutation either fully succeeds
//! or leaves the set untouched, so the containment and non-overlap
//! invariants hold after each operation, not just at quiescence.

use crate::error::IpamError;
use crate::range::AddressRange;

/// Ordered collection of non-overlapping ranges within one root range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedSet {
    root: AddressRange,
    /// Members sorted ascending by network address; pairwise non-overlapping
    ranges: Vec<AddressRange>,
}

impl ConsumedSet {
    /// Create an empty set for the given root
    pub fn new(root: AddressRange) -> Self {
        ConsumedSet {
            root,
            ranges: Vec::new(),
        }
    }

    /// Create a set pre-seeded with the given ranges.
    ///
    /// The whole list is validated against the root before anything is
    /// accepted; a single bad entry rejects the entire seeding.
    pub fn with_ranges(root: AddressRange, ranges: Vec<AddressRange>) -> Result<Self, IpamError> {
        validate_against_root(root, &ranges)?;
        let mut set = ConsumedSet { root, ranges };
        set.ranges.sort();
        Ok(set)
    }

    /// The root range this set carves from
    pub fn root(&self) -> AddressRange {
        self.root
    }

    /// Current members, ascending by network address
    pub fn ranges(&self) -> &[AddressRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Exact-match membership test
    pub fn contains(&self, range: &AddressRange) -> bool {
        self.ranges.binary_search(range).is_ok()
    }

    /// Insert a range, keeping members ordered.
    ///
    /// Fails with `OutOfBounds` if the range does not lie within the root,
    /// or `Overlap` naming the conflicting member. On failure the set is
    /// unchanged.
    pub fn add(&mut self, range: AddressRange) -> Result<(), IpamError> {
        if !self.root.contains(&range) {
            return Err(IpamError::OutOfBounds {
                range,
                root: self.root,
            });
        }
        if let Some(existing) = self.ranges.iter().find(|member| member.overlaps(&range)) {
            return Err(IpamError::Overlap {
                range,
                existing: *existing,
            });
        }
        // Overlap check above guarantees the search misses
        let position = self.ranges.binary_search(&range).unwrap_or_else(|p| p);
        self.ranges.insert(position, range);
        Ok(())
    }

    /// Remove an exact member.
    ///
    /// Only whole previously granted ranges can be released; removing part
    /// of a larger member is unsupported, so anything other than an exact
    /// match fails with `RangeNotFound`.
    pub fn remove(&mut self, range: &AddressRange) -> Result<(), IpamError> {
        match self.ranges.binary_search(range) {
            Ok(position) => {
                self.ranges.remove(position);
                Ok(())
            }
            Err(_) => Err(IpamError::RangeNotFound { range: *range }),
        }
    }

    /// Drop all members, keeping the root
    pub fn clear(&mut self) {
        self.ranges.clear();
    }
}

/// Stateless validation of candidate ranges against a root.
///
/// Checks every candidate for containment in `root` and every pair for
/// overlap, returning the first violation found in list order. Used for
/// context seeding and exposed standalone for ad hoc auditing.
pub fn validate_against_root(
    root: AddressRange,
    candidates: &[AddressRange],
) -> Result<(), IpamError> {
    for (index, range) in candidates.iter().enumerate() {
        if !root.contains(range) {
            return Err(IpamError::OutOfBounds {
                range: *range,
                root,
            });
        }
        if let Some(existing) = candidates[..index].iter().find(|prior| prior.overlaps(range)) {
            return Err(IpamError::Overlap {
                range: *range,
                existing: *existing,
            });
        }
    }
    Ok(())
}
