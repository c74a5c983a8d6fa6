//! Error types shared across the allocation engine.
//!
//! Every failure carries enough detail to identify the offending range or
//! context name, so callers never have to guess which input was rejected.

use crate::range::AddressRange;

/// Errors that can occur during parsing, validation, or allocation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IpamError {
    #[error("invalid CIDR '{text}': {reason}")]
    InvalidCidr { text: String, reason: String },

    #[error("range {range} is not contained in root {root}")]
    OutOfBounds {
        range: AddressRange,
        root: AddressRange,
    },

    #[error("range {range} overlaps already consumed range {existing}")]
    Overlap {
        range: AddressRange,
        existing: AddressRange,
    },

    #[error("no free /{prefix_len} block available in root {root}")]
    NoSpaceAvailable { prefix_len: u8, root: AddressRange },

    #[error("host count {count} cannot be satisfied by any IPv4 block")]
    CapacityOutOfRange { count: u64 },

    #[error("context '{name}' not found")]
    ContextNotFound { name: String },

    #[error("range {range} is not a member of the consumed set")]
    RangeNotFound { range: AddressRange },
}
