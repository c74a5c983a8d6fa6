//! # ipcarve - Subnet carving utility for IP address management
//!
//! This library tracks which sub-blocks of a fixed root address block have
//! been consumed and grants new, non-overlapping, correctly aligned
//! sub-blocks on request. It supports IPAM provisioning workflows where
//! subnets are carved out of a larger network without manual bookkeeping or
//! accidental overlap.
//!
//! ## Key Features
//!
//! - **First-fit allocation**: deterministic grants, lowest aligned address wins
//! - **Four reservation strategies**: by prefix length, by exact range, by
//!   host count, and point-to-point (/31)
//! - **Invariant enforcement**: consumed ranges never overlap and always lie
//!   within their root, checked on every mutation
//! - **Named contexts**: a registry of independent root address spaces
//! - **JSON persistence**: contexts round-trip through a small document form
//! - **Cloud reconciliation**: replay an external virtual-network description
//!   as contexts and exact reservations
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `range`: the `AddressRange` CIDR value type and its arithmetic
//! - `sizing`: host-count to prefix-length conversion
//! - `consumed`: the ordered, non-overlapping `ConsumedSet` per root
//! - `engine`: reservation strategies and the first-fit search
//! - `registry`: named context table with case-insensitive lookup
//! - `persist`: JSON persisted form and state-file helpers
//! - `reconcile`: replay of cloud virtual-network descriptions
//!
//! ## Example Usage
//!
//! ```rust
//! use ipcarve::{ContextRegistry, ReservationRequest};
//! use ipcarve::engine::reserve;
//!
//! let mut registry = ContextRegistry::new();
//! registry.set_context("lab", "10.0.0.0/8".parse()?, vec![])?;
//!
//! let context = registry.get_mut("lab")?;
//! let granted = reserve(context.consumed_mut(), ReservationRequest::ByPrefix(24))?;
//! assert_eq!(granted.to_string(), "10.0.0.0/24");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Concurrency
//!
//! The registry carries no internal locking; the engine assumes a single
//! logical owner per context. Embedders mutating contexts from multiple
//! threads must serialize those operations externally (see `registry`).
//!
//! ## Error Handling
//!
//! Engine operations return `Result<T, IpamError>`, a closed enum of failure
//! kinds (`InvalidCidr`, `OutOfBounds`, `Overlap`, `NoSpaceAvailable`,
//! `CapacityOutOfRange`, `ContextNotFound`, `RangeNotFound`), each carrying
//! the offending range or name. File-level helpers in `persist` report
//! through `color_eyre` with path context.

pub mod consumed;
pub mod engine;
pub mod error;
pub mod persist;
pub mod range;
pub mod reconcile;
pub mod registry;
pub mod sizing;

// Re-export commonly used types
pub use consumed::{validate_against_root, ConsumedSet};
pub use engine::{ReleaseOutcome, ReservationRequest};
pub use error::IpamError;
pub use range::AddressRange;
pub use registry::{Context, ContextRegistry};
