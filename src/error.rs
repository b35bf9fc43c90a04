//! Error types for the allocation core.
//!
//! Every operation on a [`crate::processing::PrefixAllocator`],
//! [`crate::processing::SubnetTracker`], [`crate::processing::NetworkAggregate`]
//! or [`crate::processing::Counter`] either succeeds or returns one of these,
//! leaving the receiver untouched.

use crate::models::{Cidr, Family};
use num_bigint::{BigInt, BigUint};
use thiserror::Error;

/// Failure kinds of the allocation core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IpamError {
    /// Text could not be parsed as an address, CIDR or identifier.
    #[error("bad format: {0}")]
    BadFormat(String),

    /// An operation mixed IPv4 and IPv6 operands.
    #[error("address family mismatch: expected {expected}, found {found}")]
    FamilyMismatch { expected: Family, found: Family },

    /// No vacant block covers the CIDR to reserve.
    #[error("{0} is not covered by any vacant block")]
    NoCover(Cidr),

    /// The identifier to reserve is not vacant.
    #[error("identifier {0} is not free")]
    NotFree(BigInt),

    /// The CIDR to release overlaps a vacant block.
    #[error("{0} overlaps a vacant block")]
    Overlaps(Cidr),

    /// The identifier to release is already vacant.
    #[error("identifier {0} is already free")]
    AlreadyFree(BigInt),

    /// The CIDR is not inside the root it was applied to.
    #[error("{cidr} is not contained in {root}")]
    NotContained { root: Cidr, cidr: Cidr },

    /// A network root collides with a root already listed.
    #[error("root {0} overlaps an existing root")]
    OverlappingRoot(Cidr),

    /// The network root to release is not listed.
    #[error("root {0} not found")]
    NotFound(Cidr),

    /// No vacant block of the requested size is left.
    #[error("no vacant block for /{0}")]
    Exhausted(u8),

    /// The counter has no vacant identifiers left.
    #[error("no identifiers left")]
    Empty,

    /// Requested capacity is outside `[1, 2^bits]`.
    #[error("invalid capacity {0}")]
    InvalidCapacity(BigUint),

    /// Requested prefix length is longer than the family allows.
    #[error("invalid prefix length /{0}")]
    InvalidPrefix(u8),

    /// The object still has dependants.
    #[error("{0} is still in use")]
    InUse(String),

    /// A request or persisted state breaks a field rule.
    #[error("invalid: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, IpamError>;
