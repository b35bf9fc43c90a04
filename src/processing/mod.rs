//! Allocation algorithms.
//!
//! This module contains the allocators and the request handling built on them:
//! - [`prefix`] - vacant list of a root CIDR (reserve/release sub-ranges)
//! - [`subnet`] - subnet tracker with capacity accounting and proposals
//! - [`network`] - disjoint root CIDRs of a network
//! - [`counter`] - interval allocator for network identifiers
//! - [`allocate`] - subnet, IP and network requests
//! - [`validate`] - field rules for requests

pub mod allocate;
mod counter;
mod network;
mod prefix;
mod subnet;
pub mod validate;

// Re-export public types and functions
pub use allocate::{
    allocate_child, allocate_ip, allocate_network_id, apply_ip, apply_network, apply_subnet,
    release_child, release_ip, release_network_id, resolve_child,
};
pub use counter::{Counter, CounterState};
pub use network::{NetworkAggregate, RootList};
pub use prefix::PrefixAllocator;
pub use subnet::{prefix_for_capacity, SubnetTracker};
