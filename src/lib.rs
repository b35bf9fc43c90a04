//! Prefix and identifier allocation for a network control plane.
//!
//! - [`models`] - addresses, CIDRs, intervals and the persisted object shapes
//! - [`processing`] - prefix allocator, subnet tracker, network aggregate and identifier counter
//! - [`store`] - JSON state files
//! - [`output`] - terminal rendering
//! - [`cli`] - the `ipam` command line

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod output;
pub mod processing;
pub mod store;

pub use error::{IpamError, Result};
pub use models::{Address, Cidr, Family, Interval, NetworkType};
pub use processing::{Counter, NetworkAggregate, PrefixAllocator, SubnetTracker};
