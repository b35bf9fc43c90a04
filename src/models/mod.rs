//! Domain models for the IPAM core.
//!
//! This module contains the core data structures used throughout the crate:
//! - [`Address`] and [`Cidr`] - IPv4/IPv6 addresses and prefixes with their algebra
//! - [`Interval`] - integer ranges for identifier counters
//! - [`Subnet`], [`Network`], [`Ip`] and [`CounterDoc`] - persisted object shapes

mod address;
mod cidr;
pub mod decimal;
mod interval;
mod ip;
mod network;
mod state;
mod subnet;

// Re-export public types
pub use address::{
    broadcast_addr, cut_addr, host_mask, lo_mask, net_mask, Address, Family, V4_BITS, V6_BITS,
};
pub use cidr::Cidr;
pub use interval::Interval;
pub use ip::{Ip, IpSpec, IpStatus};
pub use network::{CounterDoc, Network, NetworkSpec, NetworkStatus, NetworkType};
pub use state::{AllocationState, IpState, NetworkState, SubnetState};
pub use subnet::{locality, Locality, Region, Subnet, SubnetSpec, SubnetStatus};
