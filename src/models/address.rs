//! IP addresses of either family and the bit-mask helpers built on them.
//!
//! Both families are stored in a `u128`; an IPv4 address only ever uses the
//! low 32 bits. Masks are always computed relative to the family width.

use crate::error::{IpamError, Result};
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Width of an IPv4 address in bits.
pub const V4_BITS: u8 = 32;
/// Width of an IPv6 address in bits.
pub const V6_BITS: u8 = 128;

/// Address family.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Ipv4,
    Ipv6,
}

impl Family {
    /// Number of bits in an address of this family (`mask_bits`).
    pub fn bits(self) -> u8 {
        match self {
            Family::Ipv4 => V4_BITS,
            Family::Ipv6 => V6_BITS,
        }
    }

    /// All address bits set.
    pub fn all_ones(self) -> u128 {
        match self {
            Family::Ipv4 => u32::MAX as u128,
            Family::Ipv6 => u128::MAX,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Family::Ipv4 => write!(f, "IPv4"),
            Family::Ipv6 => write!(f, "IPv6"),
        }
    }
}

/// Host part of a prefix: the bits right of `len` set, as u128.
///
/// # Examples
/// ```
/// use subnet_ipam::models::{host_mask, Family};
/// assert_eq!(host_mask(Family::Ipv4, 24).unwrap(), 0xFF);
/// ```
pub fn host_mask(family: Family, len: u8) -> Result<u128> {
    if len > family.bits() {
        return Err(IpamError::InvalidPrefix(len));
    }
    if len == family.bits() {
        // u128 >> 128 overflows
        return Ok(0);
    }
    Ok(family.all_ones() >> len)
}

/// Network part of a prefix: the first `len` bits set.
///
/// # Examples
/// ```
/// use subnet_ipam::models::{net_mask, Family};
/// assert_eq!(net_mask(Family::Ipv4, 24).unwrap(), 0xFFFFFF00);
/// ```
pub fn net_mask(family: Family, len: u8) -> Result<u128> {
    Ok(family.all_ones() & !host_mask(family, len)?)
}

/// Get the network address for a given address and prefix length.
pub fn cut_addr(addr: Address, len: u8) -> Result<Address> {
    let mask = net_mask(addr.family, len)?;
    Ok(Address {
        family: addr.family,
        bits: addr.bits & mask,
    })
}

/// Calculate the last (broadcast) address for a given address and prefix length.
pub fn broadcast_addr(addr: Address, len: u8) -> Result<Address> {
    let mask = host_mask(addr.family, len)?;
    Ok(Address {
        family: addr.family,
        bits: addr.bits | mask,
    })
}

/// Shortest prefix length for which `addr` is a network address.
pub fn lo_mask(addr: Address) -> u8 {
    let width = addr.family.bits();
    let trailing_zeros = (addr.bits.trailing_zeros() as u8).min(width);
    width - trailing_zeros
}

/// An IPv4 or IPv6 address.
///
/// Addresses of different families are never equal and never ordered.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    family: Family,
    bits: u128,
}

impl Address {
    /// Build an address from its raw bits; IPv4 values must fit in 32 bits.
    pub fn new(family: Family, bits: u128) -> Result<Address> {
        if bits > family.all_ones() {
            return Err(IpamError::BadFormat(format!(
                "{bits:#x} does not fit in an {family} address"
            )));
        }
        Ok(Address { family, bits })
    }

    pub fn family(&self) -> Family {
        self.family
    }

    /// Raw address bits.
    pub fn bits(&self) -> u128 {
        self.bits
    }

    pub fn to_ip(&self) -> IpAddr {
        match self.family {
            Family::Ipv4 => IpAddr::V4(Ipv4Addr::from(self.bits as u32)),
            Family::Ipv6 => IpAddr::V6(Ipv6Addr::from(self.bits)),
        }
    }
}

impl From<Ipv4Addr> for Address {
    fn from(ip: Ipv4Addr) -> Self {
        Address {
            family: Family::Ipv4,
            bits: u32::from(ip) as u128,
        }
    }
}

impl From<Ipv6Addr> for Address {
    fn from(ip: Ipv6Addr) -> Self {
        Address {
            family: Family::Ipv6,
            bits: u128::from(ip),
        }
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => v4.into(),
            IpAddr::V6(v6) => v6.into(),
        }
    }
}

impl FromStr for Address {
    type Err = IpamError;

    fn from_str(s: &str) -> Result<Address> {
        let s = s.trim();
        IpAddr::from_str(s)
            .map(Address::from)
            .map_err(|_| IpamError::BadFormat(format!("invalid address {s}")))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_ip())
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Address) -> Option<Ordering> {
        if self.family != other.family {
            return None;
        }
        Some(self.bits.cmp(&other.bits))
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Address, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Address::from_str(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(s: &str) -> Address {
        s.parse().unwrap()
    }

    #[test]
    fn test_net_mask() {
        assert_eq!(net_mask(Family::Ipv4, 0).unwrap(), 0x00000000);
        assert_eq!(net_mask(Family::Ipv4, 8).unwrap(), 0xFF000000);
        assert_eq!(net_mask(Family::Ipv4, 24).unwrap(), 0xFFFFFF00);
        assert_eq!(net_mask(Family::Ipv4, 32).unwrap(), 0xFFFFFFFF);
        assert!(net_mask(Family::Ipv4, 33).is_err());
        assert_eq!(net_mask(Family::Ipv6, 0).unwrap(), 0);
        assert_eq!(net_mask(Family::Ipv6, 128).unwrap(), u128::MAX);
        assert_eq!(net_mask(Family::Ipv6, 1).unwrap(), 1u128 << 127);
        assert!(net_mask(Family::Ipv6, 129).is_err());
    }

    #[test]
    fn test_host_mask() {
        assert_eq!(host_mask(Family::Ipv4, 0).unwrap(), 0xFFFFFFFF);
        assert_eq!(host_mask(Family::Ipv4, 30).unwrap(), 0x3);
        assert_eq!(host_mask(Family::Ipv4, 32).unwrap(), 0);
        assert_eq!(host_mask(Family::Ipv6, 0).unwrap(), u128::MAX);
        assert_eq!(host_mask(Family::Ipv6, 128).unwrap(), 0);
    }

    #[test]
    fn test_cut_addr() {
        let ip = v4("192.168.1.42");
        assert_eq!(cut_addr(ip, 24).unwrap(), v4("192.168.1.0"));
        assert_eq!(cut_addr(ip, 16).unwrap(), v4("192.168.0.0"));
        assert_eq!(cut_addr(ip, 8).unwrap(), v4("192.0.0.0"));
        assert_eq!(cut_addr(ip, 32).unwrap(), ip);
        assert!(cut_addr(ip, 33).is_err());
    }

    #[test]
    fn test_broadcast_addr() {
        let ip = v4("192.168.1.0");
        assert_eq!(broadcast_addr(ip, 24).unwrap(), v4("192.168.1.255"));
        assert_eq!(broadcast_addr(ip, 16).unwrap(), v4("192.168.255.255"));
        assert_eq!(broadcast_addr(ip, 32).unwrap(), ip);
        let v6: Address = "2001:db8::".parse().unwrap();
        assert_eq!(
            broadcast_addr(v6, 64).unwrap().to_string(),
            "2001:db8::ffff:ffff:ffff:ffff"
        );
    }

    #[test]
    fn test_lo_mask() {
        assert_eq!(lo_mask(v4("192.168.1.1")), 32);
        assert_eq!(lo_mask(v4("10.6.2.80")), 28);
        assert_eq!(lo_mask(v4("0.0.0.0")), 0);
        assert_eq!(lo_mask("::".parse().unwrap()), 0);
        assert_eq!(lo_mask("8000::".parse().unwrap()), 1);
    }

    #[test]
    fn test_family_never_ordered() {
        let a = v4("0.0.0.1");
        let b: Address = "::1".parse().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.partial_cmp(&b), None);
        assert!(v4("10.0.0.1") < v4("10.0.0.2"));
    }

    #[test]
    fn test_display_compact_v6() {
        let a: Address = "2001:0DB8:0000:0000:0000:0000:0000:0001".parse().unwrap();
        assert_eq!(a.to_string(), "2001:db8::1");
        assert!("300.1.1.1".parse::<Address>().is_err());
        assert!(Address::new(Family::Ipv4, 1 << 32).is_err());
    }
}
