//! CIDR prefixes and their algebra: containment, ordering, split, join and
//! the reserve covering used by the prefix allocator.

use super::address::{broadcast_addr, cut_addr, Address, Family};
use crate::error::{IpamError, Result};
use num_bigint::BigUint;
use num_traits::One;
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A canonical network prefix: address with every host bit cleared, plus
/// the prefix length.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Cidr {
    addr: Address,
    len: u8,
}

impl Cidr {
    /// Build a CIDR, clearing any host bits of `addr`.
    pub fn new(addr: Address, len: u8) -> Result<Cidr> {
        let addr = cut_addr(addr, len)?;
        Ok(Cidr { addr, len })
    }

    /// The single-address prefix of `addr` (`/32` or `/128`).
    pub fn host(addr: Address) -> Cidr {
        Cidr {
            addr,
            len: addr.family().bits(),
        }
    }

    /// Parse `<ip>/<len>`; host bits are accepted and cleared.
    ///
    /// # Examples
    /// ```
    /// use subnet_ipam::models::Cidr;
    /// let c = Cidr::parse("192.168.1.7/30").unwrap();
    /// assert_eq!(c.to_string(), "192.168.1.4/30");
    /// ```
    pub fn parse(s: &str) -> Result<Cidr> {
        let s = s.trim();
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 2 {
            return Err(IpamError::BadFormat(format!("invalid CIDR {s}")));
        }
        let addr: Address = parts[0].parse()?;
        let digits = parts[1];
        let canonical = !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
            && (digits == "0" || !digits.starts_with('0'));
        if !canonical {
            return Err(IpamError::BadFormat(format!("invalid prefix length in {s}")));
        }
        let len: u8 = digits
            .parse()
            .map_err(|_| IpamError::BadFormat(format!("invalid prefix length in {s}")))?;
        if len > addr.family().bits() {
            return Err(IpamError::BadFormat(format!("prefix length too long in {s}")));
        }
        Cidr::new(addr, len)
    }

    pub fn family(&self) -> Family {
        self.addr.family()
    }

    pub fn prefix_len(&self) -> u8 {
        self.len
    }

    /// 32 or 128 depending on the family.
    pub fn mask_bits(&self) -> u8 {
        self.family().bits()
    }

    /// Number of host bits; `capacity == 2^size_log2`.
    pub fn size_log2(&self) -> u8 {
        self.mask_bits() - self.len
    }

    /// Lowest address of the prefix.
    pub fn first(&self) -> Address {
        self.addr
    }

    /// Highest address of the prefix.
    pub fn last(&self) -> Address {
        // len is always valid for the family
        broadcast_addr(self.addr, self.len).unwrap_or(self.addr)
    }

    /// Number of addresses in the prefix, `2^(mask_bits - len)`.
    pub fn capacity(&self) -> BigUint {
        BigUint::one() << self.size_log2() as usize
    }

    pub fn contains(&self, child: &Cidr) -> bool {
        self.family() == child.family()
            && self.len <= child.len
            && cut_addr(child.addr, self.len).map_or(false, |a| a == self.addr)
    }

    pub fn contains_address(&self, addr: &Address) -> bool {
        self.contains(&Cidr::host(*addr))
    }

    /// Two aligned prefixes overlap exactly when one contains the other.
    pub fn overlaps(&self, other: &Cidr) -> bool {
        self.contains(other) || other.contains(self)
    }

    /// `last(self) < first(other)`; false across families.
    pub fn is_before(&self, other: &Cidr) -> bool {
        self.family() == other.family() && self.last().bits() < other.first().bits()
    }

    pub fn is_after(&self, other: &Cidr) -> bool {
        other.is_before(self)
    }

    // Bit (len - 1) counted from the most significant end.
    fn side_bit(&self) -> Option<bool> {
        if self.len == 0 {
            return None;
        }
        let shift = self.mask_bits() - self.len;
        Some((self.addr.bits() >> shift) & 1 == 1)
    }

    /// True when this is the lower child of its parent.
    pub fn is_left(&self) -> bool {
        self.side_bit() == Some(false)
    }

    /// True when this is the upper child of its parent.
    pub fn is_right(&self) -> bool {
        self.side_bit() == Some(true)
    }

    /// The enclosing prefix one bit shorter.
    pub fn parent(&self) -> Option<Cidr> {
        if self.len == 0 {
            return None;
        }
        Cidr::new(self.addr, self.len - 1).ok()
    }

    /// The other child of this prefix's parent.
    pub fn sibling(&self) -> Option<Cidr> {
        self.side_bit()?;
        let flip = 1u128 << (self.mask_bits() - self.len);
        Some(Cidr {
            addr: Address::new(self.family(), self.addr.bits() ^ flip).ok()?,
            len: self.len,
        })
    }

    /// True iff `self` and `other` are the two children of one parent.
    /// Symmetric.
    pub fn can_join(&self, other: &Cidr) -> bool {
        self.family() == other.family()
            && self.len == other.len
            && self.len >= 1
            && self != other
            && self.parent() == other.parent()
    }

    /// The common parent when [`Cidr::can_join`] holds.
    pub fn join(&self, other: &Cidr) -> Option<Cidr> {
        if self.can_join(other) {
            self.parent()
        } else {
            None
        }
    }

    /// The two children one bit longer, lower first.
    pub fn split(&self) -> Option<(Cidr, Cidr)> {
        if self.len >= self.mask_bits() {
            return None;
        }
        let len = self.len + 1;
        let right_bit = 1u128 << (self.mask_bits() - len);
        let left = Cidr {
            addr: self.addr,
            len,
        };
        let right = Cidr {
            addr: Address::new(self.family(), self.addr.bits() | right_bit).ok()?,
            len,
        };
        Some((left, right))
    }

    /// Minimal aligned cover of `self \ inner`, ascending.
    ///
    /// Walks from `self` down towards `inner`, splitting at each level and
    /// keeping the half that does not hold `inner`. The result has exactly
    /// `inner.len - self.len` elements.
    ///
    /// # Examples
    /// ```
    /// use subnet_ipam::models::Cidr;
    /// let outer = Cidr::parse("10.0.0.0/30").unwrap();
    /// let inner = Cidr::parse("10.0.0.1/32").unwrap();
    /// let rest = outer.reserve(&inner).unwrap();
    /// let expected = ["10.0.0.0/32", "10.0.0.2/31"].map(|s| Cidr::parse(s).unwrap());
    /// assert_eq!(rest, expected);
    /// ```
    pub fn reserve(&self, inner: &Cidr) -> Result<Vec<Cidr>> {
        if self.family() != inner.family() {
            return Err(IpamError::FamilyMismatch {
                expected: self.family(),
                found: inner.family(),
            });
        }
        if !self.contains(inner) {
            return Err(IpamError::NotContained {
                root: *self,
                cidr: *inner,
            });
        }

        // Lower halves are met in ascending order, upper halves descending.
        let mut below = Vec::new();
        let mut above = Vec::new();
        let mut current = *self;
        while current != *inner {
            let (left, right) = match current.split() {
                Some(halves) => halves,
                None => break,
            };
            if left.contains(inner) {
                above.push(right);
                current = left;
            } else {
                below.push(left);
                current = right;
            }
            log::trace!("reserve {inner} in {self}: descend to {current}");
        }
        below.extend(above.into_iter().rev());
        Ok(below)
    }
}

impl FromStr for Cidr {
    type Err = IpamError;

    fn from_str(s: &str) -> Result<Cidr> {
        Cidr::parse(s)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.len)
    }
}

/// Same-family prefixes order by first address, then by length; prefixes
/// of different families are unordered.
impl PartialOrd for Cidr {
    fn partial_cmp(&self, other: &Cidr) -> Option<Ordering> {
        if self.family() != other.family() {
            return None;
        }
        Some(
            self.addr
                .bits()
                .cmp(&other.addr.bits())
                .then(self.len.cmp(&other.len)),
        )
    }
}

impl Serialize for Cidr {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cidr {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Cidr, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Cidr::parse(&s).map_err(de::Error::custom)
    }
}
