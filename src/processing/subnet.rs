//! Subnet tracker: a prefix allocator plus capacity accounting and the
//! proposal policy for child blocks and single addresses.

use super::PrefixAllocator;
use crate::error::{IpamError, Result};
use crate::models::{Address, Cidr, Family, SubnetState, SubnetStatus};
use num_bigint::BigUint;
use num_traits::{One, Zero};

/// Prefix length whose capacity is `n` rounded up to a power of two.
///
/// # Examples
/// ```
/// use num_bigint::BigUint;
/// use subnet_ipam::models::Family;
/// use subnet_ipam::processing::prefix_for_capacity;
/// assert_eq!(prefix_for_capacity(Family::Ipv4, &BigUint::from(5u32)).unwrap(), 29);
/// ```
pub fn prefix_for_capacity(family: Family, n: &BigUint) -> Result<u8> {
    if n.is_zero() {
        return Err(IpamError::InvalidCapacity(n.clone()));
    }
    // ceil(log2(n)) is the bit length of n - 1
    let log2 = (n - BigUint::one()).bits();
    if log2 > family.bits() as u64 {
        return Err(IpamError::InvalidCapacity(n.clone()));
    }
    Ok(family.bits() - log2 as u8)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetTracker {
    allocator: PrefixAllocator,
    capacity: BigUint,
    capacity_left: BigUint,
    state: SubnetState,
}

impl SubnetTracker {
    /// Start tracking `root` with everything vacant.
    pub fn fill_from(root: Cidr) -> SubnetTracker {
        let capacity = root.capacity();
        SubnetTracker {
            allocator: PrefixAllocator::new(root),
            capacity_left: capacity.clone(),
            capacity,
            state: SubnetState::Allocated,
        }
    }

    /// Rebuild a tracker from a persisted status.
    ///
    /// `capacity_left` is recomputed from the vacant list; a stored value
    /// that disagrees is rejected.
    pub fn from_status(status: &SubnetStatus) -> Result<SubnetTracker> {
        let root = status
            .reserved
            .ok_or_else(|| IpamError::Invalid("subnet has no reserved block".to_string()))?;
        let allocator = PrefixAllocator::from_parts(root, status.vacant.clone())?;
        let capacity_left: BigUint = allocator.vacant().iter().map(|v| v.capacity()).sum();
        if let Some(stored) = &status.capacity_left {
            if *stored != capacity_left {
                return Err(IpamError::Invalid(format!(
                    "capacity_left {stored} does not match vacant blocks ({capacity_left})"
                )));
            }
        }
        Ok(SubnetTracker {
            allocator,
            capacity: root.capacity(),
            capacity_left,
            state: status.state,
        })
    }

    /// Store the tracked state into `status`; `message` is left as is.
    pub fn write_status(&self, status: &mut SubnetStatus) {
        status.reserved = Some(self.root());
        status.vacant = self.allocator.vacant().to_vec();
        status.capacity = Some(self.capacity.clone());
        status.capacity_left = Some(self.capacity_left.clone());
        status.state = self.state;
    }

    pub fn root(&self) -> Cidr {
        self.allocator.root()
    }

    pub fn family(&self) -> Family {
        self.root().family()
    }

    pub fn mask_bits(&self) -> u8 {
        self.root().mask_bits()
    }

    pub fn vacant(&self) -> &[Cidr] {
        self.allocator.vacant()
    }

    pub fn capacity(&self) -> &BigUint {
        &self.capacity
    }

    pub fn capacity_left(&self) -> &BigUint {
        &self.capacity_left
    }

    /// Number of addresses reserved so far.
    pub fn used(&self) -> BigUint {
        &self.capacity - &self.capacity_left
    }

    pub fn state(&self) -> SubnetState {
        self.state
    }

    /// True when nothing has been reserved from the subnet.
    pub fn is_untouched(&self) -> bool {
        self.allocator.is_untouched()
    }

    pub fn can_reserve(&self, cidr: &Cidr) -> bool {
        self.allocator.can_reserve(cidr)
    }

    pub fn reserve(&mut self, cidr: &Cidr) -> Result<()> {
        self.allocator.reserve(cidr)?;
        self.capacity_left -= cidr.capacity();
        Ok(())
    }

    pub fn can_release(&self, cidr: &Cidr) -> bool {
        self.allocator.can_release(cidr)
    }

    pub fn release(&mut self, cidr: &Cidr) -> Result<()> {
        self.allocator.release(cidr)?;
        self.capacity_left += cidr.capacity();
        Ok(())
    }

    /// Propose a free block of prefix length `bits`.
    ///
    /// Picks the smallest vacant block that can hold it (longest prefix
    /// `<= bits`), first in address order on ties, and anchors the proposal
    /// at its first address. Nothing is reserved.
    pub fn propose_by_bits(&self, bits: u8) -> Result<Cidr> {
        if bits > self.mask_bits() {
            return Err(IpamError::InvalidPrefix(bits));
        }
        let candidate = self
            .allocator
            .smallest_fit(bits)
            .ok_or(IpamError::Exhausted(bits))?;
        let proposal = Cidr::new(candidate.first(), bits)?;
        log::debug!("propose /{bits} in {}: {proposal}", self.root());
        Ok(proposal)
    }

    /// Propose a free block holding at least `n` addresses.
    pub fn propose_by_capacity(&self, n: &BigUint) -> Result<Cidr> {
        let bits = prefix_for_capacity(self.family(), n)?;
        self.propose_by_bits(bits)
    }

    /// Propose the first free single address.
    pub fn propose_address(&self) -> Result<Address> {
        self.propose_by_bits(self.mask_bits()).map(|c| c.first())
    }

    pub fn reserve_address(&mut self, addr: &Address) -> Result<()> {
        self.reserve(&Cidr::host(*addr))
    }

    pub fn release_address(&mut self, addr: &Address) -> Result<()> {
        self.release(&Cidr::host(*addr))
    }
}
