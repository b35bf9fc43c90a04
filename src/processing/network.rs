//! Network aggregate: the disjoint root CIDRs of a network, per family,
//! with their capacity totals.

use super::SubnetTracker;
use crate::error::{IpamError, Result};
use crate::models::{Cidr, Family, NetworkStatus};
use num_bigint::BigUint;

/// Sorted, pairwise disjoint roots of one family.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RootList {
    roots: Vec<Cidr>,
    capacity: BigUint,
}

impl RootList {
    pub fn roots(&self) -> &[Cidr] {
        &self.roots
    }

    /// Sum of the capacities of all roots.
    pub fn capacity(&self) -> &BigUint {
        &self.capacity
    }

    // Number of roots starting at or before `cidr`.
    fn roots_up_to(&self, cidr: &Cidr) -> usize {
        let key = cidr.first().bits();
        self.roots.partition_point(|r| r.first().bits() <= key)
    }

    fn insert_position(&self, cidr: &Cidr) -> Result<usize> {
        let idx = self.roots_up_to(cidr);
        let before = idx.checked_sub(1).map(|i| &self.roots[i]);
        let after = self.roots.get(idx);
        if let Some(hit) = before.into_iter().chain(after).find(|r| r.overlaps(cidr)) {
            log::warn!("root {cidr} overlaps listed root {hit}");
            return Err(IpamError::OverlappingRoot(*cidr));
        }
        Ok(idx)
    }

    fn reserve(&mut self, cidr: &Cidr) -> Result<()> {
        let idx = self.insert_position(cidr)?;
        self.roots.insert(idx, *cidr);
        self.capacity += cidr.capacity();
        Ok(())
    }

    fn release(&mut self, cidr: &Cidr) -> Result<()> {
        let idx = self
            .roots
            .iter()
            .position(|r| r == cidr)
            .ok_or(IpamError::NotFound(*cidr))?;
        self.roots.remove(idx);
        self.capacity -= cidr.capacity();
        Ok(())
    }

    /// The listed root containing `cidr`.
    fn find(&self, cidr: &Cidr) -> Option<Cidr> {
        let idx = self.roots_up_to(cidr).checked_sub(1)?;
        let root = self.roots[idx];
        root.contains(cidr).then_some(root)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkAggregate {
    ipv4: RootList,
    ipv6: RootList,
}

impl NetworkAggregate {
    pub fn new() -> NetworkAggregate {
        NetworkAggregate::default()
    }

    /// Rebuild from persisted ranges; they must be disjoint per family and
    /// the stored capacity totals must match them.
    pub fn from_status(status: &NetworkStatus) -> Result<NetworkAggregate> {
        let mut aggregate = NetworkAggregate::new();
        for (family, ranges, stored) in [
            (Family::Ipv4, &status.ipv4_ranges, &status.ipv4_capacity),
            (Family::Ipv6, &status.ipv6_ranges, &status.ipv6_capacity),
        ] {
            for range in ranges {
                if range.family() != family {
                    return Err(IpamError::FamilyMismatch {
                        expected: family,
                        found: range.family(),
                    });
                }
                aggregate.reserve(range)?;
            }
            let computed = &aggregate.list(family).capacity;
            if stored != computed {
                return Err(IpamError::Invalid(format!(
                    "{family} capacity {stored} does not match ranges ({computed})"
                )));
            }
        }
        Ok(aggregate)
    }

    /// Store ranges and capacities into `status`.
    pub fn write_status(&self, status: &mut NetworkStatus) {
        status.ipv4_ranges = self.ipv4.roots.clone();
        status.ipv6_ranges = self.ipv6.roots.clone();
        status.ipv4_capacity = self.ipv4.capacity.clone();
        status.ipv6_capacity = self.ipv6.capacity.clone();
    }

    fn list(&self, family: Family) -> &RootList {
        match family {
            Family::Ipv4 => &self.ipv4,
            Family::Ipv6 => &self.ipv6,
        }
    }

    fn list_mut(&mut self, family: Family) -> &mut RootList {
        match family {
            Family::Ipv4 => &mut self.ipv4,
            Family::Ipv6 => &mut self.ipv6,
        }
    }

    pub fn ipv4(&self) -> &RootList {
        &self.ipv4
    }

    pub fn ipv6(&self) -> &RootList {
        &self.ipv6
    }

    /// True when `cidr` can be added without overlapping a listed root.
    pub fn can_reserve(&self, cidr: &Cidr) -> bool {
        self.list(cidr.family()).insert_position(cidr).is_ok()
    }

    /// Add a root.
    pub fn reserve(&mut self, cidr: &Cidr) -> Result<()> {
        self.list_mut(cidr.family()).reserve(cidr)?;
        log::debug!("network root {cidr} added");
        Ok(())
    }

    /// Remove a root; it must be listed exactly.
    pub fn release(&mut self, cidr: &Cidr) -> Result<()> {
        self.list_mut(cidr.family()).release(cidr)?;
        log::debug!("network root {cidr} removed");
        Ok(())
    }

    /// The listed root that contains `cidr`, if any.
    pub fn find_root(&self, cidr: &Cidr) -> Option<Cidr> {
        self.list(cidr.family()).find(cidr)
    }

    /// A fresh tracker for a listed root.
    pub fn tracker(&self, root: &Cidr) -> Result<SubnetTracker> {
        if !self.list(root.family()).roots.contains(root) {
            return Err(IpamError::NotFound(*root));
        }
        Ok(SubnetTracker::fill_from(*root))
    }

    pub fn is_empty(&self) -> bool {
        self.ipv4.roots.is_empty() && self.ipv6.roots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(s: &str) -> Cidr {
        Cidr::parse(s).unwrap()
    }

    #[test]
    fn test_roots_sorted_with_capacity() {
        let mut net = NetworkAggregate::new();
        net.reserve(&c("192.168.1.0/24")).unwrap();
        net.reserve(&c("192.168.0.0/24")).unwrap();
        net.reserve(&c("fd00::/64")).unwrap();
        assert_eq!(net.ipv4().roots(), &[c("192.168.0.0/24"), c("192.168.1.0/24")]);
        assert_eq!(net.ipv4().capacity(), &BigUint::from(512u32));
        assert_eq!(net.ipv6().capacity(), &(BigUint::from(1u32) << 64usize));
    }

    #[test]
    fn test_overlapping_roots_rejected() {
        let mut net = NetworkAggregate::new();
        net.reserve(&c("10.0.0.0/16")).unwrap();
        for bad in ["10.0.0.0/16", "10.0.5.0/24", "10.0.0.0/8", "0.0.0.0/0"] {
            assert!(!net.can_reserve(&c(bad)));
            assert!(matches!(
                net.reserve(&c(bad)),
                Err(IpamError::OverlappingRoot(_))
            ));
        }
        assert!(net.can_reserve(&c("10.1.0.0/16")));
        assert_eq!(net.ipv4().roots().len(), 1);
    }

    #[test]
    fn test_release_exact_only() {
        let mut net = NetworkAggregate::new();
        net.reserve(&c("10.0.0.0/16")).unwrap();
        assert!(matches!(
            net.release(&c("10.0.0.0/24")),
            Err(IpamError::NotFound(_))
        ));
        net.release(&c("10.0.0.0/16")).unwrap();
        assert!(net.is_empty());
        assert_eq!(net.ipv4().capacity(), &BigUint::default());
    }

    #[test]
    fn test_find_root_and_tracker() {
        let mut net = NetworkAggregate::new();
        net.reserve(&c("10.0.0.0/16")).unwrap();
        net.reserve(&c("10.2.0.0/16")).unwrap();
        assert_eq!(net.find_root(&c("10.2.3.0/24")), Some(c("10.2.0.0/16")));
        assert_eq!(net.find_root(&c("10.1.3.0/24")), None);
        assert_eq!(net.find_root(&c("fd00::/64")), None);
        let t = net.tracker(&c("10.2.0.0/16")).unwrap();
        assert_eq!(t.root(), c("10.2.0.0/16"));
        assert!(net.tracker(&c("10.3.0.0/16")).is_err());
    }

    #[test]
    fn test_status_round_trip() {
        let mut net = NetworkAggregate::new();
        net.reserve(&c("10.0.0.0/8")).unwrap();
        net.reserve(&c("2001:db8::/32")).unwrap();
        let mut status = NetworkStatus::default();
        net.write_status(&mut status);
        assert_eq!(status.ipv4_capacity, BigUint::from(1u32 << 24));
        assert_eq!(NetworkAggregate::from_status(&status).unwrap(), net);

        status.ipv4_ranges.push(c("10.1.0.0/16"));
        assert!(NetworkAggregate::from_status(&status).is_err());
        status.ipv4_ranges = vec![c("fd00::/8")];
        assert!(matches!(
            NetworkAggregate::from_status(&status),
            Err(IpamError::FamilyMismatch { .. })
        ));
    }

    #[test]
    fn test_status_capacity_must_match() {
        let mut net = NetworkAggregate::new();
        net.reserve(&c("192.168.0.0/24")).unwrap();
        net.reserve(&c("fd00::/120")).unwrap();
        let mut status = NetworkStatus::default();
        net.write_status(&mut status);

        let mut stale = status.clone();
        stale.ipv4_capacity = BigUint::from(512u32);
        assert!(matches!(
            NetworkAggregate::from_status(&stale),
            Err(IpamError::Invalid(_))
        ));

        let mut stale = status.clone();
        stale.ipv6_capacity = BigUint::default();
        assert!(matches!(
            NetworkAggregate::from_status(&stale),
            Err(IpamError::Invalid(_))
        ));

        assert_eq!(NetworkAggregate::from_status(&status).unwrap(), net);
    }
}
