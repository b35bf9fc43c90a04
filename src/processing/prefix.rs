//! Prefix allocator: the vacant list of a root CIDR.
//!
//! The vacant list is kept sorted by first address, pairwise disjoint and
//! fully joined (no two siblings of equal length side by side). Reserving
//! replaces the covering block by the minimal cover of what is left;
//! releasing inserts the block and fuses it upwards with its siblings.

use crate::error::{IpamError, Result};
use crate::models::Cidr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixAllocator {
    root: Cidr,
    vacant: Vec<Cidr>,
}

impl PrefixAllocator {
    /// A fresh allocator with the whole root vacant.
    pub fn new(root: Cidr) -> PrefixAllocator {
        PrefixAllocator {
            root,
            vacant: vec![root],
        }
    }

    /// Rebuild an allocator from a persisted vacant list.
    ///
    /// The list must be ascending, disjoint, inside `root` and fully joined.
    pub fn from_parts(root: Cidr, vacant: Vec<Cidr>) -> Result<PrefixAllocator> {
        for block in &vacant {
            if !root.contains(block) {
                return Err(IpamError::Invalid(format!(
                    "vacant block {block} is outside root {root}"
                )));
            }
        }
        for pair in vacant.windows(2) {
            if !pair[0].is_before(&pair[1]) {
                return Err(IpamError::Invalid(format!(
                    "vacant blocks {} and {} are unsorted or overlap",
                    pair[0], pair[1]
                )));
            }
            if pair[0].can_join(&pair[1]) {
                return Err(IpamError::Invalid(format!(
                    "vacant blocks {} and {} should be joined",
                    pair[0], pair[1]
                )));
            }
        }
        Ok(PrefixAllocator { root, vacant })
    }

    pub fn root(&self) -> Cidr {
        self.root
    }

    pub fn vacant(&self) -> &[Cidr] {
        &self.vacant
    }

    /// True when nothing is vacant.
    pub fn is_exhausted(&self) -> bool {
        self.vacant.is_empty()
    }

    /// True when nothing is reserved.
    pub fn is_untouched(&self) -> bool {
        self.vacant.len() == 1 && self.vacant[0] == self.root
    }

    fn check_family(&self, cidr: &Cidr) -> Result<()> {
        if cidr.family() != self.root.family() {
            return Err(IpamError::FamilyMismatch {
                expected: self.root.family(),
                found: cidr.family(),
            });
        }
        Ok(())
    }

    // Number of vacant blocks starting at or before `cidr`.
    fn blocks_up_to(&self, cidr: &Cidr) -> usize {
        let key = cidr.first().bits();
        self.vacant.partition_point(|v| v.first().bits() <= key)
    }

    // The one vacant block that can cover `cidr`, if any.
    fn covering(&self, cidr: &Cidr) -> Option<usize> {
        let idx = self.blocks_up_to(cidr).checked_sub(1)?;
        self.vacant[idx].contains(cidr).then_some(idx)
    }

    /// True iff some vacant block contains `cidr`.
    pub fn can_reserve(&self, cidr: &Cidr) -> bool {
        cidr.family() == self.root.family() && self.covering(cidr).is_some()
    }

    /// Take `cidr` out of the vacant list.
    pub fn reserve(&mut self, cidr: &Cidr) -> Result<()> {
        self.check_family(cidr)?;
        let idx = self.covering(cidr).ok_or(IpamError::NoCover(*cidr))?;
        let covering = self.vacant[idx];
        let rest = covering.reserve(cidr)?;
        log::trace!("reserve {cidr}: {covering} -> {} blocks", rest.len());
        self.vacant.splice(idx..=idx, rest);
        log::debug!(
            "reserved {cidr} in {}, {} vacant blocks",
            self.root,
            self.vacant.len()
        );
        Ok(())
    }

    // Insert position for `cidr`, or why it cannot be released.
    fn release_position(&self, cidr: &Cidr) -> Result<usize> {
        self.check_family(cidr)?;
        if !self.root.contains(cidr) {
            return Err(IpamError::NotContained {
                root: self.root,
                cidr: *cidr,
            });
        }
        let idx = self.blocks_up_to(cidr);
        let before = idx.checked_sub(1).map(|i| &self.vacant[i]);
        let after = self.vacant.get(idx);
        if before.into_iter().chain(after).any(|v| v.overlaps(cidr)) {
            return Err(IpamError::Overlaps(*cidr));
        }
        Ok(idx)
    }

    /// True iff `cidr` lies in the root and overlaps no vacant block.
    pub fn can_release(&self, cidr: &Cidr) -> bool {
        self.release_position(cidr).is_ok()
    }

    /// Return `cidr` to the vacant list, fusing siblings.
    pub fn release(&mut self, cidr: &Cidr) -> Result<()> {
        let mut idx = self.release_position(cidr)?;
        self.vacant.insert(idx, *cidr);

        // A left block may only fuse with its right neighbour, a right block
        // with its left neighbour.
        loop {
            let current = self.vacant[idx];
            if current.is_left() {
                let Some(parent) = self.vacant.get(idx + 1).and_then(|n| current.join(n)) else {
                    break;
                };
                self.vacant[idx] = parent;
                self.vacant.remove(idx + 1);
            } else if current.is_right() && idx > 0 {
                let Some(parent) = current.join(&self.vacant[idx - 1]) else {
                    break;
                };
                self.vacant[idx - 1] = parent;
                self.vacant.remove(idx);
                idx -= 1;
            } else {
                break;
            }
            log::trace!("release {cidr}: fused into {}", self.vacant[idx]);
        }
        log::debug!(
            "released {cidr} in {}, {} vacant blocks",
            self.root,
            self.vacant.len()
        );
        Ok(())
    }

    /// First vacant block among those with the longest prefix `<= bits`.
    pub fn smallest_fit(&self, bits: u8) -> Option<&Cidr> {
        let mut best: Option<&Cidr> = None;
        for block in self.vacant.iter().filter(|v| v.prefix_len() <= bits) {
            match best {
                Some(b) if b.prefix_len() >= block.prefix_len() => {}
                _ => best = Some(block),
            }
            if block.prefix_len() == bits {
                break;
            }
        }
        best
    }
}
