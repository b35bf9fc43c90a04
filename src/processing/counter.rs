//! Identifier counter: a sorted list of disjoint, non-touching intervals of
//! vacant identifiers over the unbounded integers.

use crate::error::{IpamError, Result};
use crate::models::{CounterDoc, Interval, NetworkType};
use num_bigint::BigInt;
use num_traits::{One, Zero};
use std::fmt;

/// Lifecycle of a counter. `Exhausted` is left again on release.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CounterState {
    Active,
    Exhausted,
}

impl fmt::Display for CounterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterState::Active => write!(f, "Active"),
            CounterState::Exhausted => write!(f, "Exhausted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    vacant: Vec<Interval>,
}

impl Counter {
    /// A fresh counter with the full identifier range of `network_type`.
    pub fn for_type(network_type: NetworkType) -> Counter {
        Counter {
            vacant: vec![network_type.initial_range()],
        }
    }

    /// Rebuild from a persisted vacant list, which must be ascending with a
    /// gap of at least one identifier between neighbours. A `Range` must
    /// hold at least two identifiers; a single one is `Exact`.
    pub fn from_vacant(vacant: Vec<Interval>) -> Result<Counter> {
        if let Some(bad) = vacant
            .iter()
            .find(|iv| matches!(iv, Interval::Range(begin, end) if begin >= end))
        {
            return Err(IpamError::Invalid(format!(
                "interval {bad} is empty or a single identifier"
            )));
        }
        for pair in vacant.windows(2) {
            let ordered = match (pair[0].upper(), pair[1].lower()) {
                (Some(end), Some(begin)) => end + BigInt::one() < *begin,
                _ => false,
            };
            if !ordered {
                return Err(IpamError::Invalid(format!(
                    "intervals {} and {} overlap, touch or are unsorted",
                    pair[0], pair[1]
                )));
            }
        }
        Ok(Counter { vacant })
    }

    pub fn from_doc(doc: &CounterDoc) -> Result<Counter> {
        Counter::from_vacant(doc.vacant.clone())
    }

    pub fn to_doc(&self, network_type: NetworkType) -> CounterDoc {
        CounterDoc {
            network_type,
            vacant: self.vacant.clone(),
        }
    }

    pub fn vacant(&self) -> &[Interval] {
        &self.vacant
    }

    pub fn state(&self) -> CounterState {
        if self.vacant.is_empty() {
            CounterState::Exhausted
        } else {
            CounterState::Active
        }
    }

    /// True when nothing is reserved, i.e. the counter may be destroyed.
    pub fn is_pristine(&self, network_type: NetworkType) -> bool {
        self.vacant.len() == 1 && self.vacant[0] == network_type.initial_range()
    }

    // Number of intervals lying entirely below `n`.
    fn below(&self, n: &BigInt) -> usize {
        self.vacant.partition_point(|iv| iv.is_below(n))
    }

    /// Smallest representable member of the first interval.
    pub fn propose(&self) -> Result<BigInt> {
        let first = self.vacant.first().ok_or(IpamError::Empty)?;
        let proposal = match first {
            Interval::Exact(n) => n.clone(),
            _ => first
                .lower()
                .or_else(|| first.upper())
                .cloned()
                .unwrap_or_else(BigInt::zero),
        };
        Ok(proposal)
    }

    pub fn contains(&self, n: &BigInt) -> bool {
        self.vacant
            .get(self.below(n))
            .map_or(false, |iv| iv.contains(n))
    }

    /// Take `n` out of its vacant interval.
    pub fn reserve(&mut self, n: &BigInt) -> Result<()> {
        let idx = self.below(n);
        let covering = match self.vacant.get(idx) {
            Some(iv) if iv.contains(n) => iv.clone(),
            _ => {
                log::warn!("identifier {n} is not free");
                return Err(IpamError::NotFree(n.clone()));
            }
        };
        let left = match covering.lower() {
            Some(lo) if lo >= n => None,
            lo => Interval::from_bounds(lo.cloned(), Some(n - BigInt::one())),
        };
        let right = match covering.upper() {
            Some(hi) if hi <= n => None,
            hi => Interval::from_bounds(Some(n + BigInt::one()), hi.cloned()),
        };
        let pieces: Vec<Interval> = left.into_iter().chain(right).collect();
        log::trace!("reserve {n}: {covering} -> {} pieces", pieces.len());
        self.vacant.splice(idx..=idx, pieces);
        log::debug!("reserved identifier {n}, {} vacant intervals", self.vacant.len());
        Ok(())
    }

    /// Return `n`, extending or fusing its neighbouring intervals.
    pub fn release(&mut self, n: &BigInt) -> Result<()> {
        if self.contains(n) {
            log::warn!("identifier {n} is already free");
            return Err(IpamError::AlreadyFree(n.clone()));
        }
        let idx = self.below(n);
        let left = idx.checked_sub(1).map(|i| &self.vacant[i]);
        let right = self.vacant.get(idx);
        let joins_left = left.map_or(false, |iv| can_join_left(iv, n));
        let joins_right = right.map_or(false, |iv| can_join_right(iv, n));

        match (joins_left, joins_right) {
            (true, true) => {
                let lo = self.vacant[idx - 1].lower().cloned();
                let hi = self.vacant[idx].upper().cloned();
                if let Some(fused) = Interval::from_bounds(lo, hi) {
                    self.vacant.splice(idx - 1..=idx, [fused]);
                }
            }
            (true, false) => {
                let lo = self.vacant[idx - 1].lower().cloned();
                if let Some(grown) = Interval::from_bounds(lo, Some(n.clone())) {
                    self.vacant[idx - 1] = grown;
                }
            }
            (false, true) => {
                let hi = self.vacant[idx].upper().cloned();
                if let Some(grown) = Interval::from_bounds(Some(n.clone()), hi) {
                    self.vacant[idx] = grown;
                }
            }
            (false, false) => self.vacant.insert(idx, Interval::Exact(n.clone())),
        }
        log::debug!("released identifier {n}, {} vacant intervals", self.vacant.len());
        Ok(())
    }
}

/// True when `interval` ends right before `n`.
fn can_join_left(interval: &Interval, n: &BigInt) -> bool {
    interval.upper().map_or(false, |end| end + BigInt::one() == *n)
}

/// True when `interval` starts right after `n`.
fn can_join_right(interval: &Interval, n: &BigInt) -> bool {
    interval.lower().map_or(false, |begin| *begin == n + BigInt::one())
}
