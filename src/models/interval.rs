//! Intervals over the unbounded signed integers, used by the identifier
//! counter.

use crate::error::{IpamError, Result};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-empty run of integers. Either end may be open.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval", into = "RawInterval")]
pub enum Interval {
    /// `[-inf, +inf]`
    All,
    /// `[-inf, end]`
    AtMost(BigInt),
    /// `[begin, +inf]`
    AtLeast(BigInt),
    /// `[begin, end]` with `begin < end`
    Range(BigInt, BigInt),
    /// `{exact}`
    Exact(BigInt),
}

impl Interval {
    /// Build the interval `[lo, hi]`, `None` meaning unbounded on that side.
    /// Returns `None` when the bounds describe an empty set.
    pub fn from_bounds(lo: Option<BigInt>, hi: Option<BigInt>) -> Option<Interval> {
        match (lo, hi) {
            (None, None) => Some(Interval::All),
            (None, Some(end)) => Some(Interval::AtMost(end)),
            (Some(begin), None) => Some(Interval::AtLeast(begin)),
            (Some(begin), Some(end)) if begin == end => Some(Interval::Exact(begin)),
            (Some(begin), Some(end)) if begin < end => Some(Interval::Range(begin, end)),
            _ => None,
        }
    }

    /// Lower bound, `None` for `-inf`.
    pub fn lower(&self) -> Option<&BigInt> {
        match self {
            Interval::All | Interval::AtMost(_) => None,
            Interval::AtLeast(begin) | Interval::Range(begin, _) => Some(begin),
            Interval::Exact(n) => Some(n),
        }
    }

    /// Upper bound, `None` for `+inf`.
    pub fn upper(&self) -> Option<&BigInt> {
        match self {
            Interval::All | Interval::AtLeast(_) => None,
            Interval::AtMost(end) | Interval::Range(_, end) => Some(end),
            Interval::Exact(n) => Some(n),
        }
    }

    pub fn contains(&self, n: &BigInt) -> bool {
        self.lower().map_or(true, |lo| lo <= n) && self.upper().map_or(true, |hi| n <= hi)
    }

    /// True when every member is smaller than `n`.
    pub fn is_below(&self, n: &BigInt) -> bool {
        self.upper().map_or(false, |hi| hi < n)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Interval::Exact(n) => write!(f, "{{{n}}}"),
            _ => {
                let lo = self.lower().map_or("-inf".to_string(), |n| n.to_string());
                let hi = self.upper().map_or("+inf".to_string(), |n| n.to_string());
                write!(f, "[{lo}, {hi}]")
            }
        }
    }
}

/// Persisted shape `{begin?, end?, exact?}`.
#[derive(Serialize, Deserialize, Debug, Default)]
struct RawInterval {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::decimal::option"
    )]
    begin: Option<BigInt>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::decimal::option"
    )]
    end: Option<BigInt>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::decimal::option"
    )]
    exact: Option<BigInt>,
}

impl TryFrom<RawInterval> for Interval {
    type Error = IpamError;

    fn try_from(raw: RawInterval) -> Result<Interval> {
        match raw.exact {
            Some(n) => {
                let agrees = |b: &Option<BigInt>| b.as_ref().map_or(true, |b| *b == n);
                if agrees(&raw.begin) && agrees(&raw.end) {
                    Ok(Interval::Exact(n))
                } else {
                    Err(IpamError::Invalid(format!(
                        "interval with exact {n} has conflicting bounds"
                    )))
                }
            }
            None => {
                let shown = format!("{:?}..{:?}", raw.begin, raw.end);
                Interval::from_bounds(raw.begin, raw.end)
                    .ok_or_else(|| IpamError::Invalid(format!("empty interval {shown}")))
            }
        }
    }
}

impl From<Interval> for RawInterval {
    fn from(interval: Interval) -> RawInterval {
        match interval {
            Interval::All => RawInterval::default(),
            Interval::AtMost(end) => RawInterval {
                end: Some(end),
                ..Default::default()
            },
            Interval::AtLeast(begin) => RawInterval {
                begin: Some(begin),
                ..Default::default()
            },
            Interval::Range(begin, end) => RawInterval {
                begin: Some(begin),
                end: Some(end),
                exact: None,
            },
            Interval::Exact(n) => RawInterval {
                exact: Some(n),
                ..Default::default()
            },
        }
    }
}
