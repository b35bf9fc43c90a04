//! Persisted subnet object and its locality.

use super::{Address, Cidr, SubnetState};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A region a subnet is spread over, with its availability zones.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Region {
    /// Region name.
    pub name: String,
    /// Availability zones used within the region.
    #[serde(default)]
    pub availability_zones: Vec<String>,
}

impl Region {
    pub fn new(name: &str, zones: &[&str]) -> Region {
        Region {
            name: name.to_string(),
            availability_zones: zones.iter().map(|z| z.to_string()).collect(),
        }
    }
}

/// How widely a subnet is spread.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Locality {
    /// One region, one availability zone.
    Local,
    /// One region, several availability zones.
    Regional,
    /// Several regions.
    Multiregional,
}

impl fmt::Display for Locality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Locality::Local => "Local",
            Locality::Regional => "Regional",
            Locality::Multiregional => "Multiregional",
        };
        write!(f, "{s}")
    }
}

/// Locality of a region list; `None` when no region or zone is given.
pub fn locality(regions: &[Region]) -> Option<Locality> {
    match regions {
        [] => None,
        [only] => match only.availability_zones.len() {
            0 => None,
            1 => Some(Locality::Local),
            _ => Some(Locality::Regional),
        },
        _ => Some(Locality::Multiregional),
    }
}

/// Requested shape of a subnet.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SubnetSpec {
    /// Exact block to take.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr: Option<Cidr>,
    /// Prefix length to carve from the parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_bits: Option<u8>,
    /// Number of addresses to carve from the parent, rounded up to a power of two.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::decimal::option"
    )]
    pub capacity: Option<BigUint>,
    /// Name of the parent subnet; `None` for a top-level subnet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Name of the network the subnet belongs to.
    pub network: String,
    /// Regions the subnet spans.
    #[serde(default)]
    pub regions: Vec<Region>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<Address>,
    /// Reference to the object consuming this subnet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer: Option<String>,
}

/// Observed allocation state of a subnet.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SubnetStatus {
    /// Block reserved for this subnet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved: Option<Cidr>,
    /// Unreserved blocks of `reserved`, ascending and fully joined.
    #[serde(default)]
    pub vacant: Vec<Cidr>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::decimal::option"
    )]
    pub capacity: Option<BigUint>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::decimal::option"
    )]
    pub capacity_left: Option<BigUint>,
    #[serde(default)]
    pub state: SubnetState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A named subnet object as stored by the control plane.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Subnet {
    pub name: String,
    pub spec: SubnetSpec,
    #[serde(default)]
    pub status: SubnetStatus,
}

impl Subnet {
    /// True when the subnet has no parent.
    pub fn is_top_level(&self) -> bool {
        self.spec.parent.is_none()
    }

    pub fn locality(&self) -> Option<Locality> {
        locality(&self.spec.regions)
    }
}
