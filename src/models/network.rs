//! Persisted network and identifier-counter objects.

use super::{Cidr, Interval, NetworkState};
use crate::config::{MPLS_MIN_LABEL, VNI_MAX, VNI_MIN};
use num_bigint::{BigInt, BigUint};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of network identifier handed out by a counter.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Vxlan,
    Geneve,
    Mpls,
    /// Unbounded signed identifiers.
    #[default]
    Generic,
}

impl NetworkType {
    /// The vacant list of a fresh counter for this type.
    pub fn initial_range(self) -> Interval {
        match self {
            NetworkType::Vxlan | NetworkType::Geneve => {
                Interval::Range(BigInt::from(VNI_MIN), BigInt::from(VNI_MAX))
            }
            NetworkType::Mpls => Interval::AtLeast(BigInt::from(MPLS_MIN_LABEL)),
            NetworkType::Generic => Interval::All,
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NetworkType::Vxlan => "vxlan",
            NetworkType::Geneve => "geneve",
            NetworkType::Mpls => "mpls",
            NetworkType::Generic => "generic",
        };
        write!(f, "{s}")
    }
}

impl FromStr for NetworkType {
    type Err = String;

    fn from_str(s: &str) -> Result<NetworkType, String> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vxlan" => Ok(NetworkType::Vxlan),
            "geneve" => Ok(NetworkType::Geneve),
            "mpls" => Ok(NetworkType::Mpls),
            "generic" => Ok(NetworkType::Generic),
            other => Err(format!("unknown network type {other}")),
        }
    }
}

/// Requested shape of a network.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkSpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub network_type: Option<NetworkType>,
    /// Requested identifier; proposed by the counter when absent.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::decimal::option"
    )]
    pub id: Option<BigInt>,
}

/// Observed state of a network: its root ranges and their capacities.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkStatus {
    #[serde(default)]
    pub ipv4_ranges: Vec<Cidr>,
    #[serde(default)]
    pub ipv6_ranges: Vec<Cidr>,
    #[serde(default, with = "crate::models::decimal")]
    pub ipv4_capacity: BigUint,
    #[serde(default, with = "crate::models::decimal")]
    pub ipv6_capacity: BigUint,
    /// Identifier reserved for the network.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::models::decimal::option"
    )]
    pub reserved: Option<BigInt>,
    #[serde(default)]
    pub state: NetworkState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A named network object as stored by the control plane.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Network {
    pub name: String,
    #[serde(default)]
    pub spec: NetworkSpec,
    #[serde(default)]
    pub status: NetworkStatus,
}

/// Persisted identifier counter.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct CounterDoc {
    #[serde(rename = "type", default)]
    pub network_type: NetworkType,
    #[serde(default)]
    pub vacant: Vec<Interval>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_ranges() {
        assert_eq!(
            NetworkType::Vxlan.initial_range(),
            Interval::Range(BigInt::from(100), BigInt::from((1 << 24) - 1))
        );
        assert_eq!(NetworkType::Geneve.initial_range(), NetworkType::Vxlan.initial_range());
        assert_eq!(NetworkType::Mpls.initial_range(), Interval::AtLeast(BigInt::from(16)));
        assert_eq!(NetworkType::Generic.initial_range(), Interval::All);
    }

    #[test]
    fn test_network_type_text() {
        assert_eq!("VXLAN".parse::<NetworkType>().unwrap(), NetworkType::Vxlan);
        assert_eq!(NetworkType::Mpls.to_string(), "mpls");
        assert!("ethernet".parse::<NetworkType>().is_err());
    }

    #[test]
    fn test_network_json() {
        let json = r#"{"name": "overlay", "spec": {"type": "geneve", "id": "4242"}}"#;
        let network: Network = serde_json::from_str(json).unwrap();
        assert_eq!(network.spec.network_type, Some(NetworkType::Geneve));
        assert_eq!(network.spec.id, Some(BigInt::from(4242)));
        assert!(network.status.ipv4_ranges.is_empty());
        assert_eq!(network.status.ipv6_capacity, BigUint::default());

        let out = serde_json::to_value(&network).unwrap();
        assert_eq!(out["status"]["ipv4_capacity"], "0");
        assert_eq!(out["spec"]["id"], "4242");
    }

    #[test]
    fn test_bare_big_ids() {
        let json = r#"{"type": "mpls", "id": 123456789012345678901234567890}"#;
        let spec: NetworkSpec = serde_json::from_str(json).unwrap();
        let expected: BigInt = "123456789012345678901234567890".parse().unwrap();
        assert_eq!(spec.id, Some(expected));

        let json = r#"{"type": "generic", "id": -9223372036854775809}"#;
        let spec: NetworkSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.id, Some(BigInt::from(i64::MIN) - 1));

        let json = r#"{"type": "mpls", "vacant": [{"begin": 18446744073709551616}]}"#;
        let doc: CounterDoc = serde_json::from_str(json).unwrap();
        assert_eq!(doc.vacant, vec![Interval::AtLeast(BigInt::from(u64::MAX) + 1)]);
    }
}
