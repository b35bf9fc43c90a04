//! Persisted single-address object.

use super::{Address, IpState};
use serde::{Deserialize, Serialize};

/// Requested address.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct IpSpec {
    /// Name of the subnet to draw from.
    pub subnet: String,
    /// Exact address to take; the first free one is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct IpStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved: Option<Address>,
    #[serde(default)]
    pub state: IpState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Ip {
    pub name: String,
    pub spec: IpSpec,
    #[serde(default)]
    pub status: IpStatus,
}
