//! Lifecycle state shared by the persisted objects.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Allocation state of a subnet, network or IP object.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum AllocationState {
    /// Not yet reconciled.
    #[default]
    Pending,
    /// Resources reserved and recorded in the status.
    Allocated,
    /// Reservation failed, see the status message.
    Failed,
}

pub type SubnetState = AllocationState;
pub type NetworkState = AllocationState;
pub type IpState = AllocationState;

impl fmt::Display for AllocationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AllocationState::Pending => "Pending",
            AllocationState::Allocated => "Allocated",
            AllocationState::Failed => "Failed",
        };
        write!(f, "{s}")
    }
}
