//! Request-level allocation: turn a subnet, IP or network request into
//! reservations on the owning tracker or counter.
//!
//! The `apply_*` helpers additionally record the outcome on the persisted
//! object: `Allocated` with the reserved resource, or `Failed` with the
//! error message and nothing reserved.

use super::{Counter, SubnetTracker};
use crate::error::{IpamError, Result};
use crate::models::{
    Address, AllocationState, Cidr, Ip, IpSpec, Network, NetworkSpec, Subnet, SubnetSpec,
};
use crate::processing::validate::id_in_range;
use num_bigint::BigInt;

/// The block a child request asks for, proposed from `parent` when sized by
/// capacity or prefix length.
pub fn resolve_child(parent: &SubnetTracker, spec: &SubnetSpec) -> Result<Cidr> {
    match (&spec.cidr, &spec.capacity, spec.prefix_bits) {
        (Some(cidr), None, None) => Ok(*cidr),
        (None, Some(capacity), None) => parent.propose_by_capacity(capacity),
        (None, None, Some(bits)) => parent.propose_by_bits(bits),
        _ => Err(IpamError::Invalid(
            "exactly one of cidr, capacity, prefix_bits must be set".to_string(),
        )),
    }
}

/// Reserve a child block in `parent` and start tracking it.
pub fn allocate_child(parent: &mut SubnetTracker, spec: &SubnetSpec) -> Result<SubnetTracker> {
    let cidr = resolve_child(parent, spec)?;
    parent.reserve(&cidr)?;
    log::debug!("child {cidr} allocated from {}", parent.root());
    Ok(SubnetTracker::fill_from(cidr))
}

/// Hand a child block back to `parent`; the child must be empty.
pub fn release_child(parent: &mut SubnetTracker, child: &SubnetTracker) -> Result<()> {
    if !child.is_untouched() {
        return Err(IpamError::InUse(format!(
            "{} ({} addresses reserved)",
            child.root(),
            child.used()
        )));
    }
    parent.release(&child.root())
}

/// Allocate a subnet object: top-level subnets take their `cidr` as is,
/// children are carved from `parent`.
pub fn apply_subnet(
    subnet: &mut Subnet,
    parent: Option<&mut SubnetTracker>,
) -> Result<SubnetTracker> {
    let outcome = match (parent, subnet.spec.parent.is_some()) {
        (Some(parent), true) => allocate_child(parent, &subnet.spec),
        (None, false) => subnet
            .spec
            .cidr
            .map(SubnetTracker::fill_from)
            .ok_or_else(|| IpamError::Invalid("a subnet without parent must set cidr".to_string())),
        (None, true) => Err(IpamError::Invalid(format!(
            "parent of {} was not supplied",
            subnet.name
        ))),
        (Some(_), false) => Err(IpamError::Invalid(format!(
            "{} has no parent but one was supplied",
            subnet.name
        ))),
    };
    match &outcome {
        Ok(tracker) => {
            tracker.write_status(&mut subnet.status);
            subnet.status.message = None;
        }
        Err(e) => record_failure(
            &subnet.name,
            &mut subnet.status.state,
            &mut subnet.status.message,
            e,
        ),
    }
    outcome
}

/// Reserve the requested address, or the first free one.
pub fn allocate_ip(subnet: &mut SubnetTracker, spec: &IpSpec) -> Result<Address> {
    let addr = match spec.ip {
        Some(addr) => addr,
        None => subnet.propose_address()?,
    };
    subnet.reserve_address(&addr)?;
    log::debug!("address {addr} allocated from {}", subnet.root());
    Ok(addr)
}

pub fn release_ip(subnet: &mut SubnetTracker, addr: &Address) -> Result<()> {
    subnet.release_address(addr)
}

/// Allocate an IP object from `subnet` and record the outcome.
pub fn apply_ip(ip: &mut Ip, subnet: &mut SubnetTracker) -> Result<Address> {
    let outcome = allocate_ip(subnet, &ip.spec);
    match &outcome {
        Ok(addr) => {
            ip.status.reserved = Some(*addr);
            ip.status.state = AllocationState::Allocated;
            ip.status.message = None;
        }
        Err(e) => record_failure(&ip.name, &mut ip.status.state, &mut ip.status.message, e),
    }
    outcome
}

/// Reserve the requested network identifier, or propose one.
pub fn allocate_network_id(counter: &mut Counter, spec: &NetworkSpec) -> Result<BigInt> {
    let id = match &spec.id {
        Some(id) => {
            let network_type = spec.network_type.unwrap_or_default();
            if !id_in_range(network_type, id) {
                return Err(IpamError::Invalid(format!(
                    "id {id} is outside the {network_type} range"
                )));
            }
            id.clone()
        }
        None => counter.propose()?,
    };
    counter.reserve(&id)?;
    Ok(id)
}

pub fn release_network_id(counter: &mut Counter, id: &BigInt) -> Result<()> {
    counter.release(id)
}

/// Allocate a network object's identifier and record the outcome.
pub fn apply_network(network: &mut Network, counter: &mut Counter) -> Result<BigInt> {
    let outcome = allocate_network_id(counter, &network.spec);
    match &outcome {
        Ok(id) => {
            network.status.reserved = Some(id.clone());
            network.status.state = AllocationState::Allocated;
            network.status.message = None;
        }
        Err(e) => record_failure(
            &network.name,
            &mut network.status.state,
            &mut network.status.message,
            e,
        ),
    }
    outcome
}

fn record_failure(
    name: &str,
    state: &mut AllocationState,
    message: &mut Option<String>,
    error: &IpamError,
) {
    log::warn!("allocation for {name} failed: {error}");
    *state = AllocationState::Failed;
    *message = Some(error.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NetworkType;
    use num_bigint::BigUint;

    fn c(s: &str) -> Cidr {
        Cidr::parse(s).unwrap()
    }

    fn child_spec() -> SubnetSpec {
        SubnetSpec {
            parent: Some("cluster".to_string()),
            network: "default".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_allocate_child_by_each_field() {
        let mut parent = SubnetTracker::fill_from(c("10.0.0.0/16"));

        let mut by_capacity = child_spec();
        by_capacity.capacity = Some(BigUint::from(200u32));
        let a = allocate_child(&mut parent, &by_capacity).unwrap();
        assert_eq!(a.root(), c("10.0.0.0/24"));

        let mut by_bits = child_spec();
        by_bits.prefix_bits = Some(26);
        let b = allocate_child(&mut parent, &by_bits).unwrap();
        assert_eq!(b.root(), c("10.0.1.0/26"));

        let mut by_cidr = child_spec();
        by_cidr.cidr = Some(c("10.0.128.0/17"));
        allocate_child(&mut parent, &by_cidr).unwrap();
        assert!(matches!(
            allocate_child(&mut parent, &by_cidr),
            Err(IpamError::NoCover(_))
        ));
        assert!(allocate_child(&mut parent, &child_spec()).is_err());
    }

    #[test]
    fn test_release_child_requires_empty() {
        let mut parent = SubnetTracker::fill_from(c("10.0.0.0/16"));
        let mut spec = child_spec();
        spec.prefix_bits = Some(24);
        let mut child = allocate_child(&mut parent, &spec).unwrap();
        child.reserve_address(&"10.0.0.5".parse().unwrap()).unwrap();
        assert!(matches!(
            release_child(&mut parent, &child),
            Err(IpamError::InUse(_))
        ));
        child.release_address(&"10.0.0.5".parse().unwrap()).unwrap();
        release_child(&mut parent, &child).unwrap();
        assert!(parent.is_untouched());
    }

    #[test]
    fn test_apply_subnet_records_state() {
        let mut top = Subnet {
            name: "cluster".to_string(),
            spec: SubnetSpec {
                cidr: Some(c("10.0.0.0/16")),
                network: "default".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut parent = apply_subnet(&mut top, None).unwrap();
        assert_eq!(top.status.state, AllocationState::Allocated);
        assert_eq!(top.status.reserved, Some(c("10.0.0.0/16")));

        let mut big = Subnet {
            name: "big".to_string(),
            spec: child_spec(),
            ..Default::default()
        };
        big.spec.capacity = Some(BigUint::from(1u32) << 17usize);
        assert!(apply_subnet(&mut big, Some(&mut parent)).is_err());
        assert_eq!(big.status.state, AllocationState::Failed);
        assert_eq!(big.status.message.as_deref(), Some("no vacant block for /15"));
        assert!(parent.is_untouched());

        let mut orphan = Subnet {
            name: "orphan".to_string(),
            spec: child_spec(),
            ..Default::default()
        };
        assert!(apply_subnet(&mut orphan, None).is_err());
    }

    #[test]
    fn test_apply_ip() {
        let mut subnet = SubnetTracker::fill_from(c("10.0.0.0/30"));
        let mut ip = Ip {
            name: "node-1".to_string(),
            spec: IpSpec {
                subnet: "pods".to_string(),
                ip: Some("10.0.0.2".parse().unwrap()),
                consumer: None,
            },
            ..Default::default()
        };
        assert_eq!(apply_ip(&mut ip, &mut subnet).unwrap().to_string(), "10.0.0.2");
        assert_eq!(ip.status.state, AllocationState::Allocated);

        let mut again = ip.clone();
        assert!(apply_ip(&mut again, &mut subnet).is_err());
        assert_eq!(again.status.state, AllocationState::Failed);

        let auto = IpSpec {
            subnet: "pods".to_string(),
            ..Default::default()
        };
        // the lone /32 is the smallest sufficient block
        assert_eq!(allocate_ip(&mut subnet, &auto).unwrap().to_string(), "10.0.0.3");
        assert_eq!(allocate_ip(&mut subnet, &auto).unwrap().to_string(), "10.0.0.0");
        assert_eq!(allocate_ip(&mut subnet, &auto).unwrap().to_string(), "10.0.0.1");
        assert!(matches!(
            allocate_ip(&mut subnet, &auto),
            Err(IpamError::Exhausted(32))
        ));
        release_ip(&mut subnet, &"10.0.0.1".parse().unwrap()).unwrap();
        assert_eq!(allocate_ip(&mut subnet, &auto).unwrap().to_string(), "10.0.0.1");
    }

    #[test]
    fn test_network_ids() {
        let mut counter = Counter::for_type(NetworkType::Vxlan);
        let mut network = Network {
            name: "overlay".to_string(),
            spec: NetworkSpec {
                network_type: Some(NetworkType::Vxlan),
                id: None,
            },
            ..Default::default()
        };
        assert_eq!(apply_network(&mut network, &mut counter).unwrap(), BigInt::from(100));
        assert_eq!(network.status.reserved, Some(BigInt::from(100)));

        let fixed = NetworkSpec {
            network_type: Some(NetworkType::Vxlan),
            id: Some(BigInt::from(5000)),
        };
        assert_eq!(allocate_network_id(&mut counter, &fixed).unwrap(), BigInt::from(5000));
        assert!(matches!(
            allocate_network_id(&mut counter, &fixed),
            Err(IpamError::NotFree(_))
        ));
        let low = NetworkSpec {
            network_type: Some(NetworkType::Vxlan),
            id: Some(BigInt::from(7)),
        };
        assert!(allocate_network_id(&mut counter, &low).is_err());

        release_network_id(&mut counter, &BigInt::from(5000)).unwrap();
        release_network_id(&mut counter, &BigInt::from(100)).unwrap();
        assert!(counter.is_pristine(NetworkType::Vxlan));
    }
}
