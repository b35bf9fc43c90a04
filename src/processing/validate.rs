//! Field rules for subnet, network and IP requests.
//!
//! These are the predicates an admission layer runs before handing a
//! request to the allocators.

use crate::config::MAX_CAPACITY_LOG2;
use crate::error::{IpamError, Result};
use crate::models::{IpSpec, NetworkSpec, NetworkType, Region, SubnetSpec, V6_BITS};
use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// DNS-1123 label: lowercase alphanumerics and '-', alphanumeric at both ends.
static NAME_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_name_regex() -> &'static Regex {
    NAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("Invalid Regex"))
}

const MAX_NAME_LEN: usize = 63;

/// True when `name` is a valid object name.
pub fn is_valid_name(name: &str) -> bool {
    name.len() <= MAX_NAME_LEN && get_name_regex().is_match(name)
}

/// A consumer reference is `name` or `kind/name`.
pub fn is_valid_reference(reference: &str) -> bool {
    let parts: Vec<&str> = reference.split('/').collect();
    parts.len() <= 2 && parts.iter().all(|p| is_valid_name(p))
}

fn check_name(field: &str, name: &str) -> Result<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(IpamError::Invalid(format!("{field} '{name}' is not a valid name")))
    }
}

fn check_consumer(consumer: Option<&String>) -> Result<()> {
    match consumer {
        Some(c) if !is_valid_reference(c) => Err(IpamError::Invalid(format!(
            "consumer '{c}' is not a valid reference"
        ))),
        _ => Ok(()),
    }
}

fn check_regions(regions: &[Region]) -> Result<()> {
    let mut seen = HashSet::new();
    for region in regions {
        check_name("region", &region.name)?;
        if !seen.insert(region.name.as_str()) {
            return Err(IpamError::Invalid(format!(
                "region '{}' listed twice",
                region.name
            )));
        }
        let mut zones = HashSet::new();
        for zone in &region.availability_zones {
            check_name("availability zone", zone)?;
            if !zones.insert(zone.as_str()) {
                return Err(IpamError::Invalid(format!(
                    "availability zone '{zone}' listed twice in region '{}'",
                    region.name
                )));
            }
        }
    }
    Ok(())
}

/// Check a new subnet request.
pub fn validate_subnet_spec(spec: &SubnetSpec) -> Result<()> {
    check_name("network", &spec.network)?;
    if let Some(parent) = &spec.parent {
        check_name("parent", parent)?;
    }
    check_consumer(spec.consumer.as_ref())?;
    check_regions(&spec.regions)?;

    let sizing = [
        spec.cidr.is_some(),
        spec.capacity.is_some(),
        spec.prefix_bits.is_some(),
    ];
    if sizing.iter().filter(|set| **set).count() != 1 {
        return Err(IpamError::Invalid(
            "exactly one of cidr, capacity, prefix_bits must be set".to_string(),
        ));
    }
    if spec.parent.is_none() && spec.cidr.is_none() {
        return Err(IpamError::Invalid(
            "a subnet without parent must set cidr".to_string(),
        ));
    }
    if let Some(capacity) = &spec.capacity {
        let max = BigUint::one() << MAX_CAPACITY_LOG2;
        if capacity.is_zero() || *capacity > max {
            return Err(IpamError::InvalidCapacity(capacity.clone()));
        }
    }
    if let Some(bits) = spec.prefix_bits {
        if bits > V6_BITS {
            return Err(IpamError::InvalidPrefix(bits));
        }
    }
    if let (Some(gateway), Some(cidr)) = (&spec.gateway, &spec.cidr) {
        if !cidr.contains_address(gateway) {
            return Err(IpamError::Invalid(format!(
                "gateway {gateway} is outside {cidr}"
            )));
        }
    }
    Ok(())
}

/// Check an update of an existing subnet; only `consumer` may change.
pub fn validate_subnet_update(old: &SubnetSpec, new: &SubnetSpec) -> Result<()> {
    let frozen = [
        ("cidr", old.cidr != new.cidr),
        ("prefix_bits", old.prefix_bits != new.prefix_bits),
        ("capacity", old.capacity != new.capacity),
        ("parent", old.parent != new.parent),
        ("network", old.network != new.network),
        ("regions", old.regions != new.regions),
    ];
    if let Some((field, _)) = frozen.iter().find(|(_, changed)| *changed) {
        return Err(IpamError::Invalid(format!("{field} cannot be changed")));
    }
    check_consumer(new.consumer.as_ref())
}

/// True when `id` lies in the identifier range of `network_type`.
pub fn id_in_range(network_type: NetworkType, id: &BigInt) -> bool {
    network_type.initial_range().contains(id)
}

pub fn validate_network_spec(spec: &NetworkSpec) -> Result<()> {
    if let Some(id) = &spec.id {
        let network_type = spec.network_type.unwrap_or_default();
        if !id_in_range(network_type, id) {
            return Err(IpamError::Invalid(format!(
                "id {id} is outside the {network_type} range {}",
                network_type.initial_range()
            )));
        }
    }
    Ok(())
}

pub fn validate_ip_spec(spec: &IpSpec) -> Result<()> {
    check_name("subnet", &spec.subnet)?;
    check_consumer(spec.consumer.as_ref())
}

/// Refuse to delete `name` while it still has `children` dependants.
pub fn ensure_deletable(name: &str, children: usize) -> Result<()> {
    if children > 0 {
        log::warn!("{name} still has {children} dependants");
        return Err(IpamError::InUse(format!("{name} ({children} dependants)")));
    }
    Ok(())
}
