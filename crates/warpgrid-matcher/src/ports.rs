//! Port accounting.
//!
//! Host ports come from eligible `ports` range fragments. Wildcard
//! requests take the lowest free ports in pool order. Mapped requests
//! claim every fixed host port first, then fill the `any` entries the same
//! way, so an `any` entry never steals a port another entry pinned.

use std::collections::BTreeSet;

use tracing::trace;
use warpgrid_offer::{HostPort, PortRequest, ValueRange, names};

use crate::pool::ResourcePool;
use crate::types::{PortWithRole, PortsMatch};

/// Match a port request against the pool's port ranges.
pub(crate) fn match_ports(pool: &ResourcePool<'_>, request: &PortRequest) -> Option<PortsMatch> {
    let ranges = port_ranges(pool);
    let mut taken = BTreeSet::new();

    let ports = match request {
        PortRequest::Wildcard(count) => {
            let picked = pick_free(pool, &ranges, &mut taken, *count)?;
            picked.into_iter().map(Some).collect()
        }
        PortRequest::Mappings(mappings) => {
            let mut slots: Vec<Option<PortWithRole>> = vec![None; mappings.len()];

            for (slot, mapping) in slots.iter_mut().zip(mappings) {
                if let Some(HostPort::Fixed(port)) = mapping.host_port {
                    let port = u64::from(port);
                    if taken.contains(&port) {
                        trace!(port, "fixed host port requested twice");
                        return None;
                    }
                    let &(fragment, _) = ranges.iter().find(|(_, r)| r.contains(port))?;
                    taken.insert(port);
                    *slot = Some(port_with_role(pool, fragment, port));
                }
            }

            let wildcard: Vec<usize> = mappings
                .iter()
                .enumerate()
                .filter(|(_, m)| m.host_port == Some(HostPort::Any))
                .map(|(i, _)| i)
                .collect();
            let picked = pick_free(pool, &ranges, &mut taken, wildcard.len())?;
            for (i, port) in wildcard.into_iter().zip(picked) {
                slots[i] = Some(port);
            }

            slots
        }
    };

    Some(PortsMatch { ports })
}

/// Every eligible port range with the fragment it belongs to, in pool order.
fn port_ranges(pool: &ResourcePool<'_>) -> Vec<(usize, ValueRange)> {
    pool.candidates(names::PORTS)
        .flat_map(|i| {
            pool.fragment(i)
                .range_values()
                .unwrap_or_default()
                .iter()
                .map(move |r| (i, *r))
        })
        .collect()
}

/// Take the first `count` ports not yet in `taken`.
fn pick_free(
    pool: &ResourcePool<'_>,
    ranges: &[(usize, ValueRange)],
    taken: &mut BTreeSet<u64>,
    count: usize,
) -> Option<Vec<PortWithRole>> {
    if count == 0 {
        return Some(Vec::new());
    }

    let mut picked = Vec::new();
    'ranges: for &(fragment, range) in ranges {
        for port in range.begin..=range.end {
            if taken.insert(port) {
                picked.push(port_with_role(pool, fragment, port));
                if picked.len() == count {
                    break 'ranges;
                }
            }
        }
    }

    if picked.len() < count {
        trace!(wanted = count, found = picked.len(), "not enough free ports");
        return None;
    }
    Some(picked)
}

fn port_with_role(pool: &ResourcePool<'_>, fragment: usize, port: u64) -> PortWithRole {
    let resource = pool.fragment(fragment);
    PortWithRole {
        port,
        fragment,
        role: resource.role.clone(),
        reservation: resource.reservation.clone(),
    }
}
