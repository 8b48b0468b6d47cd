//! Match results: exactly which parts of which offer fragments a workload
//! would consume.
//!
//! Every [`Consumption`] and [`PortWithRole`] records the index of the
//! offer fragment it was drawn from, so the accept side can turn a match
//! into precise accept and reserve operations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use warpgrid_offer::{
    DiskSource, PersistentVolumeRequest, Reservation, Resource, ResourceValue, ValueRange, names,
};

/// An amount drawn from one offer fragment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Consumption {
    /// Index of the source fragment in `Offer::resources`.
    pub fragment: usize,
    pub amount: f64,
    pub role: String,
    pub reservation: Option<Reservation>,
    /// Set for disk consumptions.
    pub disk: Option<DiskSource>,
}

/// How a scalar requirement was satisfied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalarMatch {
    pub name: String,
    pub requested: f64,
    pub consumptions: Vec<Consumption>,
}

impl ScalarMatch {
    pub fn consumed(&self) -> f64 {
        self.consumptions.iter().map(|c| c.amount).sum()
    }
}

/// A host port together with the fragment it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortWithRole {
    pub port: u64,
    pub fragment: usize,
    pub role: String,
    pub reservation: Option<Reservation>,
}

/// Host ports, positionally aligned with the workload's port request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PortsMatch {
    /// `None` for mappings that asked for no host port.
    pub ports: Vec<Option<PortWithRole>>,
}

impl PortsMatch {
    pub fn host_ports(&self) -> Vec<Option<u64>> {
        self.ports.iter().map(|p| p.as_ref().map(|p| p.port)).collect()
    }
}

/// Disk carved out for one persistent volume.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeMatch {
    pub volume: PersistentVolumeRequest,
    pub consumptions: Vec<Consumption>,
}

impl VolumeMatch {
    pub fn consumed(&self) -> f64 {
        self.consumptions.iter().map(|c| c.amount).sum()
    }

    pub fn source(&self) -> Option<&DiskSource> {
        self.consumptions.first().and_then(|c| c.disk.as_ref())
    }
}

/// Everything one instance consumes from one offer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceMatch {
    pub scalars: Vec<ScalarMatch>,
    pub ports: PortsMatch,
    pub volumes: Vec<VolumeMatch>,
}

impl ResourceMatch {
    pub fn scalar(&self, name: &str) -> Option<&ScalarMatch> {
        self.scalars.iter().find(|s| s.name == name)
    }

    /// The fragments to accept from the offer: one scalar per consumption,
    /// and port ranges coalesced per role and reservation.
    pub fn consumed_resources(&self) -> Vec<Resource> {
        let mut resources = Vec::new();

        for scalar in &self.scalars {
            resources.extend(
                scalar
                    .consumptions
                    .iter()
                    .map(|c| consumption_resource(&scalar.name, c)),
            );
        }
        for volume in &self.volumes {
            resources.extend(
                volume
                    .consumptions
                    .iter()
                    .map(|c| consumption_resource(names::DISK, c)),
            );
        }

        type Owner<'a> = (&'a str, Option<(&'a str, &'a BTreeMap<String, String>)>);
        let mut by_owner: BTreeMap<Owner<'_>, Vec<&PortWithRole>> = BTreeMap::new();
        for port in self.ports.ports.iter().flatten() {
            let reservation = port
                .reservation
                .as_ref()
                .map(|r| (r.principal.as_str(), &r.labels));
            by_owner
                .entry((port.role.as_str(), reservation))
                .or_default()
                .push(port);
        }
        for ports in by_owner.into_values() {
            let Some(first) = ports.first() else { continue };
            let mut numbers: Vec<u64> = ports.iter().map(|p| p.port).collect();
            numbers.sort_unstable();
            resources.push(Resource {
                name: names::PORTS.to_string(),
                value: ResourceValue::Ranges(coalesce(&numbers)),
                role: first.role.clone(),
                reservation: first.reservation.clone(),
                disk: None,
            });
        }

        resources
    }
}

fn consumption_resource(name: &str, c: &Consumption) -> Resource {
    Resource {
        name: name.to_string(),
        value: ResourceValue::Scalar(c.amount),
        role: c.role.clone(),
        reservation: c.reservation.clone(),
        disk: c.disk.clone(),
    }
}

/// Collapse sorted port numbers into inclusive ranges.
fn coalesce(sorted: &[u64]) -> Vec<ValueRange> {
    let mut ranges: Vec<ValueRange> = Vec::new();
    for &port in sorted {
        match ranges.last_mut() {
            Some(last) if last.end + 1 == port => last.end = port,
            _ => ranges.push(ValueRange::new(port, port)),
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(port: u64, role: &str) -> Option<PortWithRole> {
        Some(PortWithRole {
            port,
            fragment: 0,
            role: role.to_string(),
            reservation: None,
        })
    }

    #[test]
    fn coalesces_adjacent_ports() {
        assert_eq!(
            coalesce(&[1, 2, 3, 7, 9, 10]),
            vec![ValueRange::new(1, 3), ValueRange::new(7, 7), ValueRange::new(9, 10)]
        );
        assert!(coalesce(&[]).is_empty());
    }

    #[test]
    fn consumed_resources_groups_ports_by_role() {
        let m = ResourceMatch {
            scalars: vec![ScalarMatch {
                name: names::CPUS.to_string(),
                requested: 1.5,
                consumptions: vec![
                    Consumption {
                        fragment: 0,
                        amount: 1.0,
                        role: "*".to_string(),
                        reservation: None,
                        disk: None,
                    },
                    Consumption {
                        fragment: 1,
                        amount: 0.5,
                        role: "web".to_string(),
                        reservation: None,
                        disk: None,
                    },
                ],
            }],
            ports: PortsMatch {
                ports: vec![port(31001, "*"), None, port(31000, "*"), port(80, "web")],
            },
            volumes: Vec::new(),
        };

        let resources = m.consumed_resources();
        assert_eq!(resources.len(), 4);
        assert_eq!(resources[0].scalar_value(), Some(1.0));
        assert_eq!(resources[1].role, "web");
        assert_eq!(resources[2].role, "*");
        assert_eq!(resources[2].range_values(), Some(&[ValueRange::new(31000, 31001)][..]));
        assert_eq!(resources[3].range_values(), Some(&[ValueRange::new(80, 80)][..]));
        assert_eq!(m.ports.host_ports(), vec![Some(31001), None, Some(31000), Some(80)]);
    }

    #[test]
    fn consumed_ports_keep_each_principal() {
        let reserved = |port: u64, fragment: usize, principal: &str| {
            Some(PortWithRole {
                port,
                fragment,
                role: "web".to_string(),
                reservation: Some(Reservation::new(principal).with_label("tier", "front")),
            })
        };
        let m = ResourceMatch {
            scalars: Vec::new(),
            ports: PortsMatch {
                ports: vec![reserved(31000, 0, "alice"), reserved(31001, 1, "bob")],
            },
            volumes: Vec::new(),
        };

        let resources = m.consumed_resources();
        assert_eq!(resources.len(), 2);
        let principals: Vec<&str> = resources
            .iter()
            .filter_map(|r| r.reservation.as_ref())
            .map(|r| r.principal.as_str())
            .collect();
        assert_eq!(principals, vec!["alice", "bob"]);
        assert_eq!(resources[0].range_values(), Some(&[ValueRange::new(31000, 31000)][..]));
    }
}
