//! Workload validation.
//!
//! Rejects workloads no offer could ever be judged against: negative or
//! non-finite amounts, nonsensical volumes, and constraints whose values do
//! not parse. A valid workload comes back with its constraints compiled.

use warpgrid_offer::{DiskType, WorkloadSpec, names};

use crate::constraints::{PlacementConstraint, VolumeConstraint};
use crate::error::{MatcherError, MatcherResult};

/// A workload that passed validation, with compiled constraints.
#[derive(Debug, Clone)]
pub struct ValidatedWorkload {
    placement: Vec<PlacementConstraint>,
    /// Per volume, in declaration order.
    volumes: Vec<Vec<VolumeConstraint>>,
}

impl ValidatedWorkload {
    pub fn placement_constraints(&self) -> &[PlacementConstraint] {
        &self.placement
    }

    pub fn volume_constraints(&self, volume: usize) -> &[VolumeConstraint] {
        self.volumes.get(volume).map_or(&[], Vec::as_slice)
    }
}

pub fn validate_workload(spec: &WorkloadSpec) -> MatcherResult<ValidatedWorkload> {
    for (name, amount) in [
        (names::CPUS, spec.cpus),
        (names::MEM, spec.mem),
        (names::DISK, spec.disk),
        (names::GPUS, spec.gpus),
    ] {
        if !amount.is_finite() || amount < 0.0 {
            return Err(MatcherError::InvalidResource(format!(
                "{}: {name} = {amount}",
                spec.id
            )));
        }
    }

    let mut volumes = Vec::with_capacity(spec.volumes.len());
    for volume in &spec.volumes {
        let path = &volume.container_path;
        if !volume.size.is_finite() || volume.size <= 0.0 {
            return Err(MatcherError::InvalidVolume(format!(
                "{path}: size must be positive, got {}",
                volume.size
            )));
        }
        if let Some(max) = volume.max_size {
            if volume.disk_type != DiskType::Mount {
                return Err(MatcherError::InvalidVolume(format!(
                    "{path}: max_size only applies to mount disks, not {}",
                    volume.disk_type
                )));
            }
            if !max.is_finite() || max < volume.size {
                return Err(MatcherError::InvalidVolume(format!(
                    "{path}: max_size {max} is below size {}",
                    volume.size
                )));
            }
        }
        volumes.push(
            volume
                .constraints
                .iter()
                .map(VolumeConstraint::compile)
                .collect::<MatcherResult<Vec<_>>>()?,
        );
    }

    let placement = spec
        .constraints
        .iter()
        .map(PlacementConstraint::compile)
        .collect::<MatcherResult<Vec<_>>>()?;

    Ok(ValidatedWorkload { placement, volumes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use warpgrid_offer::{Constraint, Operator, PersistentVolumeRequest};

    #[test]
    fn accepts_plain_workload() {
        let spec = WorkloadSpec::new("/web")
            .with_cpus(1.0)
            .with_mem(128.0)
            .with_constraint(Constraint::new("hostname", Operator::Unique, None))
            .with_volume(
                PersistentVolumeRequest::new("data", 10.0, DiskType::Path)
                    .with_constraint(Constraint::new("path", Operator::Like, Some("/ssd.*"))),
            );

        let validated = validate_workload(&spec).unwrap();
        assert_eq!(validated.placement_constraints().len(), 1);
        assert_eq!(validated.volume_constraints(0).len(), 1);
        assert!(validated.volume_constraints(1).is_empty());
    }

    #[test]
    fn rejects_negative_and_nan_amounts() {
        for spec in [
            WorkloadSpec::new("/a").with_cpus(-1.0),
            WorkloadSpec::new("/a").with_mem(f64::NAN),
            WorkloadSpec::new("/a").with_disk(-0.5),
            WorkloadSpec::new("/a").with_gpus(f64::INFINITY),
        ] {
            assert!(matches!(
                validate_workload(&spec),
                Err(MatcherError::InvalidResource(_))
            ));
        }
    }

    #[test]
    fn rejects_bad_volumes() {
        let cases = [
            PersistentVolumeRequest::new("data", 0.0, DiskType::Root),
            PersistentVolumeRequest::new("data", -5.0, DiskType::Mount),
            PersistentVolumeRequest::new("data", 10.0, DiskType::Path).with_max_size(20.0),
            PersistentVolumeRequest::new("data", 10.0, DiskType::Mount).with_max_size(5.0),
        ];
        for volume in cases {
            let spec = WorkloadSpec::new("/a").with_volume(volume);
            assert!(matches!(
                validate_workload(&spec),
                Err(MatcherError::InvalidVolume(_))
            ));
        }
    }

    #[test]
    fn rejects_bad_constraints() {
        let spec = WorkloadSpec::new("/a")
            .with_constraint(Constraint::new("hostname", Operator::Like, Some("[")));
        assert!(matches!(
            validate_workload(&spec),
            Err(MatcherError::InvalidPattern { .. })
        ));

        let spec = WorkloadSpec::new("/a").with_volume(
            PersistentVolumeRequest::new("data", 10.0, DiskType::Path)
                .with_constraint(Constraint::new("hostname", Operator::Like, Some("x"))),
        );
        assert!(matches!(
            validate_workload(&spec),
            Err(MatcherError::InvalidConstraint(_))
        ));
    }
}
