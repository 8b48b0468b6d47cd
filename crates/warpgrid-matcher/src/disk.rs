//! Persistent volume accounting.
//!
//! Volumes are matched against `disk` fragments of the kind they ask for,
//! with one strategy per kind:
//!
//! - **root** disks are fungible; a volume may span any number of them.
//! - **path** disks are fungible only within one path. The whole volume
//!   must come from the first path whose free space covers it.
//! - **mount** disks are whole devices. A volume takes exactly one, in
//!   full, and `max_size` caps how large a device it is willing to take.
//!
//! Volume constraints (`path LIKE ...`) drop fragments before any of this.

use tracing::trace;
use warpgrid_offer::{DiskSource, DiskType, PersistentVolumeRequest, names};

use crate::constraints::VolumeConstraint;
use crate::pool::ResourcePool;
use crate::scalar::{EPSILON, consume_greedy};
use crate::types::{Consumption, VolumeMatch};

/// Match one persistent volume against the pool.
pub(crate) fn match_volume(
    pool: &ResourcePool<'_>,
    volume: &PersistentVolumeRequest,
    constraints: &[VolumeConstraint],
) -> Option<VolumeMatch> {
    let candidates: Vec<usize> = pool
        .candidates(names::DISK)
        .filter(|&i| pool.fragment(i).disk_type() == volume.disk_type)
        .filter(|&i| pool.remaining(i) > EPSILON)
        .filter(|&i| {
            let path = pool.fragment(i).disk_path();
            constraints.iter().all(|c| c.accepts(path))
        })
        .collect();

    let consumptions = match volume.disk_type {
        DiskType::Root => match_root(pool, &candidates, volume),
        DiskType::Path => match_path(pool, &candidates, volume),
        DiskType::Mount => match_mount(pool, &candidates, volume),
    };

    let Some(consumptions) = consumptions else {
        trace!(
            container_path = %volume.container_path,
            disk_type = %volume.disk_type,
            size = volume.size,
            candidates = candidates.len(),
            "no disk for volume"
        );
        return None;
    };

    Some(VolumeMatch {
        volume: volume.clone(),
        consumptions,
    })
}

fn match_root(
    pool: &ResourcePool<'_>,
    candidates: &[usize],
    volume: &PersistentVolumeRequest,
) -> Option<Vec<Consumption>> {
    let mut consumptions = consume_greedy(pool, candidates.iter().copied(), volume.size)?;
    for c in &mut consumptions {
        c.disk.get_or_insert(DiskSource::Root);
    }
    Some(consumptions)
}

fn match_path(
    pool: &ResourcePool<'_>,
    candidates: &[usize],
    volume: &PersistentVolumeRequest,
) -> Option<Vec<Consumption>> {
    let (path, members) = group_by_path(pool, candidates).into_iter().find(|(_, members)| {
        let free: f64 = members.iter().map(|&i| pool.remaining(i)).sum();
        free + EPSILON >= volume.size
    })?;
    trace!(path, fragments = members.len(), "path disk selected");
    consume_greedy(pool, members, volume.size)
}

fn match_mount(
    pool: &ResourcePool<'_>,
    candidates: &[usize],
    volume: &PersistentVolumeRequest,
) -> Option<Vec<Consumption>> {
    let (index, capacity) = candidates.iter().find_map(|&i| {
        let capacity = pool.fragment(i).scalar_value()?;
        let untouched = (pool.remaining(i) - capacity).abs() <= EPSILON;
        let fits = capacity + EPSILON >= volume.size;
        let within_cap = volume.max_size.is_none_or(|max| capacity <= max + EPSILON);
        (untouched && fits && within_cap).then_some((i, capacity))
    })?;

    let fragment = pool.fragment(index);
    Some(vec![Consumption {
        fragment: index,
        amount: capacity,
        role: fragment.role.clone(),
        reservation: fragment.reservation.clone(),
        disk: fragment.disk.clone(),
    }])
}

/// Candidate fragments grouped by disk path, groups in order of first appearance.
fn group_by_path<'a>(pool: &ResourcePool<'a>, candidates: &[usize]) -> Vec<(&'a str, Vec<usize>)> {
    let mut groups: Vec<(&'a str, Vec<usize>)> = Vec::new();
    for &i in candidates {
        let Some(path) = pool.fragment(i).disk_path() else {
            continue;
        };
        match groups.iter_mut().find(|(p, _)| *p == path) {
            Some((_, members)) => members.push(i),
            None => groups.push((path, vec![i])),
        }
    }
    groups
}
