//! Scalar accounting: cpus, mem, gpus and scratch disk.
//!
//! Eligible fragments are drawn down greedily in pool order. The last
//! fragment used gives up exactly the remainder, never more.

use tracing::trace;
use warpgrid_offer::{DiskType, names};

use crate::pool::ResourcePool;
use crate::types::{Consumption, ScalarMatch};

/// Amounts within this distance of each other are treated as equal.
pub(crate) const EPSILON: f64 = 1e-6;

/// Match a scalar requirement against the pool.
///
/// A requirement of zero always matches, with no consumptions. Scratch
/// `disk` is only ever drawn from root disks.
pub(crate) fn match_scalar(
    pool: &ResourcePool<'_>,
    name: &str,
    requested: f64,
) -> Option<ScalarMatch> {
    if requested <= 0.0 {
        return Some(ScalarMatch {
            name: name.to_string(),
            requested,
            consumptions: Vec::new(),
        });
    }

    let candidates = pool
        .candidates(name)
        .filter(|&i| name != names::DISK || pool.fragment(i).disk_type() == DiskType::Root);

    let consumptions = consume_greedy(pool, candidates, requested)?;
    trace!(resource = name, requested, fragments = consumptions.len(), "scalar matched");

    Some(ScalarMatch {
        name: name.to_string(),
        requested,
        consumptions,
    })
}

/// Draw `amount` from `candidates` in order, or `None` if they hold too little.
pub(crate) fn consume_greedy(
    pool: &ResourcePool<'_>,
    candidates: impl IntoIterator<Item = usize>,
    amount: f64,
) -> Option<Vec<Consumption>> {
    let mut needed = amount;
    let mut consumptions = Vec::new();

    for index in candidates {
        if needed <= EPSILON {
            break;
        }
        let available = pool.remaining(index);
        if available <= EPSILON {
            continue;
        }
        let take = available.min(needed);
        let fragment = pool.fragment(index);
        consumptions.push(Consumption {
            fragment: index,
            amount: take,
            role: fragment.role.clone(),
            reservation: fragment.reservation.clone(),
            disk: fragment.disk.clone(),
        });
        needed -= take;
    }

    (needed <= EPSILON).then_some(consumptions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::ResourceSelector;
    use warpgrid_offer::{DiskSource, Offer, Reservation, Resource};

    fn offer_with(resources: Vec<Resource>) -> Offer {
        resources
            .into_iter()
            .fold(Offer::new("o1", "host1"), Offer::with_resource)
    }

    #[test]
    fn zero_requirement_needs_no_fragment() {
        let offer = offer_with(Vec::new());
        let pool = ResourcePool::new(&offer, &ResourceSelector::default());

        let m = match_scalar(&pool, names::GPUS, 0.0).unwrap();
        assert!(m.consumptions.is_empty());
        assert_eq!(m.consumed(), 0.0);
    }

    #[test]
    fn partially_consumes_last_fragment() {
        let offer = offer_with(vec![
            Resource::scalar(names::CPUS, 1.0),
            Resource::scalar(names::CPUS, 2.0),
        ]);
        let pool = ResourcePool::new(&offer, &ResourceSelector::default());

        let m = match_scalar(&pool, names::CPUS, 1.5).unwrap();
        let amounts: Vec<f64> = m.consumptions.iter().map(|c| c.amount).collect();
        assert_eq!(amounts, vec![1.0, 0.5]);
        assert_eq!(m.consumed(), 1.5);
    }

    #[test]
    fn fails_when_eligible_sum_is_short() {
        let offer = offer_with(vec![
            Resource::scalar(names::CPUS, 0.1),
            Resource::scalar(names::CPUS, 4.0).with_role("batch"),
        ]);
        let pool = ResourcePool::new(&offer, &ResourceSelector::default());

        assert!(match_scalar(&pool, names::CPUS, 1.0).is_none());
    }

    #[test]
    fn consumptions_keep_role_and_reservation() {
        let reservation = Reservation::new("p").with_label("owner", "web");
        let offer = offer_with(vec![
            Resource::scalar(names::MEM, 64.0)
                .with_role("web")
                .with_reservation(reservation.clone()),
            Resource::scalar(names::MEM, 64.0),
        ]);
        let pool = ResourcePool::new(&offer, &ResourceSelector::any(["*", "web"]));

        let m = match_scalar(&pool, names::MEM, 100.0).unwrap();
        assert_eq!(m.consumptions[0].fragment, 1);
        assert_eq!(m.consumptions[0].role, "*");
        assert_eq!(m.consumptions[0].amount, 64.0);
        assert_eq!(m.consumptions[1].fragment, 0);
        assert_eq!(m.consumptions[1].reservation, Some(reservation));
        assert_eq!(m.consumptions[1].amount, 36.0);
    }

    #[test]
    fn scratch_disk_ignores_path_and_mount_disks() {
        let offer = offer_with(vec![
            Resource::disk(1000.0, DiskSource::Path { root: "/data".into() }),
            Resource::disk(1000.0, DiskSource::Mount { root: "/mnt".into() }),
            Resource::scalar(names::DISK, 50.0),
        ]);
        let pool = ResourcePool::new(&offer, &ResourceSelector::default());

        assert!(match_scalar(&pool, names::DISK, 100.0).is_none());
        let m = match_scalar(&pool, names::DISK, 50.0).unwrap();
        assert_eq!(m.consumptions.len(), 1);
        assert_eq!(m.consumptions[0].fragment, 2);
    }

    #[test]
    fn respects_previously_committed_consumptions() {
        let offer = offer_with(vec![Resource::scalar(names::MEM, 128.0)]);
        let mut pool = ResourcePool::new(&offer, &ResourceSelector::default());

        let first = match_scalar(&pool, names::MEM, 100.0).unwrap();
        pool.commit(&first.consumptions);

        assert!(match_scalar(&pool, names::MEM, 100.0).is_none());
        let rest = match_scalar(&pool, names::MEM, 28.0).unwrap();
        assert_eq!(rest.consumed(), 28.0);
    }
}
