//! Working view of one offer during a single match.
//!
//! The pool holds the eligible fragments in their consumption order and
//! the capacity each has left. Requirements are matched one after another
//! against the same pool, so no unit is ever handed out twice.

use std::cmp::Ordering;

use warpgrid_offer::{Offer, Resource};

use crate::selector::ResourceSelector;
use crate::types::Consumption;

pub(crate) struct ResourcePool<'a> {
    offer: &'a Offer,
    /// Indices of eligible fragments, in consumption order.
    order: Vec<usize>,
    /// Scalar capacity left per fragment index.
    remaining: Vec<f64>,
}

impl<'a> ResourcePool<'a> {
    pub(crate) fn new(offer: &'a Offer, selector: &ResourceSelector) -> Self {
        let resources = &offer.resources;
        let mut order: Vec<usize> = (0..resources.len())
            .filter(|&i| selector.eligible(&resources[i]))
            .collect();
        // Stable, so declaration order breaks the remaining ties.
        order.sort_by(|&a, &b| fragment_order(&resources[a], &resources[b]));

        let remaining = resources
            .iter()
            .map(|r| r.scalar_value().unwrap_or(0.0).max(0.0))
            .collect();

        Self {
            offer,
            order,
            remaining,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Eligible fragments with the given name, in consumption order.
    pub(crate) fn candidates<'s>(&'s self, name: &'s str) -> impl Iterator<Item = usize> + 's {
        self.order
            .iter()
            .copied()
            .filter(move |&i| self.offer.resources[i].name == name)
    }

    pub(crate) fn fragment(&self, index: usize) -> &'a Resource {
        &self.offer.resources[index]
    }

    pub(crate) fn remaining(&self, index: usize) -> f64 {
        self.remaining[index]
    }

    /// Record consumptions produced by a successful sub-match.
    pub(crate) fn commit(&mut self, consumptions: &[Consumption]) {
        for c in consumptions {
            let left = &mut self.remaining[c.fragment];
            *left = (*left - c.amount).max(0.0);
        }
    }
}

/// Total order over fragments: role, then reservation labels (unreserved first).
pub(crate) fn fragment_order(a: &Resource, b: &Resource) -> Ordering {
    a.role.cmp(&b.role).then_with(|| {
        let a_labels = a.reservation.as_ref().map(|r| &r.labels);
        let b_labels = b.reservation.as_ref().map(|r| &r.labels);
        a_labels.cmp(&b_labels)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use warpgrid_offer::{Reservation, names};

    #[test]
    fn orders_by_role_then_reservation_then_declaration() {
        let offer = Offer::new("o1", "host1")
            .with_resource(Resource::scalar(names::CPUS, 1.0).with_role("web"))
            .with_resource(
                Resource::scalar(names::CPUS, 2.0)
                    .with_role("web")
                    .with_reservation(Reservation::new("p").with_label("a", "1")),
            )
            .with_resource(Resource::scalar(names::CPUS, 3.0))
            .with_resource(Resource::scalar(names::CPUS, 4.0).with_role("web"))
            .with_resource(Resource::scalar(names::MEM, 5.0));
        let pool = ResourcePool::new(&offer, &ResourceSelector::any(["*", "web"]));

        let cpus: Vec<usize> = pool.candidates(names::CPUS).collect();
        assert_eq!(cpus, vec![2, 0, 3, 1]);
        let mem: Vec<usize> = pool.candidates(names::MEM).collect();
        assert_eq!(mem, vec![4]);
    }

    #[test]
    fn ineligible_fragments_are_not_candidates() {
        let offer = Offer::new("o1", "host1")
            .with_resource(Resource::scalar(names::CPUS, 1.0).with_role("batch"));
        let pool = ResourcePool::new(&offer, &ResourceSelector::default());
        assert!(pool.is_empty());
        assert_eq!(pool.candidates(names::CPUS).count(), 0);
    }

    #[test]
    fn commit_reduces_remaining() {
        let offer = Offer::new("o1", "host1").with_resource(Resource::scalar(names::MEM, 256.0));
        let mut pool = ResourcePool::new(&offer, &ResourceSelector::default());
        pool.commit(&[Consumption {
            fragment: 0,
            amount: 100.0,
            role: "*".to_string(),
            reservation: None,
            disk: None,
        }]);
        assert_eq!(pool.remaining(0), 156.0);
    }
}
