//! Offer matching — the orchestrating entry point.
//!
//! Given one offer, a selector, a workload and its placed instances,
//! [`match_offer`] either returns the exact resources one more instance
//! would consume, or the reasons the offer cannot host it:
//!
//! 1. Validate the workload and compile its constraints (errors are the
//!    caller's bug and are returned as [`MatcherError`](crate::MatcherError)).
//! 2. Check placement constraints against the counted instances. The first
//!    violation ends the match.
//! 3. Decline GPU agents for workloads without GPUs, when restricted.
//! 4. Match cpus, mem, gpus, scratch disk, each volume and the ports
//!    against one shared pool, collecting every shortfall.
//!
//! Matches are all-or-nothing: any shortfall discards the whole attempt.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use warpgrid_offer::{Offer, PlacedInstance, WorkloadSpec, names};

use crate::config::{GpuSchedulingBehavior, MatcherConfig};
use crate::disk::match_volume;
use crate::error::MatcherResult;
use crate::pool::ResourcePool;
use crate::ports::match_ports;
use crate::scalar::match_scalar;
use crate::selector::ResourceSelector;
use crate::staleness::counted_instances;
use crate::types::{ResourceMatch, ScalarMatch};
use crate::validate::validate_workload;

/// Why an offer cannot host a workload instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoOfferMatchReason {
    /// No fragment of the offer passes the selector.
    UnfulfilledRole,
    UnfulfilledConstraint,
    InsufficientCpus,
    InsufficientMemory,
    InsufficientGpus,
    InsufficientDisk,
    InsufficientPorts,
    InsufficientVolumeDisk,
    /// The offer carries GPUs and the workload needs none.
    DeclinedScarceResources,
}

/// The reasons behind a failed match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoMatch {
    pub offer_id: String,
    pub reasons: Vec<NoOfferMatchReason>,
}

/// Result of matching one offer against one workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MatchOutcome {
    Matched(ResourceMatch),
    NoMatch(NoMatch),
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Matched(_))
    }

    pub fn resource_match(&self) -> Option<&ResourceMatch> {
        match self {
            MatchOutcome::Matched(m) => Some(m),
            MatchOutcome::NoMatch(_) => None,
        }
    }

    pub fn reasons(&self) -> &[NoOfferMatchReason] {
        match self {
            MatchOutcome::Matched(_) => &[],
            MatchOutcome::NoMatch(n) => &n.reasons,
        }
    }
}

/// Match an offer with the default configuration.
pub fn match_offer(
    offer: &Offer,
    selector: &ResourceSelector,
    spec: &WorkloadSpec,
    placed: &[PlacedInstance],
) -> MatcherResult<MatchOutcome> {
    match_offer_with_config(offer, selector, spec, placed, &MatcherConfig::default())
}

/// Match an offer against a workload.
pub fn match_offer_with_config(
    offer: &Offer,
    selector: &ResourceSelector,
    spec: &WorkloadSpec,
    placed: &[PlacedInstance],
    config: &MatcherConfig,
) -> MatcherResult<MatchOutcome> {
    let validated = validate_workload(spec)?;
    let no_match = |reasons: Vec<NoOfferMatchReason>| {
        debug!(
            offer = %offer.id,
            workload = %spec.id,
            reasons = ?reasons,
            "offer does not match"
        );
        Ok(MatchOutcome::NoMatch(NoMatch {
            offer_id: offer.id.clone(),
            reasons,
        }))
    };

    let counted = counted_instances(placed, &spec.version_info);
    if let Some(violated) = validated
        .placement_constraints()
        .iter()
        .find(|c| !c.is_satisfied(offer, &counted))
    {
        debug!(
            offer = %offer.id,
            workload = %spec.id,
            constraint = %violated.constraint(),
            counted = counted.len(),
            "placement constraint violated"
        );
        return no_match(vec![NoOfferMatchReason::UnfulfilledConstraint]);
    }

    if config.gpu_scheduling == GpuSchedulingBehavior::Restricted
        && spec.gpus <= 0.0
        && offer.scalar_total(names::GPUS) > 0.0
    {
        return no_match(vec![NoOfferMatchReason::DeclinedScarceResources]);
    }

    let mut pool = ResourcePool::new(offer, selector);
    let mut reasons = Vec::new();
    if pool.is_empty() && requires_resources(spec) {
        reasons.push(NoOfferMatchReason::UnfulfilledRole);
    }

    let mut scalars: Vec<ScalarMatch> = Vec::with_capacity(4);
    for (name, amount, shortfall) in [
        (names::CPUS, spec.cpus, NoOfferMatchReason::InsufficientCpus),
        (names::MEM, spec.mem, NoOfferMatchReason::InsufficientMemory),
        (names::GPUS, spec.gpus, NoOfferMatchReason::InsufficientGpus),
        (names::DISK, spec.disk, NoOfferMatchReason::InsufficientDisk),
    ] {
        match match_scalar(&pool, name, amount) {
            Some(m) => {
                pool.commit(&m.consumptions);
                scalars.push(m);
            }
            None => reasons.push(shortfall),
        }
    }

    let mut volumes = Vec::with_capacity(spec.volumes.len());
    for (i, volume) in spec.volumes.iter().enumerate() {
        match match_volume(&pool, volume, validated.volume_constraints(i)) {
            Some(m) => {
                pool.commit(&m.consumptions);
                volumes.push(m);
            }
            None => {
                if !reasons.contains(&NoOfferMatchReason::InsufficientVolumeDisk) {
                    reasons.push(NoOfferMatchReason::InsufficientVolumeDisk);
                }
            }
        }
    }

    let ports = match_ports(&pool, &spec.ports);
    if ports.is_none() {
        reasons.push(NoOfferMatchReason::InsufficientPorts);
    }

    match ports {
        Some(ports) if reasons.is_empty() => {
            info!(
                offer = %offer.id,
                workload = %spec.id,
                selector = %selector,
                volumes = volumes.len(),
                "offer matched"
            );
            Ok(MatchOutcome::Matched(ResourceMatch {
                scalars,
                ports,
                volumes,
            }))
        }
        _ => no_match(reasons),
    }
}

fn requires_resources(spec: &WorkloadSpec) -> bool {
    spec.cpus > 0.0
        || spec.mem > 0.0
        || spec.disk > 0.0
        || spec.gpus > 0.0
        || !spec.volumes.is_empty()
        || spec.ports.host_port_count() > 0
}
