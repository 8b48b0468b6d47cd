use std::path::Path;

use tracing::debug;
use warpgrid_matcher::{MatchOutcome, MatcherConfig, ResourceSelector, match_offer_with_config};
use warpgrid_offer::{Offer, PlacedInstance, WorkloadSpec};

use super::read_json;

/// Run the matcher on files and print the outcome. Returns whether the offer matched.
pub fn run(
    config: &MatcherConfig,
    offer_path: &Path,
    workload_path: &Path,
    instances_path: Option<&Path>,
    roles: &[String],
) -> anyhow::Result<bool> {
    let outcome = evaluate(config, offer_path, workload_path, instances_path, roles)?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(outcome.is_match())
}

pub fn evaluate(
    config: &MatcherConfig,
    offer_path: &Path,
    workload_path: &Path,
    instances_path: Option<&Path>,
    roles: &[String],
) -> anyhow::Result<MatchOutcome> {
    let offer: Offer = read_json(offer_path)?;
    let spec: WorkloadSpec = read_json(workload_path)?;
    let placed: Vec<PlacedInstance> = match instances_path {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    let selector = if roles.is_empty() {
        config.selector.clone()
    } else {
        ResourceSelector::any(roles.iter().cloned())
    };
    debug!(
        offer = %offer.id,
        workload = %spec.id,
        placed = placed.len(),
        selector = %selector,
        "matching offer"
    );

    Ok(match_offer_with_config(&offer, &selector, &spec, &placed, config)?)
}
