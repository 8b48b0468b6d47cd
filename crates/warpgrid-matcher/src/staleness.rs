//! Which placed instances count towards placement constraints.
//!
//! During a deployment the instances launched before the last
//! configuration change are about to be replaced, so they no longer hold
//! their spot. Terminal instances never do.

use warpgrid_offer::{PlacedInstance, VersionInfo};

/// Whether `instance` belongs to a configuration older than the workload's current one.
///
/// Instances launched at or after the last config change are current. A
/// workload that has never changed configuration has no stale instances.
pub fn is_stale(instance: &PlacedInstance, version_info: &VersionInfo) -> bool {
    match version_info.last_config_change_at() {
        Some(changed_at) => instance.run_spec_version < changed_at,
        None => false,
    }
}

/// Instances that constraints should count: active and not stale.
pub fn counted_instances<'a>(
    placed: &'a [PlacedInstance],
    version_info: &VersionInfo,
) -> Vec<&'a PlacedInstance> {
    placed
        .iter()
        .filter(|i| i.condition.is_active() && !is_stale(i, version_info))
        .collect()
}
