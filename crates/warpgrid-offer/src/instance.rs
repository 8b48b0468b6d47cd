//! Instances of a workload that are already placed in the cluster.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::resource::FaultDomain;
use crate::workload::Timestamp;

/// An existing sibling instance, as seen by placement constraints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlacedInstance {
    pub instance_id: String,
    pub agent: AgentInfo,
    /// Version of the workload configuration this instance was launched with.
    pub run_spec_version: Timestamp,
    #[serde(default)]
    pub condition: InstanceCondition,
}

impl PlacedInstance {
    pub fn new(instance_id: impl Into<String>, hostname: impl Into<String>, version: Timestamp) -> Self {
        Self {
            instance_id: instance_id.into(),
            agent: AgentInfo {
                hostname: hostname.into(),
                attributes: BTreeMap::new(),
                domain: None,
            },
            run_spec_version: version,
            condition: InstanceCondition::Running,
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.agent.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_domain(mut self, region: impl Into<String>, zone: impl Into<String>) -> Self {
        self.agent.domain = Some(FaultDomain {
            region: region.into(),
            zone: zone.into(),
        });
        self
    }

    pub fn with_condition(mut self, condition: InstanceCondition) -> Self {
        self.condition = condition;
        self
    }
}

/// The agent an instance runs on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentInfo {
    pub hostname: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub domain: Option<FaultDomain>,
}

/// Lifecycle condition of a placed instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InstanceCondition {
    Staging,
    Starting,
    #[default]
    Running,
    Unreachable,
    Finished,
    Failed,
    Killed,
    Gone,
}

impl InstanceCondition {
    /// Whether the instance still occupies its placement.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            InstanceCondition::Staging
                | InstanceCondition::Starting
                | InstanceCondition::Running
                | InstanceCondition::Unreachable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_conditions_are_inactive() {
        assert!(InstanceCondition::Running.is_active());
        assert!(InstanceCondition::Unreachable.is_active());
        assert!(!InstanceCondition::Finished.is_active());
        assert!(!InstanceCondition::Killed.is_active());
        assert!(!InstanceCondition::Gone.is_active());
    }

    #[test]
    fn builder_sets_agent_fields() {
        let inst = PlacedInstance::new("i1", "host1", 10)
            .with_attribute("rack", "r1")
            .with_domain("us-east", "us-east-1a");
        assert_eq!(inst.agent.hostname, "host1");
        assert_eq!(inst.agent.attributes.get("rack").map(String::as_str), Some("r1"));
        assert_eq!(inst.agent.domain.as_ref().map(|d| d.zone.as_str()), Some("us-east-1a"));
        assert_eq!(inst.condition, InstanceCondition::Running);
    }
}
