//! matcher.toml configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::selector::ResourceSelector;

/// Settings for a matcher deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct MatcherConfig {
    /// Log filter directive used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
    pub gpu_scheduling: GpuSchedulingBehavior,
    /// Selector applied when the caller does not supply one.
    pub selector: ResourceSelector,
}

/// Whether workloads that need no GPUs may land on GPU agents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GpuSchedulingBehavior {
    /// Keep GPU agents for GPU workloads.
    #[default]
    Restricted,
    Unrestricted,
}

impl MatcherConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MatcherConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let config: MatcherConfig = toml::from_str("").unwrap();
        assert_eq!(config, MatcherConfig::default());
        assert_eq!(config.gpu_scheduling, GpuSchedulingBehavior::Restricted);
        assert_eq!(config.selector, ResourceSelector::any(["*"]));
    }

    #[test]
    fn parses_full_config() {
        let toml_str = r#"
log_filter = "debug"
gpu_scheduling = "unrestricted"

[selector]
policy = "reserved_with_labels"
roles = ["web"]
labels = { owner = "web" }
"#;
        let config: MatcherConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.log_filter.as_deref(), Some("debug"));
        assert_eq!(config.gpu_scheduling, GpuSchedulingBehavior::Unrestricted);
        let labels = BTreeMap::from([("owner".to_string(), "web".to_string())]);
        assert_eq!(
            config.selector,
            ResourceSelector::reserved_with_labels(["web"], labels)
        );
    }

    #[test]
    fn round_trips_through_file() {
        let config = MatcherConfig {
            log_filter: Some("info".to_string()),
            gpu_scheduling: GpuSchedulingBehavior::Unrestricted,
            selector: ResourceSelector::reservable(),
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes())
            .unwrap();

        let loaded = MatcherConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(MatcherConfig::from_file(&dir.path().join("matcher.toml")).is_err());
    }
}
