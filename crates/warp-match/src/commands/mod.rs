use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use warpgrid_matcher::MatcherConfig;

pub mod matching;

pub fn load_config(path: &Path) -> anyhow::Result<MatcherConfig> {
    MatcherConfig::from_file(path)
        .with_context(|| format!("failed to load config from {}", path.display()))
}

/// Read and decode a JSON input file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}
