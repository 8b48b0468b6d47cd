//! Offers and the resource fragments they carry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role of resources that are not partitioned for any particular role.
pub const UNRESERVED_ROLE: &str = "*";

/// Well-known resource names.
pub mod names {
    pub const CPUS: &str = "cpus";
    pub const MEM: &str = "mem";
    pub const DISK: &str = "disk";
    pub const GPUS: &str = "gpus";
    pub const PORTS: &str = "ports";
}

// ── Offer ─────────────────────────────────────────────────────────

/// A bundle of resources available on one agent for a bounded time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Offer {
    pub id: String,
    pub agent_id: String,
    pub hostname: String,
    /// Agent attributes, rendered as text.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Fault domain of the agent, if the resource manager reports one.
    #[serde(default)]
    pub domain: Option<FaultDomain>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl Offer {
    pub fn new(id: impl Into<String>, hostname: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            agent_id: format!("{id}-agent"),
            id,
            hostname: hostname.into(),
            attributes: BTreeMap::new(),
            domain: None,
            resources: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_domain(mut self, region: impl Into<String>, zone: impl Into<String>) -> Self {
        self.domain = Some(FaultDomain {
            region: region.into(),
            zone: zone.into(),
        });
        self
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Sum of all scalar fragments with the given name, regardless of role.
    pub fn scalar_total(&self, name: &str) -> f64 {
        self.resources
            .iter()
            .filter(|r| r.name == name)
            .filter_map(Resource::scalar_value)
            .sum()
    }
}

/// Region and zone an agent lives in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FaultDomain {
    pub region: String,
    pub zone: String,
}

// ── Resource fragment ─────────────────────────────────────────────

/// One named resource entry within an offer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub name: String,
    pub value: ResourceValue,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub reservation: Option<Reservation>,
    /// Only meaningful for `disk`. Absent means a root disk.
    #[serde(default)]
    pub disk: Option<DiskSource>,
}

fn default_role() -> String {
    UNRESERVED_ROLE.to_string()
}

/// Value carried by a fragment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ResourceValue {
    Scalar(f64),
    Ranges(Vec<ValueRange>),
}

/// Inclusive integer range, e.g. a block of port numbers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct ValueRange {
    pub begin: u64,
    pub end: u64,
}

impl ValueRange {
    pub fn new(begin: u64, end: u64) -> Self {
        Self { begin, end }
    }

    pub fn contains(&self, value: u64) -> bool {
        self.begin <= value && value <= self.end
    }

    /// Number of values in the range; zero for an inverted range.
    pub fn len(&self) -> u64 {
        if self.end < self.begin {
            0
        } else {
            self.end - self.begin + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Resource {
    pub fn scalar(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: ResourceValue::Scalar(value),
            role: default_role(),
            reservation: None,
            disk: None,
        }
    }

    pub fn ranges(name: impl Into<String>, ranges: impl IntoIterator<Item = (u64, u64)>) -> Self {
        Self {
            name: name.into(),
            value: ResourceValue::Ranges(
                ranges
                    .into_iter()
                    .map(|(begin, end)| ValueRange::new(begin, end))
                    .collect(),
            ),
            role: default_role(),
            reservation: None,
            disk: None,
        }
    }

    /// A disk fragment backed by the given source.
    pub fn disk(size: f64, source: DiskSource) -> Self {
        Self {
            disk: Some(source),
            ..Self::scalar(names::DISK, size)
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn with_reservation(mut self, reservation: Reservation) -> Self {
        self.reservation = Some(reservation);
        self
    }

    pub fn scalar_value(&self) -> Option<f64> {
        match self.value {
            ResourceValue::Scalar(v) => Some(v),
            ResourceValue::Ranges(_) => None,
        }
    }

    pub fn range_values(&self) -> Option<&[ValueRange]> {
        match &self.value {
            ResourceValue::Ranges(r) => Some(r),
            ResourceValue::Scalar(_) => None,
        }
    }

    /// Kind of disk this fragment represents; fragments without a source are root disks.
    pub fn disk_type(&self) -> DiskType {
        self.disk.as_ref().map_or(DiskType::Root, DiskSource::disk_type)
    }

    /// Filesystem path of a path or mount disk.
    pub fn disk_path(&self) -> Option<&str> {
        self.disk.as_ref().and_then(DiskSource::path)
    }
}

// ── Reservation ───────────────────────────────────────────────────

/// A sticky claim on a fragment. Matching identity is the label set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Reservation {
    pub principal: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Reservation {
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Whether this reservation was made with exactly these labels.
    pub fn has_labels(&self, labels: &BTreeMap<String, String>) -> bool {
        &self.labels == labels
    }
}

// ── Disk ──────────────────────────────────────────────────────────

/// Physical nature of a disk fragment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiskSource {
    /// The agent's general work directory. Freely fragmentable.
    Root,
    /// A dedicated filesystem path. Fragmentable only within that path.
    Path { root: String },
    /// A whole mounted device. Consumed atomically.
    Mount { root: String },
}

impl DiskSource {
    pub fn disk_type(&self) -> DiskType {
        match self {
            DiskSource::Root => DiskType::Root,
            DiskSource::Path { .. } => DiskType::Path,
            DiskSource::Mount { .. } => DiskType::Mount,
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            DiskSource::Root => None,
            DiskSource::Path { root } | DiskSource::Mount { root } => Some(root),
        }
    }
}

/// Disk kind requested by a persistent volume.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiskType {
    #[default]
    Root,
    Path,
    Mount,
}

impl std::fmt::Display for DiskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DiskType::Root => "root",
            DiskType::Path => "path",
            DiskType::Mount => "mount",
        };
        f.write_str(s)
    }
}
