//! Workload specifications: what one instance needs from an offer.

use serde::{Deserialize, Serialize};

use crate::resource::DiskType;

/// Milliseconds since the unix epoch.
pub type Timestamp = u64;

// ── Workload ──────────────────────────────────────────────────────

/// Resource and placement requirements of one pending instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkloadSpec {
    pub id: String,
    #[serde(default)]
    pub cpus: f64,
    #[serde(default)]
    pub mem: f64,
    /// Scratch disk drawn from root disk fragments.
    #[serde(default)]
    pub disk: f64,
    #[serde(default)]
    pub gpus: f64,
    #[serde(default)]
    pub ports: PortRequest,
    #[serde(default)]
    pub volumes: Vec<PersistentVolumeRequest>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub version_info: VersionInfo,
}

impl WorkloadSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cpus: 0.0,
            mem: 0.0,
            disk: 0.0,
            gpus: 0.0,
            ports: PortRequest::default(),
            volumes: Vec::new(),
            constraints: Vec::new(),
            version_info: VersionInfo::default(),
        }
    }

    pub fn with_cpus(mut self, cpus: f64) -> Self {
        self.cpus = cpus;
        self
    }

    pub fn with_mem(mut self, mem: f64) -> Self {
        self.mem = mem;
        self
    }

    pub fn with_disk(mut self, disk: f64) -> Self {
        self.disk = disk;
        self
    }

    pub fn with_gpus(mut self, gpus: f64) -> Self {
        self.gpus = gpus;
        self
    }

    pub fn with_ports(mut self, ports: PortRequest) -> Self {
        self.ports = ports;
        self
    }

    pub fn with_volume(mut self, volume: PersistentVolumeRequest) -> Self {
        self.volumes.push(volume);
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_version_info(mut self, version_info: VersionInfo) -> Self {
        self.version_info = version_info;
        self
    }
}

// ── Ports ─────────────────────────────────────────────────────────

/// Host ports needed by an instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PortRequest {
    /// `n` host ports, any values.
    Wildcard(usize),
    /// Container port mappings, matched positionally.
    Mappings(Vec<PortMapping>),
}

impl Default for PortRequest {
    fn default() -> Self {
        PortRequest::Wildcard(0)
    }
}

impl PortRequest {
    /// Number of entries in the match result for this request.
    pub fn len(&self) -> usize {
        match self {
            PortRequest::Wildcard(n) => *n,
            PortRequest::Mappings(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of host ports the offer has to supply.
    pub fn host_port_count(&self) -> usize {
        match self {
            PortRequest::Wildcard(n) => *n,
            PortRequest::Mappings(m) => m.iter().filter(|m| m.host_port.is_some()).count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortMapping {
    #[serde(default)]
    pub container_port: u16,
    /// `None` when the mapping needs no host port at all.
    #[serde(default)]
    pub host_port: Option<HostPort>,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default)]
    pub name: Option<String>,
}

impl PortMapping {
    pub fn new(container_port: u16, host_port: Option<HostPort>) -> Self {
        Self {
            container_port,
            host_port,
            protocol: Protocol::default(),
            name: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HostPort {
    Fixed(u16),
    Any,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    #[serde(rename = "udp,tcp")]
    UdpTcp,
}

// ── Volumes ───────────────────────────────────────────────────────

/// A persistent volume to carve out of the offer's disk fragments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistentVolumeRequest {
    pub container_path: String,
    pub size: f64,
    /// Largest mount disk the volume is willing to take whole.
    #[serde(default)]
    pub max_size: Option<f64>,
    #[serde(default)]
    pub disk_type: DiskType,
    /// Constraints on the disk source, e.g. `path LIKE /ssd.*`.
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl PersistentVolumeRequest {
    pub fn new(container_path: impl Into<String>, size: f64, disk_type: DiskType) -> Self {
        Self {
            container_path: container_path.into(),
            size,
            max_size: None,
            disk_type,
            constraints: Vec::new(),
        }
    }

    pub fn with_max_size(mut self, max_size: f64) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

// ── Constraints ───────────────────────────────────────────────────

/// A placement rule: `field OPERATOR [value]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Constraint {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Option<String>,
}

impl Constraint {
    pub fn new(field: impl Into<String>, operator: Operator, value: Option<&str>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.map(str::to_string),
        }
    }
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{:?}", self.field, self.operator)?;
        if let Some(value) = &self.value {
            write!(f, ":{value}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Unique,
    Cluster,
    GroupBy,
    Like,
    Unlike,
    MaxPer,
    Is,
}

// ── Versions ──────────────────────────────────────────────────────

/// Version history of a workload, used to tell current instances from
/// ones an in-flight deployment is about to replace.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VersionInfo {
    /// First deployment; the configuration has never changed.
    OnlyVersion { version: Timestamp },
    Full {
        version: Timestamp,
        last_scaling_at: Timestamp,
        last_config_change_at: Timestamp,
    },
}

impl Default for VersionInfo {
    fn default() -> Self {
        VersionInfo::OnlyVersion { version: 0 }
    }
}

impl VersionInfo {
    pub fn version(&self) -> Timestamp {
        match self {
            VersionInfo::OnlyVersion { version } | VersionInfo::Full { version, .. } => *version,
        }
    }

    pub fn last_config_change_at(&self) -> Option<Timestamp> {
        match self {
            VersionInfo::OnlyVersion { .. } => None,
            VersionInfo::Full {
                last_config_change_at,
                ..
            } => Some(*last_config_change_at),
        }
    }
}
