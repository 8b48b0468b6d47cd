//! warpgrid-offer — the decoded form of resource offers and the workloads
//! matched against them.
//!
//! Offers arrive from the remote resource manager already decoded into
//! [`Offer`] values: a bag of [`Resource`] fragments (scalars and ranges),
//! each tagged with a role and an optional [`Reservation`], plus the agent's
//! hostname and attributes. A [`WorkloadSpec`] describes what one instance
//! of a workload needs, and [`PlacedInstance`] records where its siblings
//! already run.
//!
//! Everything here is plain data. Matching lives in `warpgrid-matcher`.

pub mod instance;
pub mod resource;
pub mod workload;

pub use instance::{AgentInfo, InstanceCondition, PlacedInstance};
pub use resource::{
    DiskSource, DiskType, FaultDomain, Offer, Reservation, Resource, ResourceValue, ValueRange,
    UNRESERVED_ROLE, names,
};
pub use workload::{
    Constraint, HostPort, Operator, PersistentVolumeRequest, PortMapping, PortRequest, Protocol,
    Timestamp, VersionInfo, WorkloadSpec,
};
