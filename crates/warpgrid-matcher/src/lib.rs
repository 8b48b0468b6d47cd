//! warpgrid-matcher — decides whether one resource offer can host one
//! instance of a workload, and exactly which resources it would consume.
//!
//! The matcher is a pure function of its inputs: an [`Offer`], a
//! [`ResourceSelector`] policy, a [`WorkloadSpec`] and the workload's
//! already-placed instances. It keeps no state between calls and is safe
//! to call from any number of threads at once.
//!
//! # Components
//!
//! - **`selector`** — which fragments of an offer are candidates at all
//! - **`constraints`** — placement constraint evaluation (UNIQUE, CLUSTER, GROUP_BY, ...)
//! - **`staleness`** — which placed instances still count for constraints
//! - **`scalar`** — cpus, mem, gpus and scratch disk accounting
//! - **`ports`** — wildcard and mapped host port accounting
//! - **`disk`** — persistent volumes on root, path and mount disks
//! - **`matcher`** — orchestration, producing a [`MatchOutcome`]
//!
//! ```text
//! offer + selector ──► ResourcePool ──┬─► scalar ─┐
//!                                     ├─► disk ───┼─► ResourceMatch
//!                                     └─► ports ──┘
//! workload + placed instances ──► constraints (checked first)
//! ```
//!
//! [`Offer`]: warpgrid_offer::Offer
//! [`WorkloadSpec`]: warpgrid_offer::WorkloadSpec

pub mod config;
pub mod constraints;
pub mod disk;
pub mod error;
pub mod matcher;
pub mod ports;
pub mod scalar;
pub mod selector;
pub mod staleness;
pub mod types;
pub mod validate;

mod pool;

pub use config::{GpuSchedulingBehavior, MatcherConfig};
pub use constraints::{PlacementAttributes, PlacementConstraint, VolumeConstraint};
pub use error::{MatcherError, MatcherResult};
pub use matcher::{MatchOutcome, NoMatch, NoOfferMatchReason, match_offer, match_offer_with_config};
pub use selector::ResourceSelector;
pub use staleness::{counted_instances, is_stale};
pub use types::{Consumption, PortWithRole, PortsMatch, ResourceMatch, ScalarMatch, VolumeMatch};
pub use validate::{ValidatedWorkload, validate_workload};
