//! Resource selection policies.
//!
//! A selector decides which fragments of an offer may be considered at
//! all. It looks only at a fragment's role and reservation, never at its
//! amount.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use warpgrid_offer::{Resource, UNRESERVED_ROLE};

/// Which offer fragments are eligible for a match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ResourceSelector {
    /// Any fragment whose role is in `roles`, reserved or not.
    Any { roles: BTreeSet<String> },
    /// Fragments whose role is in `roles` and that are either unreserved or
    /// reserved with exactly `labels`.
    ReservedWithLabels {
        roles: BTreeSet<String>,
        #[serde(default)]
        labels: BTreeMap<String, String>,
    },
    /// Fragments that can be claimed for a new reservation: unreserved, or
    /// reserved without labels.
    Reservable,
}

impl Default for ResourceSelector {
    fn default() -> Self {
        Self::any([UNRESERVED_ROLE])
    }
}

impl ResourceSelector {
    pub fn any<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Any {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn reserved_with_labels<I, S>(roles: I, labels: BTreeMap<String, String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ReservedWithLabels {
            roles: roles.into_iter().map(Into::into).collect(),
            labels,
        }
    }

    pub fn reservable() -> Self {
        Self::Reservable
    }

    /// Whether the fragment may be used by this match.
    pub fn eligible(&self, resource: &Resource) -> bool {
        match self {
            Self::Any { roles } => roles.contains(&resource.role),
            Self::ReservedWithLabels { roles, labels } => {
                roles.contains(&resource.role)
                    && resource
                        .reservation
                        .as_ref()
                        .is_none_or(|r| r.has_labels(labels))
            }
            Self::Reservable => resource
                .reservation
                .as_ref()
                .is_none_or(|r| r.labels.is_empty()),
        }
    }
}

impl std::fmt::Display for ResourceSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any { roles } => write!(f, "any({roles:?})"),
            Self::ReservedWithLabels { roles, labels } => {
                write!(f, "reserved_with_labels({roles:?}, {labels:?})")
            }
            Self::Reservable => f.write_str("reservable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warpgrid_offer::{Reservation, names};

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn any_checks_role_only() {
        let selector = ResourceSelector::any(["*", "web"]);
        let reserved = Resource::scalar(names::CPUS, 1.0)
            .with_role("web")
            .with_reservation(Reservation::new("p").with_label("owner", "x"));

        assert!(selector.eligible(&Resource::scalar(names::CPUS, 1.0)));
        assert!(selector.eligible(&reserved));
        assert!(!selector.eligible(&Resource::scalar(names::CPUS, 1.0).with_role("batch")));
    }

    #[test]
    fn default_selects_unreserved_role() {
        let selector = ResourceSelector::default();
        assert!(selector.eligible(&Resource::scalar(names::MEM, 1.0)));
        assert!(!selector.eligible(&Resource::scalar(names::MEM, 1.0).with_role("web")));
    }

    #[test]
    fn reserved_with_labels_requires_exact_label_set() {
        let wanted = labels(&[("owner", "web"), ("volume", "data")]);
        let selector = ResourceSelector::reserved_with_labels(["web"], wanted);

        let exact = Resource::scalar(names::CPUS, 1.0).with_role("web").with_reservation(
            Reservation::new("p")
                .with_label("volume", "data")
                .with_label("owner", "web"),
        );
        let subset = Resource::scalar(names::CPUS, 1.0)
            .with_role("web")
            .with_reservation(Reservation::new("p").with_label("owner", "web"));
        let superset = Resource::scalar(names::CPUS, 1.0).with_role("web").with_reservation(
            Reservation::new("p")
                .with_label("owner", "web")
                .with_label("volume", "data")
                .with_label("extra", "1"),
        );
        let unreserved = Resource::scalar(names::CPUS, 1.0).with_role("web");

        assert!(selector.eligible(&exact));
        assert!(!selector.eligible(&subset));
        assert!(!selector.eligible(&superset));
        assert!(selector.eligible(&unreserved));
    }

    #[test]
    fn reserved_with_labels_still_checks_role() {
        let selector = ResourceSelector::reserved_with_labels(["web"], labels(&[("owner", "web")]));
        let wrong_role = Resource::scalar(names::CPUS, 1.0)
            .with_role("batch")
            .with_reservation(Reservation::new("p").with_label("owner", "web"));
        assert!(!selector.eligible(&wrong_role));
    }

    #[test]
    fn reservable_accepts_unlabelled_reservations() {
        let selector = ResourceSelector::reservable();
        let unlabelled = Resource::scalar(names::DISK, 10.0)
            .with_role("web")
            .with_reservation(Reservation::new("p"));
        let labelled = Resource::scalar(names::DISK, 10.0)
            .with_role("web")
            .with_reservation(Reservation::new("p").with_label("owner", "web"));

        assert!(selector.eligible(&Resource::scalar(names::DISK, 10.0)));
        assert!(selector.eligible(&unlabelled));
        assert!(!selector.eligible(&labelled));
    }

    #[test]
    fn deserializes_from_tagged_table() {
        let selector: ResourceSelector =
            toml::from_str("policy = \"any\"\nroles = [\"*\", \"web\"]\n").unwrap();
        assert_eq!(selector, ResourceSelector::any(["*", "web"]));

        let reservable: ResourceSelector = toml::from_str("policy = \"reservable\"\n").unwrap();
        assert_eq!(reservable, ResourceSelector::Reservable);
    }
}
