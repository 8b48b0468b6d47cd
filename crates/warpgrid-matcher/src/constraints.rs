//! Placement constraint evaluation.
//!
//! A constraint reads one field (the hostname, a fault-domain level or an
//! agent attribute) from the offer and from each counted placed instance,
//! then applies its operator. Constraints are compiled once per match so
//! that malformed values and patterns surface as errors before any offer
//! is judged.
//!
//! An offer that lacks the constrained field satisfies only `UNLIKE`.

use regex::Regex;
use warpgrid_offer::{Constraint, FaultDomain, Offer, Operator, PlacedInstance};

use crate::error::{MatcherError, MatcherResult};

/// Field name addressing the agent's hostname.
pub const HOSTNAME_FIELD: &str = "hostname";
/// Field name addressing a disk source's path in volume constraints.
pub const PATH_FIELD: &str = "path";

/// Read access to the fields constraints can test.
pub trait PlacementAttributes {
    fn hostname(&self) -> &str;
    fn attribute(&self, name: &str) -> Option<&str>;
    fn domain(&self) -> Option<&FaultDomain>;
}

impl PlacementAttributes for Offer {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn domain(&self) -> Option<&FaultDomain> {
        self.domain.as_ref()
    }
}

impl PlacementAttributes for PlacedInstance {
    fn hostname(&self) -> &str {
        &self.agent.hostname
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.agent.attributes.get(name).map(String::as_str)
    }

    fn domain(&self) -> Option<&FaultDomain> {
        self.agent.domain.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Hostname,
    Region,
    Zone,
    Attribute(String),
}

impl Field {
    fn parse(name: &str) -> Self {
        match name {
            HOSTNAME_FIELD | "@hostname" => Field::Hostname,
            "@region" => Field::Region,
            "@zone" => Field::Zone,
            other => Field::Attribute(other.to_string()),
        }
    }

    fn read<'a, S: PlacementAttributes + ?Sized>(&self, source: &'a S) -> Option<&'a str> {
        match self {
            Field::Hostname => Some(source.hostname()),
            Field::Region => source.domain().map(|d| d.region.as_str()),
            Field::Zone => source.domain().map(|d| d.zone.as_str()),
            Field::Attribute(name) => source.attribute(name),
        }
    }
}

/// Operator with its parsed argument.
#[derive(Debug, Clone)]
enum Rule {
    Unique,
    Cluster(Option<String>),
    /// Target number of groups; zero means "as many as observed".
    GroupBy(usize),
    Like(Regex),
    Unlike(Regex),
    MaxPer(usize),
    Is(String),
}

impl Rule {
    fn compile(constraint: &Constraint) -> MatcherResult<Self> {
        let value = constraint.value.as_deref();
        let rule = match constraint.operator {
            Operator::Unique => Rule::Unique,
            Operator::Cluster => Rule::Cluster(value.filter(|v| !v.is_empty()).map(str::to_string)),
            Operator::GroupBy => Rule::GroupBy(match value {
                None | Some("") => 0,
                Some(v) => parse_count(constraint, v)?,
            }),
            Operator::Like => Rule::Like(compile_pattern(constraint, required(constraint)?)?),
            Operator::Unlike => Rule::Unlike(compile_pattern(constraint, required(constraint)?)?),
            Operator::MaxPer => {
                let limit = parse_count(constraint, required(constraint)?)?;
                if limit == 0 {
                    return Err(MatcherError::InvalidConstraint(format!(
                        "{constraint}: MAX_PER needs a positive limit"
                    )));
                }
                Rule::MaxPer(limit)
            }
            Operator::Is => Rule::Is(required(constraint)?.to_string()),
        };
        Ok(rule)
    }

    /// Evaluate operators that only look at the candidate's own value.
    fn matches_value(&self, value: Option<&str>) -> Option<bool> {
        match self {
            Rule::Like(re) => Some(value.is_some_and(|v| re.is_match(v))),
            Rule::Unlike(re) => Some(!value.is_some_and(|v| re.is_match(v))),
            Rule::Is(expected) => Some(value == Some(expected.as_str())),
            _ => None,
        }
    }
}

fn required(constraint: &Constraint) -> MatcherResult<&str> {
    constraint.value.as_deref().ok_or_else(|| {
        MatcherError::InvalidConstraint(format!("{constraint}: operator requires a value"))
    })
}

fn parse_count(constraint: &Constraint, value: &str) -> MatcherResult<usize> {
    value.trim().parse().map_err(|_| {
        MatcherError::InvalidConstraint(format!(
            "{constraint}: expected a non-negative integer, got {value:?}"
        ))
    })
}

/// Patterns must match the whole value.
fn compile_pattern(constraint: &Constraint, pattern: &str) -> MatcherResult<Regex> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| MatcherError::InvalidPattern {
        constraint: constraint.to_string(),
        source,
    })
}

// ── Placement constraints ─────────────────────────────────────────

/// A compiled placement constraint.
#[derive(Debug, Clone)]
pub struct PlacementConstraint {
    constraint: Constraint,
    field: Field,
    rule: Rule,
}

impl PlacementConstraint {
    pub fn compile(constraint: &Constraint) -> MatcherResult<Self> {
        Ok(Self {
            constraint: constraint.clone(),
            field: Field::parse(&constraint.field),
            rule: Rule::compile(constraint)?,
        })
    }

    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    /// Whether placing one more instance on `offer` keeps the constraint,
    /// given the instances that currently count.
    pub fn is_satisfied(&self, offer: &Offer, placed: &[&PlacedInstance]) -> bool {
        let offer_value = self.field.read(offer);
        if let Some(matched) = self.rule.matches_value(offer_value) {
            return matched;
        }
        let Some(offer_value) = offer_value else {
            return false;
        };

        let placed_values: Vec<&str> = placed.iter().filter_map(|i| self.field.read(*i)).collect();
        match &self.rule {
            Rule::Unique => unique(offer_value, &placed_values),
            Rule::Cluster(Some(expected)) => offer_value == expected,
            // Every counted instance must share the offer's value, including
            // instances that lack the field.
            Rule::Cluster(None) => placed
                .iter()
                .all(|i| self.field.read(*i) == Some(offer_value)),
            Rule::GroupBy(target) => group_by(offer_value, *target, &placed_values),
            Rule::MaxPer(limit) => max_per(offer_value, *limit, &placed_values),
            Rule::Like(_) | Rule::Unlike(_) | Rule::Is(_) => unreachable!("handled by matches_value"),
        }
    }
}

fn unique(offer_value: &str, placed: &[&str]) -> bool {
    !placed.contains(&offer_value)
}

fn group_by(offer_value: &str, target: usize, placed: &[&str]) -> bool {
    let groups = group_counts(placed);
    let Some(&(_, count)) = groups.iter().find(|(v, _)| *v == offer_value) else {
        // Unseen group.
        return true;
    };
    let min = groups.iter().map(|(_, c)| *c).min().unwrap_or(0);
    groups.len() >= target && count == min
}

fn max_per(offer_value: &str, limit: usize, placed: &[&str]) -> bool {
    placed.iter().filter(|v| **v == offer_value).count() < limit
}

/// Instance count per field value, in order of first appearance.
fn group_counts<'a>(values: &[&'a str]) -> Vec<(&'a str, usize)> {
    let mut groups: Vec<(&str, usize)> = Vec::new();
    for value in values {
        match groups.iter_mut().find(|(v, _)| v == value) {
            Some((_, count)) => *count += 1,
            None => groups.push((*value, 1)),
        }
    }
    groups
}

// ── Volume constraints ────────────────────────────────────────────

/// A compiled constraint on a persistent volume's disk source.
///
/// Only the `path` field is addressable, with `LIKE`, `UNLIKE` or `IS`.
#[derive(Debug, Clone)]
pub struct VolumeConstraint {
    rule: Rule,
}

impl VolumeConstraint {
    pub fn compile(constraint: &Constraint) -> MatcherResult<Self> {
        if constraint.field != PATH_FIELD {
            return Err(MatcherError::InvalidConstraint(format!(
                "{constraint}: volume constraints may only test {PATH_FIELD:?}"
            )));
        }
        if !matches!(
            constraint.operator,
            Operator::Like | Operator::Unlike | Operator::Is
        ) {
            return Err(MatcherError::InvalidConstraint(format!(
                "{constraint}: volume constraints support LIKE, UNLIKE and IS only"
            )));
        }
        Ok(Self {
            rule: Rule::compile(constraint)?,
        })
    }

    /// Whether a disk with this path (`None` for root disks) is acceptable.
    pub fn accepts(&self, path: Option<&str>) -> bool {
        self.rule.matches_value(path).unwrap_or(false)
    }
}
