//! Matcher error types.
//!
//! An offer that cannot host a workload is not an error; see
//! [`MatchOutcome::NoMatch`](crate::MatchOutcome::NoMatch). These errors
//! mean the caller handed the matcher a malformed workload.

use thiserror::Error;

/// Errors that can occur while matching an offer.
#[derive(Debug, Error)]
pub enum MatcherError {
    #[error("invalid resource requirement: {0}")]
    InvalidResource(String),

    #[error("invalid volume: {0}")]
    InvalidVolume(String),

    #[error("invalid constraint: {0}")]
    InvalidConstraint(String),

    #[error("invalid pattern in constraint {constraint}: {source}")]
    InvalidPattern {
        constraint: String,
        #[source]
        source: regex::Error,
    },
}

pub type MatcherResult<T> = Result<T, MatcherError>;
