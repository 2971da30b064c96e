//! Aggregation orchestration for InsightMatch.
//!
//! This crate ties together identity derivation, the registry, news and
//! homepage collectors, and social mentions into one [`AggregationResult`].
//!
//! [`AggregationResult`]: insightmatch_shared::AggregationResult

pub mod aggregate;
pub mod identity;
pub mod social;

pub use aggregate::{Aggregator, ProgressReporter, SilentProgress};
pub use identity::{identify, resolve_identity};
pub use social::{sample_social, social_mentions};
