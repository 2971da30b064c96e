//! Shared types, error model, and configuration for InsightMatch.
//!
//! This crate is the foundation depended on by all other InsightMatch crates.
//! It provides:
//! - [`InsightMatchError`]: the unified error type
//! - Domain types ([`AggregationResult`], [`FilingRecord`], [`NewsItem`],
//!   [`WebsiteProfile`]) and the [`SourceOutcome`] wrapper
//! - Configuration ([`AppConfig`], runtime configs, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AggregationConfig, AggregationSection, AppConfig, MatchStrategy, NewsConfig, NewsSection,
    RegistryConfig, RegistrySection, ScraperConfig, ScraperSection, config_dir, config_file_path,
    init_config, load_config, load_config_from, registry_api_key,
};
pub use error::{InsightMatchError, Result};
pub use types::{
    AggregationResult, AggregationStatus, CompanyIdentity, ContactInfo, DegradeReason,
    FilingRecord, LegalInfo, NewsItem, ProfileStatus, RegistryEntry, SocialMention, SourceKind,
    SourceOutcome, SourceReport, SourceState, SourceTag, UNKNOWN_COMPANY, WebsiteProfile,
};
