//! Core domain types for the aggregation pipeline.
//!
//! Field names on the serialized forms are consumed by downstream
//! collaborators (risk scorer, persistence), so the wire names follow the
//! historical naming (`dart`, `crawl_date`, `company_info`, ...) even where
//! the Rust field names differ.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InsightMatchError;

/// Sentinel name used when no company name can be derived from a URL.
pub const UNKNOWN_COMPANY: &str = "Unknown Company";

// ---------------------------------------------------------------------------
// CompanyIdentity
// ---------------------------------------------------------------------------

/// The company a request is about. Created once per aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyIdentity {
    /// The homepage URL exactly as supplied.
    pub raw_url: String,
    /// Company name used as the key for every downstream lookup.
    pub normalized_name: String,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// One row of the bulk registry export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Stable registry identifier (DART `corp_code`).
    pub registry_id: String,
    /// Registered legal name.
    pub legal_name: String,
    /// Exchange ticker, for listed companies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_code: Option<String>,
}

// ---------------------------------------------------------------------------
// Collected records
// ---------------------------------------------------------------------------

/// Which source produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceTag {
    /// Regulatory filing index.
    #[serde(rename = "dart")]
    Filing,
    #[serde(rename = "news")]
    News,
    #[serde(rename = "social")]
    Social,
}

/// A regulatory filing associated with a registry identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingRecord {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(rename = "source")]
    pub source_tag: SourceTag,
    pub date: String,
    /// Report name / filing category.
    #[serde(rename = "type")]
    pub filing_type: String,
    /// Receipt number of the filing.
    #[serde(rename = "rcp_no")]
    pub reference_number: String,
}

/// A news article found by one of the collector's queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(rename = "source")]
    pub source_tag: SourceTag,
    pub date: String,
    /// The query that first produced this item.
    #[serde(rename = "query")]
    pub originating_query: String,
}

/// A social-media mention of the company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialMention {
    pub title: String,
    pub url: String,
    pub snippet: String,
    #[serde(rename = "source")]
    pub source_tag: SourceTag,
    pub date: String,
}

// ---------------------------------------------------------------------------
// WebsiteProfile
// ---------------------------------------------------------------------------

/// Whether a website profile came from the live page or from samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    Success,
    Error,
}

/// Legal details found in the page text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_name: Option<String>,
    #[serde(
        default,
        rename = "business_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub registration_number: Option<String>,
    #[serde(default, rename = "ceo", skip_serializing_if = "Option::is_none")]
    pub ceo_name: Option<String>,
}

/// Contact details found in the page text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    /// At most 3.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phones: Vec<String>,
    /// At most 3.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<String>,
    /// At most 2.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
}

/// Structured profile scraped from a company homepage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebsiteProfile {
    pub url: String,
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    #[serde(rename = "company_info")]
    pub legal_info: LegalInfo,
    pub contact_info: ContactInfo,
    /// At most 5.
    pub social_links: Vec<String>,
    pub status: ProfileStatus,
    #[serde(rename = "last_updated")]
    pub fetched_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// SourceOutcome
// ---------------------------------------------------------------------------

/// Why a source returned sample data instead of live data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DegradeReason {
    /// No API credential configured for the source.
    MissingCredential,
    /// The company could not be found in the registry index.
    ResolutionMiss,
    /// Network failure, timeout inside the client, or non-2xx status.
    Transport(String),
    /// The upstream payload could not be decoded.
    Decode(String),
    /// Every request succeeded but nothing usable came back.
    NoResults,
    /// The per-source timeout or the overall deadline elapsed.
    TimedOut,
    /// The collection task panicked or was aborted.
    TaskFailed(String),
    /// The source has no live collector.
    NotCollected,
}

impl From<&InsightMatchError> for DegradeReason {
    fn from(err: &InsightMatchError) -> Self {
        match err {
            InsightMatchError::Transport(msg) => Self::Transport(msg.clone()),
            InsightMatchError::Decode { message } => Self::Decode(message.clone()),
            InsightMatchError::ResolutionMiss { .. } => Self::ResolutionMiss,
            other => Self::TaskFailed(other.to_string()),
        }
    }
}

impl std::fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "no credential configured"),
            Self::ResolutionMiss => write!(f, "company not found in registry"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Decode(msg) => write!(f, "decode: {msg}"),
            Self::NoResults => write!(f, "no results"),
            Self::TimedOut => write!(f, "timed out"),
            Self::TaskFailed(msg) => write!(f, "task failed: {msg}"),
            Self::NotCollected => write!(f, "not collected"),
        }
    }
}

/// Result of one sub-collector: live data, or sample data plus the reason.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome<T> {
    Fresh(T),
    Degraded { value: T, reason: DegradeReason },
}

impl<T> SourceOutcome<T> {
    /// Wrap a sample value with the reason it replaced live data.
    pub fn degraded(value: T, reason: DegradeReason) -> Self {
        Self::Degraded { value, reason }
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Fresh(value) | Self::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Fresh(value) | Self::Degraded { value, .. } => value,
        }
    }

    /// The degrade reason, or `None` for live data.
    pub fn reason(&self) -> Option<&DegradeReason> {
        match self {
            Self::Fresh(_) => None,
            Self::Degraded { reason, .. } => Some(reason),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Split into the value and a report row for `source`.
    pub fn into_report(self, source: SourceKind) -> (T, SourceReport) {
        match self {
            Self::Fresh(value) => (
                value,
                SourceReport {
                    source,
                    state: SourceState::Fresh,
                    reason: None,
                },
            ),
            Self::Degraded { value, reason } => (
                value,
                SourceReport {
                    source,
                    state: SourceState::Degraded,
                    reason: Some(reason),
                },
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// AggregationResult
// ---------------------------------------------------------------------------

/// The data sources an aggregation draws on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Filings,
    News,
    Website,
    Social,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filings => "filings",
            Self::News => "news",
            Self::Website => "website",
            Self::Social => "social",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceState {
    Fresh,
    Degraded,
}

/// Per-source diagnostics attached to an [`AggregationResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: SourceKind,
    pub state: SourceState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<DegradeReason>,
}

/// Overall aggregation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationStatus {
    Success,
    Error,
}

/// Everything the pipeline gathered about one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub company: String,
    #[serde(rename = "homepage")]
    pub homepage_url: String,
    #[serde(rename = "dart")]
    pub filings: Vec<FilingRecord>,
    pub news: Vec<NewsItem>,
    #[serde(rename = "social")]
    pub social_mentions: Vec<SocialMention>,
    /// `None` only on the skeleton-failure path.
    pub website: Option<WebsiteProfile>,
    #[serde(rename = "crawl_date")]
    pub fetched_at: DateTime<Utc>,
    pub status: AggregationStatus,
    #[serde(default, rename = "error", skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceReport>,
}

impl AggregationResult {
    /// An empty result with `status = "error"`.
    pub fn failed(company: &str, homepage_url: &str, detail: impl Into<String>) -> Self {
        let company = if company.trim().is_empty() {
            "Unknown".to_string()
        } else {
            company.to_string()
        };
        Self {
            company,
            homepage_url: homepage_url.to_string(),
            filings: Vec::new(),
            news: Vec::new(),
            social_mentions: Vec::new(),
            website: None,
            fetched_at: Utc::now(),
            status: AggregationStatus::Error,
            error_detail: Some(detail.into()),
            sources: Vec::new(),
        }
    }

    /// Report row for `source`, if present.
    pub fn report(&self, source: SourceKind) -> Option<&SourceReport> {
        self.sources.iter().find(|r| r.source == source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filing_record_uses_wire_names() {
        let record = FilingRecord {
            title: "사업보고서".into(),
            url: "https://dart.fss.or.kr/dsaf001/main.do?rcpNo=1".into(),
            snippet: "테스트 · 20240101".into(),
            source_tag: SourceTag::Filing,
            date: "20240101".into(),
            filing_type: "사업보고서".into(),
            reference_number: "1".into(),
        };

        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["source"], "dart");
        assert_eq!(json["type"], "사업보고서");
        assert_eq!(json["rcp_no"], "1");
    }

    #[test]
    fn empty_contact_fields_are_omitted() {
        let contact = ContactInfo {
            phones: vec!["02-1234-5678".into()],
            ..Default::default()
        };
        let json = serde_json::to_value(&contact).expect("serialize");
        assert!(json.get("phones").is_some());
        assert!(json.get("emails").is_none());
        assert!(json.get("addresses").is_none());
    }

    #[test]
    fn outcome_report_carries_reason() {
        let outcome = SourceOutcome::degraded(vec![1, 2], DegradeReason::MissingCredential);
        assert!(outcome.is_degraded());
        assert_eq!(outcome.reason(), Some(&DegradeReason::MissingCredential));

        let (value, report) = outcome.into_report(SourceKind::Filings);
        assert_eq!(value, vec![1, 2]);
        assert_eq!(report.state, SourceState::Degraded);
        assert_eq!(report.reason, Some(DegradeReason::MissingCredential));

        let (_, report) = SourceOutcome::Fresh(()).into_report(SourceKind::News);
        assert_eq!(report.state, SourceState::Fresh);
        assert!(report.reason.is_none());
    }

    #[test]
    fn degrade_reason_from_error() {
        let err = InsightMatchError::decode("bad zip");
        assert_eq!(DegradeReason::from(&err), DegradeReason::Decode("bad zip".into()));

        let err = InsightMatchError::resolution_miss("x");
        assert_eq!(DegradeReason::from(&err), DegradeReason::ResolutionMiss);
    }

    #[test]
    fn failed_result_serializes_error_detail() {
        let result = AggregationResult::failed("", "", "homepage URL is empty");
        assert_eq!(result.company, "Unknown");
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "homepage URL is empty");
        assert!(json["dart"].as_array().expect("dart array").is_empty());
    }
}
