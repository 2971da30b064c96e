//! Filing-list retrieval and mapping.

use chrono::{Days, NaiveDate};
use insightmatch_shared::{FilingRecord, InsightMatchError, Result, SourceTag};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

/// Largest page the filing list endpoint serves.
pub const MAX_PAGE_SIZE: usize = 100;

/// Viewer URL for a filing receipt number.
const VIEWER_URL: &str = "https://dart.fss.or.kr/dsaf001/main.do";

/// Title used when a filing carries no report name.
const DEFAULT_TITLE: &str = "전자공시";

/// API status for a successful query.
const STATUS_OK: &str = "000";
/// API status for "no filings in range".
const STATUS_NO_DATA: &str = "013";

pub const FILING_TYPE_REGULAR: &str = "정기공시";
pub const FILING_TYPE_AD_HOC: &str = "수시공시";
pub const FILING_TYPE_OTHER: &str = "기타공시";

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FilingListResponse {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    total_page: u32,
    #[serde(default)]
    list: Vec<RawFiling>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFiling {
    report_nm: String,
    rcept_no: String,
    flr_nm: String,
    rcept_dt: String,
}

impl From<RawFiling> for FilingRecord {
    fn from(raw: RawFiling) -> Self {
        let title = if raw.report_nm.trim().is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            raw.report_nm.trim().to_string()
        };
        Self {
            title,
            url: viewer_url(&raw.rcept_no),
            snippet: format!("{} · {}", raw.flr_nm, raw.rcept_dt),
            source_tag: SourceTag::Filing,
            date: raw.rcept_dt,
            filing_type: raw.report_nm,
            reference_number: raw.rcept_no,
        }
    }
}

fn viewer_url(receipt_no: &str) -> String {
    format!("{VIEWER_URL}?rcpNo={receipt_no}")
}

/// `(bgn_de, end_de)` for a window ending on `today`, as `YYYYMMDD`.
pub fn filing_window(today: NaiveDate, window_days: u32) -> (String, String) {
    let start = today
        .checked_sub_days(Days::new(u64::from(window_days)))
        .unwrap_or(NaiveDate::MIN);
    (
        start.format("%Y%m%d").to_string(),
        today.format("%Y%m%d").to_string(),
    )
}

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

/// Query parameters shared by every page of one fetch.
pub(crate) struct FilingQuery<'a> {
    pub base_url: &'a str,
    pub api_key: &'a str,
    pub registry_id: &'a str,
    pub today: NaiveDate,
    pub window_days: u32,
    pub limit: usize,
}

/// Fetch up to `limit` filings, newest first, following pages as needed.
pub(crate) async fn fetch_filings(
    client: &Client,
    query: &FilingQuery<'_>,
) -> Result<Vec<FilingRecord>> {
    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let url = format!("{}/list.json", query.base_url);
    let (begin, end) = filing_window(query.today, query.window_days);
    let page_size = query.limit.min(MAX_PAGE_SIZE).to_string();
    let mut records = Vec::new();
    let mut page_no: u32 = 1;

    loop {
        debug!(registry_id = query.registry_id, page_no, "fetching filing page");
        let page_no_param = page_no.to_string();
        let response = client
            .get(&url)
            .query(&[
                ("crtfc_key", query.api_key),
                ("corp_code", query.registry_id),
                ("bgn_de", begin.as_str()),
                ("end_de", end.as_str()),
                ("page_no", page_no_param.as_str()),
                ("page_count", page_size.as_str()),
            ])
            .send()
            .await
            .map_err(|e| InsightMatchError::transport(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InsightMatchError::transport(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| InsightMatchError::transport(format!("{url}: body read failed: {e}")))?;
        let page: FilingListResponse = serde_json::from_str(&body)
            .map_err(|e| InsightMatchError::decode(format!("{url}: {e}")))?;

        match page.status.as_str() {
            STATUS_OK => {}
            STATUS_NO_DATA => break,
            other => {
                warn!(status = other, message = %page.message, "filing list rejected");
                return Err(InsightMatchError::transport(format!(
                    "{url}: API status {other}: {}",
                    page.message
                )));
            }
        }

        let page_len = page.list.len();
        let remaining = query.limit - records.len();
        records.extend(page.list.into_iter().take(remaining).map(FilingRecord::from));

        if records.len() >= query.limit || page_len == 0 || page_no >= page.total_page {
            break;
        }
        page_no += 1;
    }

    Ok(records)
}

// ---------------------------------------------------------------------------
// Samples
// ---------------------------------------------------------------------------

/// Template for one sample filing.
#[derive(Debug, Clone, Copy)]
pub struct SampleFiling {
    pub filing_type: &'static str,
    pub date: &'static str,
    pub receipt_no: &'static str,
}

/// Placeholder filings shown when live filings are unavailable.
pub const SAMPLE_FILINGS: [SampleFiling; 3] = [
    SampleFiling {
        filing_type: FILING_TYPE_REGULAR,
        date: "2024-01-15",
        receipt_no: "20240115000001",
    },
    SampleFiling {
        filing_type: FILING_TYPE_AD_HOC,
        date: "2024-01-10",
        receipt_no: "20240110000002",
    },
    SampleFiling {
        filing_type: FILING_TYPE_OTHER,
        date: "2024-01-05",
        receipt_no: "20240105000003",
    },
];

/// Render [`SAMPLE_FILINGS`] for `company`, capped to `limit`.
pub fn sample_filings(company: &str, limit: usize) -> Vec<FilingRecord> {
    SAMPLE_FILINGS
        .iter()
        .take(limit)
        .map(|sample| FilingRecord {
            title: sample.filing_type.to_string(),
            url: viewer_url(sample.receipt_no),
            snippet: format!("{company} · {}", sample.date),
            source_tag: SourceTag::Filing,
            date: sample.date.to_string(),
            filing_type: sample.filing_type.to_string(),
            reference_number: sample.receipt_no.to_string(),
        })
        .collect()
}
