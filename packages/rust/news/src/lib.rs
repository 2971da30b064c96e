//! News collection from a news-search RSS feed.
//!
//! Several queries are issued per company (see [`build_queries`]) and the
//! results merged, keeping the first item seen for each URL.

pub mod feed;
pub mod queries;

use std::collections::HashSet;

use insightmatch_shared::{
    DegradeReason, InsightMatchError, NewsConfig, NewsItem, Result, SourceOutcome, SourceTag,
};
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

pub use feed::{FeedItem, parse_feed};
pub use queries::build_queries;

/// User-Agent string for feed requests.
const USER_AGENT: &str = concat!("InsightMatch/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Accumulation
// ---------------------------------------------------------------------------

/// Items accepted so far in one collection run. Each URL is accepted once.
#[derive(Debug)]
struct Accepted {
    items: Vec<NewsItem>,
    seen: HashSet<String>,
    limit: usize,
}

impl Accepted {
    fn new(limit: usize) -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
            limit,
        }
    }

    fn is_full(&self) -> bool {
        self.items.len() >= self.limit
    }

    fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.items.len())
    }

    /// Accept `item` unless its URL was seen or the limit is reached.
    fn offer(&mut self, item: NewsItem) -> bool {
        if self.is_full() || self.seen.contains(&item.url) {
            return false;
        }
        self.seen.insert(item.url.clone());
        self.items.push(item);
        true
    }
}

fn news_item(item: FeedItem, query: &str) -> NewsItem {
    NewsItem {
        title: item.title,
        url: item.link,
        snippet: item.description,
        source_tag: SourceTag::News,
        date: item.pub_date,
        originating_query: query.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Samples
// ---------------------------------------------------------------------------

/// `(date, snippet suffix)` for each sample article.
const SAMPLE_NEWS: [(&str, &str); 3] = [
    ("2024-01-15", "의 최근 동향과 리스크 요인 분석 요약."),
    ("2024-01-10", "의 경영 현황과 향후 전망."),
    ("2024-01-05", "의 시장 동향과 경쟁사 분석."),
];

/// Placeholder articles shown when no live news could be collected.
pub fn sample_news(company: &str, limit: usize) -> Vec<NewsItem> {
    SAMPLE_NEWS
        .iter()
        .enumerate()
        .take(limit)
        .map(|(i, (date, suffix))| NewsItem {
            title: format!("{company} 관련 보도 {}", i + 1),
            url: format!("https://news.example.com/{company}/{}", i + 1),
            snippet: format!("{company}{suffix}"),
            source_tag: SourceTag::News,
            date: (*date).to_string(),
            originating_query: company.to_string(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// NewsCollector
// ---------------------------------------------------------------------------

/// Collects news items for a company from the configured RSS search feed.
pub struct NewsCollector {
    config: NewsConfig,
    client: Client,
}

impl NewsCollector {
    /// Create a collector with the given configuration.
    pub fn new(config: NewsConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                InsightMatchError::transport(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &NewsConfig {
        &self.config
    }

    /// Collect up to `limit` unique news items for `name`.
    ///
    /// Failed queries are skipped. When nothing is accepted, sample items are
    /// returned with the last query error (or [`DegradeReason::NoResults`]).
    #[instrument(skip_all, fields(name = %name, limit = limit))]
    pub async fn collect(
        &self,
        name: &str,
        homepage: Option<&str>,
        limit: usize,
    ) -> SourceOutcome<Vec<NewsItem>> {
        let queries = build_queries(name, homepage);
        let mut accepted = Accepted::new(limit);
        let mut last_error: Option<InsightMatchError> = None;

        info!(queries = queries.len(), "collecting news");

        for (i, query) in queries.iter().enumerate() {
            if accepted.is_full() {
                break;
            }
            if i > 0 && !self.config.query_delay.is_zero() {
                tokio::time::sleep(self.config.query_delay).await;
            }

            match self.search(query).await {
                Ok(items) => {
                    let mut added = 0usize;
                    for item in items.into_iter().take(accepted.remaining()) {
                        if accepted.offer(news_item(item, query)) {
                            added += 1;
                        }
                    }
                    debug!(query = %query, added, "query done");
                }
                Err(e) => {
                    warn!(query = %query, error = %e, "news query failed, skipping");
                    last_error = Some(e);
                }
            }
        }

        if accepted.items.is_empty() {
            let reason = last_error
                .as_ref()
                .map(DegradeReason::from)
                .unwrap_or(DegradeReason::NoResults);
            warn!(%reason, "no news collected, returning sample news");
            return SourceOutcome::degraded(sample_news(name, limit), reason);
        }

        info!(count = accepted.items.len(), "news collected");
        SourceOutcome::Fresh(accepted.items)
    }

    /// Run one feed search.
    async fn search(&self, query: &str) -> Result<Vec<FeedItem>> {
        let ceid = format!("{}:{}", self.config.country, self.config.language);
        let url = &self.config.feed_url;

        let response = self
            .client
            .get(url)
            .query(&[
                ("q", query),
                ("hl", self.config.language.as_str()),
                ("gl", self.config.country.as_str()),
                ("ceid", ceid.as_str()),
            ])
            .send()
            .await
            .map_err(|e| InsightMatchError::transport(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InsightMatchError::transport(format!("{url}: HTTP {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| InsightMatchError::transport(format!("{url}: body read failed: {e}")))?;

        parse_feed(&body)
    }
}
