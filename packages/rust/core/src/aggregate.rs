//! Aggregation: URL → identity → {filings, news, website} → result.
//!
//! The three network sources run as independent tasks on a [`JoinSet`], each
//! under its own timeout, all under one overall deadline. A source that
//! fails, times out or panics contributes its sample value; the result is
//! still a success. Dropping the aggregation future aborts every task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::task::{self, JoinSet};
use tracing::{info, instrument, warn};

use insightmatch_news::{NewsCollector, sample_news};
use insightmatch_profile::{ProfileScraper, sample_profile};
use insightmatch_registry::{RegistryClient, sample_filings};
use insightmatch_shared::{
    AggregationConfig, AggregationResult, AggregationStatus, DegradeReason, FilingRecord,
    NewsItem, Result, SourceKind, SourceOutcome, SourceState, WebsiteProfile,
};

use crate::identity::identify;
use crate::social::social_mentions;

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting aggregation status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called as each source finishes, in completion order.
    fn source_finished(&self, source: SourceKind, state: SourceState);
    /// Called when the result is assembled.
    fn done(&self, result: &AggregationResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn source_finished(&self, _source: SourceKind, _state: SourceState) {}
    fn done(&self, _result: &AggregationResult) {}
}

// ---------------------------------------------------------------------------
// Task plumbing
// ---------------------------------------------------------------------------

/// What one source task hands back.
enum Collected {
    Filings(SourceOutcome<Vec<FilingRecord>>),
    News(SourceOutcome<Vec<NewsItem>>),
    Website(SourceOutcome<WebsiteProfile>),
}

impl Collected {
    fn state(&self) -> SourceState {
        let degraded = match self {
            Self::Filings(o) => o.is_degraded(),
            Self::News(o) => o.is_degraded(),
            Self::Website(o) => o.is_degraded(),
        };
        if degraded {
            SourceState::Degraded
        } else {
            SourceState::Fresh
        }
    }
}

/// Run `fut` under `limit`; `None` when it ran out of time.
async fn bounded<F>(
    source: SourceKind,
    limit: Duration,
    fut: F,
) -> (SourceKind, Option<Collected>)
where
    F: Future<Output = Collected>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(collected) => (source, Some(collected)),
        Err(_) => {
            warn!(
                source = source.as_str(),
                timeout_ms = limit.as_millis() as u64,
                "source timed out"
            );
            (source, None)
        }
    }
}

/// Outcomes gathered so far, and why the other sources are missing.
#[derive(Default)]
struct Gathered {
    filings: Option<SourceOutcome<Vec<FilingRecord>>>,
    news: Option<SourceOutcome<Vec<NewsItem>>>,
    website: Option<SourceOutcome<WebsiteProfile>>,
    missing: HashMap<SourceKind, DegradeReason>,
}

impl Gathered {
    fn store(&mut self, collected: Collected) {
        match collected {
            Collected::Filings(o) => self.filings = Some(o),
            Collected::News(o) => self.news = Some(o),
            Collected::Website(o) => self.website = Some(o),
        }
    }

    /// Why `source` has no outcome. A source never heard from was still
    /// running at the deadline.
    fn missing_reason(&self, source: SourceKind) -> DegradeReason {
        self.missing
            .get(&source)
            .cloned()
            .unwrap_or(DegradeReason::TimedOut)
    }
}

/// Source tasks, keyed by task id so a panic can be traced to its source.
struct SourceTasks {
    set: JoinSet<(SourceKind, Option<Collected>)>,
    sources: HashMap<task::Id, SourceKind>,
}

impl SourceTasks {
    fn new() -> Self {
        Self {
            set: JoinSet::new(),
            sources: HashMap::new(),
        }
    }

    fn spawn<F>(&mut self, source: SourceKind, limit: Duration, fut: F)
    where
        F: Future<Output = Collected> + Send + 'static,
    {
        let handle = self.set.spawn(bounded(source, limit, fut));
        self.sources.insert(handle.id(), source);
    }

    /// Join every task, aborting whatever is still running at `deadline`.
    async fn join_until(
        mut self,
        deadline: tokio::time::Instant,
        progress: &dyn ProgressReporter,
    ) -> Gathered {
        let mut gathered = Gathered::default();
        loop {
            match tokio::time::timeout_at(deadline, self.set.join_next()).await {
                Ok(Some(Ok((source, Some(collected))))) => {
                    progress.source_finished(source, collected.state());
                    gathered.store(collected);
                }
                Ok(Some(Ok((source, None)))) => {
                    progress.source_finished(source, SourceState::Degraded);
                    gathered.missing.insert(source, DegradeReason::TimedOut);
                }
                Ok(Some(Err(e))) => {
                    let source = self.sources.get(&e.id()).copied();
                    warn!(
                        source = source.map_or("unknown", |s| s.as_str()),
                        error = %e,
                        "source task failed"
                    );
                    if let Some(source) = source {
                        progress.source_finished(source, SourceState::Degraded);
                        gathered
                            .missing
                            .insert(source, DegradeReason::TaskFailed(e.to_string()));
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        pending = self.set.len(),
                        "deadline reached, aborting pending sources"
                    );
                    self.set.abort_all();
                    break;
                }
            }
        }
        gathered
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Gathers public data about a company from every source.
///
/// Holds its collectors behind `Arc` so one aggregator (and its registry
/// index cache) can serve many requests.
pub struct Aggregator {
    registry: Arc<RegistryClient>,
    news: Arc<NewsCollector>,
    scraper: Arc<ProfileScraper>,
    source_timeout: Duration,
    deadline: Duration,
}

impl Aggregator {
    /// Build an aggregator and its collectors from `config`.
    pub fn new(config: &AggregationConfig) -> Result<Self> {
        Ok(Self {
            registry: Arc::new(RegistryClient::new(config.registry.clone())?),
            news: Arc::new(NewsCollector::new(config.news.clone())?),
            scraper: Arc::new(ProfileScraper::new(&config.scraper)?),
            source_timeout: config.source_timeout,
            deadline: config.deadline,
        })
    }

    /// The registry client, for direct lookups.
    pub fn registry(&self) -> &RegistryClient {
        &self.registry
    }

    /// Aggregate public data for `homepage`. Never fails; see
    /// [`aggregate_with_progress`](Self::aggregate_with_progress).
    pub async fn aggregate(&self, homepage: &str, name: Option<&str>) -> AggregationResult {
        self.aggregate_with_progress(homepage, name, &SilentProgress).await
    }

    /// Aggregate public data for `homepage`, reporting progress.
    ///
    /// `status` is `error` only for a blank homepage URL. Every other failure
    /// degrades the affected source and is listed in `sources`.
    #[instrument(skip_all, fields(homepage = %homepage))]
    pub async fn aggregate_with_progress(
        &self,
        homepage: &str,
        name: Option<&str>,
        progress: &dyn ProgressReporter,
    ) -> AggregationResult {
        let start = Instant::now();

        if homepage.trim().is_empty() {
            warn!("homepage URL is empty");
            let detail = "homepage URL is empty";
            let result = AggregationResult::failed(name.unwrap_or_default(), homepage, detail);
            progress.done(&result);
            return result;
        }

        // --- Identity ---
        progress.phase("Resolving company identity");
        let identity = identify(homepage, name);
        let company = identity.normalized_name.clone();
        info!(company = %company, "collecting public data");

        // --- Fan-out ---
        progress.phase("Collecting public data");
        let mut tasks = SourceTasks::new();

        let registry = Arc::clone(&self.registry);
        let filings_company = company.clone();
        tasks.spawn(SourceKind::Filings, self.source_timeout, async move {
            Collected::Filings(registry.collect_filings(&filings_company).await)
        });

        let news = Arc::clone(&self.news);
        let news_company = company.clone();
        let news_homepage = homepage.to_string();
        let news_limit = self.news.config().limit;
        tasks.spawn(SourceKind::News, self.source_timeout, async move {
            let items = news
                .collect(&news_company, Some(&news_homepage), news_limit)
                .await;
            Collected::News(items)
        });

        let scraper = Arc::clone(&self.scraper);
        let website_url = homepage.to_string();
        tasks.spawn(SourceKind::Website, self.source_timeout, async move {
            Collected::Website(scraper.scrape(&website_url).await)
        });

        let deadline = tokio::time::Instant::now() + self.deadline;
        let mut gathered = tasks.join_until(deadline, progress).await;

        // --- Assemble ---
        progress.phase("Assembling result");

        let filings = gathered.filings.take().unwrap_or_else(|| {
            SourceOutcome::degraded(
                sample_filings(&company, self.registry.config().filing_limit),
                gathered.missing_reason(SourceKind::Filings),
            )
        });
        let news = gathered.news.take().unwrap_or_else(|| {
            SourceOutcome::degraded(
                sample_news(&company, self.news.config().limit),
                gathered.missing_reason(SourceKind::News),
            )
        });
        let website = gathered.website.take().unwrap_or_else(|| {
            SourceOutcome::degraded(
                sample_profile(homepage),
                gathered.missing_reason(SourceKind::Website),
            )
        });

        let (filings, filings_report) = filings.into_report(SourceKind::Filings);
        let (news, news_report) = news.into_report(SourceKind::News);
        let (website, website_report) = website.into_report(SourceKind::Website);
        let (social_mentions, social_report) =
            social_mentions(&company, Some(&website)).into_report(SourceKind::Social);

        let sources = vec![filings_report, news_report, website_report, social_report];
        let degraded = sources
            .iter()
            .filter(|r| r.state == SourceState::Degraded)
            .count();

        let result = AggregationResult {
            company,
            homepage_url: homepage.to_string(),
            filings,
            news,
            social_mentions,
            website: Some(website),
            fetched_at: Utc::now(),
            status: AggregationStatus::Success,
            error_detail: None,
            sources,
        };

        info!(
            company = %result.company,
            filings = result.filings.len(),
            news = result.news.len(),
            social = result.social_mentions.len(),
            degraded,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "aggregation complete"
        );

        progress.done(&result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use insightmatch_shared::{
        MatchStrategy, NewsConfig, ProfileStatus, RegistryConfig, ScraperConfig, SourceTag,
    };
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Nothing listens on the discard port.
    const UNREACHABLE: &str = "http://127.0.0.1:9/";

    fn config(server: &str, api_key: Option<&str>) -> AggregationConfig {
        AggregationConfig {
            registry: RegistryConfig {
                api_key: api_key.map(String::from),
                base_url: server.to_string(),
                timeout: Duration::from_secs(5),
                window_days: 365,
                filing_limit: 10,
                index_ttl: Duration::from_secs(3600),
                match_strategy: MatchStrategy::FirstMatch,
            },
            news: NewsConfig {
                feed_url: format!("{server}/rss/search"),
                timeout: Duration::from_secs(5),
                limit: 10,
                query_delay: Duration::ZERO,
                language: "ko".into(),
                country: "KR".into(),
            },
            scraper: ScraperConfig {
                timeout: Duration::from_secs(5),
                max_attempts: 1,
                backoff_base: Duration::from_millis(1),
                user_agent: "test-agent/1.0".into(),
            },
            source_timeout: Duration::from_secs(10),
            deadline: Duration::from_secs(20),
        }
    }

    async fn mount_failing_news(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/rss/search"))
            .respond_with(ResponseTemplate::new(500))
            .mount(server)
            .await;
    }

    fn reason(result: &AggregationResult, source: SourceKind) -> Option<DegradeReason> {
        result.report(source).and_then(|r| r.reason.clone())
    }

    #[derive(Default)]
    struct RecordingProgress {
        phases: Mutex<Vec<String>>,
        finished: Mutex<Vec<SourceKind>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.phases.lock().unwrap().push(name.to_string());
        }
        fn source_finished(&self, source: SourceKind, _state: SourceState) {
            self.finished.lock().unwrap().push(source);
        }
        fn done(&self, _result: &AggregationResult) {}
    }

    async fn explode() -> Collected {
        panic!("collector bug")
    }

    async fn stall(collected: Collected) -> Collected {
        tokio::time::sleep(Duration::from_secs(5)).await;
        collected
    }

    #[tokio::test]
    async fn each_missing_source_keeps_its_own_reason() {
        let mut tasks = SourceTasks::new();
        tasks.spawn(SourceKind::Filings, Duration::from_secs(5), explode());
        tasks.spawn(
            SourceKind::News,
            Duration::from_millis(50),
            stall(Collected::News(SourceOutcome::Fresh(Vec::new()))),
        );
        tasks.spawn(
            SourceKind::Website,
            Duration::from_secs(5),
            stall(Collected::Website(SourceOutcome::Fresh(sample_profile("x")))),
        );

        let progress = RecordingProgress::default();
        let deadline = tokio::time::Instant::now() + Duration::from_millis(500);
        let gathered = tasks.join_until(deadline, &progress).await;

        assert!(gathered.filings.is_none() && gathered.news.is_none());
        assert!(matches!(
            gathered.missing_reason(SourceKind::Filings),
            DegradeReason::TaskFailed(_)
        ));
        assert_eq!(
            gathered.missing_reason(SourceKind::News),
            DegradeReason::TimedOut
        );
        assert_eq!(
            gathered.missing_reason(SourceKind::Website),
            DegradeReason::TimedOut
        );

        let mut finished = progress.finished.lock().unwrap().clone();
        finished.sort_by_key(|s| s.as_str());
        assert_eq!(finished, [SourceKind::Filings, SourceKind::News]);
    }

    #[tokio::test]
    async fn blank_homepage_is_an_error_result() {
        let aggregator = Aggregator::new(&config(UNREACHABLE, None)).unwrap();
        let result = aggregator.aggregate("   ", None).await;

        assert_eq!(result.status, AggregationStatus::Error);
        assert_eq!(result.company, "Unknown");
        assert!(result.filings.is_empty());
        assert!(result.news.is_empty());
        assert!(result.website.is_none());
        assert!(result.error_detail.is_some());
    }

    #[tokio::test]
    async fn every_source_down_still_succeeds_with_samples() {
        let server = MockServer::start().await;
        mount_failing_news(&server).await;

        let aggregator = Aggregator::new(&config(&server.uri(), None)).unwrap();
        let result = aggregator.aggregate(UNREACHABLE, Some("알파테크")).await;

        assert_eq!(result.status, AggregationStatus::Success);
        assert_eq!(result.company, "알파테크");
        assert_eq!(result.homepage_url, UNREACHABLE);

        let types: Vec<&str> = result.filings.iter().map(|f| f.filing_type.as_str()).collect();
        assert_eq!(types, ["정기공시", "수시공시", "기타공시"]);
        assert!(result.filings.iter().all(|f| f.snippet.contains("알파테크")));
        assert_eq!(reason(&result, SourceKind::Filings), Some(DegradeReason::MissingCredential));

        assert_eq!(result.news.len(), 3);
        assert_eq!(result.news[0].title, "알파테크 관련 보도 1");
        assert!(matches!(reason(&result, SourceKind::News), Some(DegradeReason::Transport(_))));

        let website = result.website.as_ref().expect("website profile");
        assert_eq!(website.status, ProfileStatus::Error);
        assert_eq!(website.url, UNREACHABLE);

        assert_eq!(result.social_mentions.len(), 2);
        assert_eq!(reason(&result, SourceKind::Social), Some(DegradeReason::NoResults));

        let order: Vec<SourceKind> = result.sources.iter().map(|r| r.source).collect();
        assert_eq!(
            order,
            [SourceKind::Filings, SourceKind::News, SourceKind::Website, SourceKind::Social]
        );
    }

    #[tokio::test]
    async fn live_sources_flow_into_result() {
        let server = MockServer::start().await;

        let archive = std::fs::read("../../../fixtures/registry/corpCode.zip")
            .expect("fixture should exist");
        Mock::given(method("GET"))
            .and(path("/corpCode.xml"))
            .and(query_param("crtfc_key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/list.json"))
            .and(query_param("corp_code", "00000001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "000",
                "message": "정상",
                "page_no": 1,
                "total_page": 1,
                "list": [{
                    "corp_code": "00000001",
                    "corp_name": "알파테크",
                    "report_nm": "사업보고서 (2023.12)",
                    "rcept_no": "20240315000123",
                    "flr_nm": "알파테크",
                    "rcept_dt": "20240315",
                }],
            })))
            .mount(&server)
            .await;

        let feed = std::fs::read_to_string("../../../fixtures/rss/news-search.xml")
            .expect("fixture should exist");
        Mock::given(method("GET"))
            .and(path("/rss/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/rss+xml")
                    .set_body_string(feed),
            )
            .mount(&server)
            .await;

        let html = std::fs::read_to_string("../../../fixtures/html/company-homepage.html")
            .expect("fixture should exist");
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string(html),
            )
            .mount(&server)
            .await;

        let aggregator = Aggregator::new(&config(&server.uri(), Some("test-key"))).unwrap();
        let homepage = format!("{}/", server.uri());
        let progress = RecordingProgress::default();
        let result = aggregator
            .aggregate_with_progress(&homepage, Some("알파테크"), &progress)
            .await;

        assert_eq!(result.status, AggregationStatus::Success);
        assert!(
            result.sources[..3].iter().all(|r| r.state == SourceState::Fresh),
            "sources: {:?}",
            result.sources
        );

        assert_eq!(result.filings.len(), 1);
        assert_eq!(result.filings[0].title, "사업보고서 (2023.12)");
        assert_eq!(result.filings[0].source_tag, SourceTag::Filing);

        assert_eq!(result.news.len(), 3);
        assert!(result.news.iter().all(|n| n.source_tag == SourceTag::News));

        let website = result.website.as_ref().expect("website profile");
        assert_eq!(website.title, "알파테크 | 정보보호 컨설팅");

        let social: Vec<&str> = result.social_mentions.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(social, ["알파테크 · Facebook", "알파테크 · YouTube"]);
        assert_eq!(result.report(SourceKind::Social).map(|r| r.state), Some(SourceState::Fresh));

        let mut finished = progress.finished.lock().unwrap().clone();
        finished.sort_by_key(|s| s.as_str());
        assert_eq!(finished, [SourceKind::Filings, SourceKind::News, SourceKind::Website]);
        assert_eq!(progress.phases.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn slow_source_times_out_alone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss/search"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let mut config = config(&server.uri(), None);
        config.source_timeout = Duration::from_millis(300);
        let aggregator = Aggregator::new(&config).unwrap();
        let result = aggregator.aggregate(UNREACHABLE, Some("알파테크")).await;

        assert_eq!(result.status, AggregationStatus::Success);
        assert_eq!(reason(&result, SourceKind::News), Some(DegradeReason::TimedOut));
        assert_eq!(result.news.len(), 3);
        assert_eq!(reason(&result, SourceKind::Filings), Some(DegradeReason::MissingCredential));
    }

    #[tokio::test]
    async fn overall_deadline_fills_pending_sources() {
        let server = MockServer::start().await;
        mount_failing_news(&server).await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let mut config = config(&server.uri(), None);
        config.deadline = Duration::from_millis(300);
        let aggregator = Aggregator::new(&config).unwrap();

        let started = Instant::now();
        let homepage = format!("{}/", server.uri());
        let result = aggregator.aggregate(&homepage, Some("알파테크")).await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(result.status, AggregationStatus::Success);
        assert_eq!(reason(&result, SourceKind::Website), Some(DegradeReason::TimedOut));
        assert_eq!(
            result.website.as_ref().map(|w| w.status),
            Some(ProfileStatus::Error)
        );
        assert_eq!(reason(&result, SourceKind::Filings), Some(DegradeReason::MissingCredential));
    }
}
