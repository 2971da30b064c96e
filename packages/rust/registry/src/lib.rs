//! Company registry resolution and regulatory-filing retrieval.
//!
//! The registry publishes a bulk index of every registered company. A company
//! name is resolved against that index by containment and similarity rules
//! (see [`matcher`]); the resulting identifier keys the filing-list query.
//!
//! The decoded index is cached inside [`RegistryClient`] and shared by every
//! aggregation that goes through the same client.

pub mod filings;
pub mod index;
pub mod matcher;

use std::sync::Arc;
use std::time::{Duration, Instant};

use insightmatch_shared::{
    DegradeReason, FilingRecord, InsightMatchError, RegistryConfig, RegistryEntry, Result,
    SourceOutcome,
};
use reqwest::Client;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

pub use filings::{
    FILING_TYPE_AD_HOC, FILING_TYPE_OTHER, FILING_TYPE_REGULAR, SAMPLE_FILINGS, SampleFiling,
    filing_window, sample_filings,
};
pub use index::{RegistryIndex, decode_archive, parse_index_xml};
pub use matcher::{
    MatchRule, NameMatch, SIMILARITY_THRESHOLD, find_match, normalize_company_name, similarity,
};

/// User-Agent string for registry requests.
const USER_AGENT: &str = concat!("InsightMatch/", env!("CARGO_PKG_VERSION"));

/// A decoded index and when it was loaded.
struct CachedIndex {
    index: Arc<RegistryIndex>,
    loaded_at: Instant,
}

impl CachedIndex {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.loaded_at.elapsed() < ttl
    }
}

// ---------------------------------------------------------------------------
// RegistryClient
// ---------------------------------------------------------------------------

/// Registry index lookups and filing fetches against one registry endpoint.
pub struct RegistryClient {
    config: RegistryConfig,
    client: Client,
    cache: RwLock<Option<CachedIndex>>,
}

impl RegistryClient {
    /// Create a client with the given configuration.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                InsightMatchError::transport(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            client,
            cache: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| InsightMatchError::config("registry API key is not configured"))
    }

    /// The decoded registry index, downloading it if the cache is empty or stale.
    ///
    /// Concurrent callers wait on the write lock, so one download serves all.
    pub async fn index(&self) -> Result<Arc<RegistryIndex>> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.is_fresh(self.config.index_ttl) {
                return Ok(Arc::clone(&cached.index));
            }
        }

        let mut slot = self.cache.write().await;
        if let Some(cached) = slot.as_ref() {
            if cached.is_fresh(self.config.index_ttl) {
                return Ok(Arc::clone(&cached.index));
            }
        }

        let index = Arc::new(self.download_index().await?);
        *slot = Some(CachedIndex {
            index: Arc::clone(&index),
            loaded_at: Instant::now(),
        });
        Ok(index)
    }

    /// Drop the cached index so the next lookup downloads it again.
    pub async fn invalidate(&self) {
        self.cache.write().await.take();
    }

    #[instrument(skip_all)]
    async fn download_index(&self) -> Result<RegistryIndex> {
        let api_key = self.api_key()?;
        let url = format!("{}/corpCode.xml", self.config.base_url);
        info!(%url, "downloading registry index");

        let response = self
            .client
            .get(&url)
            .query(&[("crtfc_key", api_key)])
            .send()
            .await
            .map_err(|e| InsightMatchError::transport(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InsightMatchError::transport(format!("{url}: HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| InsightMatchError::transport(format!("{url}: body read failed: {e}")))?;

        let index = tokio::task::spawn_blocking(move || decode_archive(&bytes))
            .await
            .map_err(|e| InsightMatchError::decode(format!("registry index decode task: {e}")))??;

        info!(entries = index.len(), "registry index loaded");
        Ok(index)
    }

    /// Resolve `name` to a registry entry, reporting why a lookup failed.
    #[instrument(skip(self))]
    pub async fn try_resolve(&self, name: &str) -> Result<RegistryEntry> {
        let index = self.index().await?;
        let found = find_match(index.entries(), name, self.config.match_strategy)
            .ok_or_else(|| InsightMatchError::resolution_miss(name))?;

        debug!(
            registry_id = %found.entry.registry_id,
            legal_name = %found.entry.legal_name,
            rule = ?found.rule,
            similarity = found.similarity,
            position = found.position,
            "registry entry resolved"
        );
        Ok(found.entry.clone())
    }

    /// Resolve `name` to a registry entry; `None` when it cannot be resolved
    /// for any reason (miss, missing key, download or decode failure).
    pub async fn resolve(&self, name: &str) -> Option<RegistryEntry> {
        match self.try_resolve(name).await {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(name, error = %e, "registry resolution failed");
                None
            }
        }
    }

    /// Filings for `registry_id` dated within the last `window_days`, newest first.
    #[instrument(skip(self))]
    pub async fn fetch_filings(
        &self,
        registry_id: &str,
        window_days: u32,
        limit: usize,
    ) -> Result<Vec<FilingRecord>> {
        let query = filings::FilingQuery {
            base_url: &self.config.base_url,
            api_key: self.api_key()?,
            registry_id,
            today: chrono::Local::now().date_naive(),
            window_days,
            limit,
        };
        filings::fetch_filings(&self.client, &query).await
    }

    /// Collect filings for `company`, degrading to samples on any failure.
    ///
    /// Without an API key no request is made at all.
    #[instrument(skip(self))]
    pub async fn collect_filings(&self, company: &str) -> SourceOutcome<Vec<FilingRecord>> {
        let limit = self.config.filing_limit;

        if self.config.api_key.is_none() {
            warn!("registry API key missing, returning sample filings");
            return SourceOutcome::degraded(
                sample_filings(company, limit),
                DegradeReason::MissingCredential,
            );
        }

        let entry = match self.try_resolve(company).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "registry entry not found, returning sample filings");
                return SourceOutcome::degraded(sample_filings(company, limit), (&e).into());
            }
        };

        match self
            .fetch_filings(&entry.registry_id, self.config.window_days, limit)
            .await
        {
            Ok(records) => {
                info!(count = records.len(), registry_id = %entry.registry_id, "filings collected");
                SourceOutcome::Fresh(records)
            }
            Err(e) => {
                warn!(error = %e, "filing fetch failed, returning sample filings");
                SourceOutcome::degraded(sample_filings(company, limit), (&e).into())
            }
        }
    }
}
