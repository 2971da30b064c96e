//! Homepage fetching with bounded retries.

use std::sync::LazyLock;
use std::time::Duration;

use encoding_rs::{Encoding, WINDOWS_1252};
use insightmatch_shared::{InsightMatchError, Result, ScraperConfig};
use regex::bytes::Regex;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, warn};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_KOREAN: &str = "ko-KR,ko;q=0.8,en-US;q=0.5,en;q=0.3";

/// Charsets servers declare (or imply) when they don't know the real one.
const LEGACY_CHARSETS: [&str; 5] = ["iso-8859-1", "windows-1252", "latin1", "latin-1", "us-ascii"];

/// How far into the body to look for a `<meta charset>`.
const META_SNIFF_BYTES: usize = 2048;

static META_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*?charset\s*=\s*["']?([a-z0-9_:.\-]+)"#)
        .expect("meta charset regex")
});

/// Delay after failed attempt `attempt` (0-indexed): `base * 2^attempt`.
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// HTTP client for homepage requests.
pub struct PageFetcher {
    client: Client,
    max_attempts: u32,
    backoff_base: Duration,
}

impl PageFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_KOREAN));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                InsightMatchError::transport(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            max_attempts: config.max_attempts.max(1),
            backoff_base: config.backoff_base,
        })
    }

    /// Fetch `url` as text, retrying with exponential backoff.
    ///
    /// Returns the last attempt's error once every attempt has failed.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt + 1 < self.max_attempts => {
                    let delay = backoff_delay(attempt, self.backoff_base);
                    warn!(
                        url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "homepage fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(url, attempts = self.max_attempts, error = %e, "homepage fetch failed");
                    return Err(e);
                }
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<String> {
        debug!(url, "fetching homepage");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| InsightMatchError::transport(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InsightMatchError::transport(format!("{url}: HTTP {status}")));
        }

        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(declared_charset);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| InsightMatchError::transport(format!("{url}: body read failed: {e}")))?;

        Ok(decode_body(&bytes, charset.as_deref()))
    }
}

/// The `charset` parameter of a `Content-Type` value, lower-cased.
fn declared_charset(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_ascii_lowercase())
    })
}

/// Decode a response body.
///
/// A declared charset other than the legacy single-byte ones is trusted.
/// Otherwise the body is read as UTF-8 when valid, then by the page's own
/// `<meta charset>`, then as windows-1252.
fn decode_body(bytes: &[u8], charset: Option<&str>) -> String {
    let declared = charset
        .filter(|c| !LEGACY_CHARSETS.contains(c))
        .and_then(|c| Encoding::for_label(c.as_bytes()));
    if let Some(encoding) = declared {
        return encoding.decode(bytes).0.into_owned();
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let encoding = meta_charset(bytes).unwrap_or(WINDOWS_1252);
    debug!(encoding = encoding.name(), "decoding body with sniffed charset");
    encoding.decode(bytes).0.into_owned()
}

/// Charset named by a `<meta>` tag near the top of the document.
fn meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(META_SNIFF_BYTES)];
    let label = META_CHARSET_RE.captures(head)?.get(1)?;
    Encoding::for_label(label.as_bytes())
}
