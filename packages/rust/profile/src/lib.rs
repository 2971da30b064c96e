//! Company homepage scraping.
//!
//! This crate provides:
//! - [`fetch`]: retrying page fetcher with charset fallback
//! - [`extract`]: pure field extractors over the parsed page
//! - [`ProfileScraper`]: fetch + extract, degrading to [`sample_profile`]

pub mod extract;
pub mod fetch;

use chrono::Utc;
use insightmatch_shared::{
    ContactInfo, DegradeReason, LegalInfo, ProfileStatus, Result, ScraperConfig, SourceOutcome,
    WebsiteProfile,
};
use tracing::{info, instrument, warn};

pub use extract::extract_profile;
pub use fetch::{PageFetcher, backoff_delay};

/// Placeholder profile for a homepage that could not be fetched.
pub fn sample_profile(url: &str) -> WebsiteProfile {
    WebsiteProfile {
        url: url.to_string(),
        title: "샘플 웹사이트".into(),
        description: "웹사이트 정보 수집 중 오류가 발생했습니다.".into(),
        keywords: vec!["샘플".into(), "웹사이트".into()],
        legal_info: LegalInfo {
            legal_name: Some("샘플 회사".into()),
            registration_number: Some("123-45-67890".into()),
            ceo_name: Some("홍길동".into()),
        },
        contact_info: ContactInfo {
            phones: vec!["02-1234-5678".into()],
            emails: vec!["info@example.com".into()],
            addresses: vec!["서울특별시 강남구".into()],
        },
        social_links: Vec::new(),
        status: ProfileStatus::Error,
        fetched_at: Utc::now(),
    }
}

/// Fetches a company homepage and extracts its profile.
pub struct ProfileScraper {
    fetcher: PageFetcher,
}

impl ProfileScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            fetcher: PageFetcher::new(config)?,
        })
    }

    /// Scrape `url`. Once every fetch attempt has failed, the sample profile
    /// (status `error`) is returned instead.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn scrape(&self, url: &str) -> SourceOutcome<WebsiteProfile> {
        match self.fetcher.fetch(url).await {
            Ok(html) => {
                let profile = extract_profile(url, &html);
                info!(
                    keywords = profile.keywords.len(),
                    social_links = profile.social_links.len(),
                    "homepage profile extracted"
                );
                SourceOutcome::Fresh(profile)
            }
            Err(e) => {
                warn!(error = %e, "homepage unavailable, returning sample profile");
                SourceOutcome::degraded(sample_profile(url), DegradeReason::from(&e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> ScraperConfig {
        ScraperConfig {
            timeout: Duration::from_secs(5),
            max_attempts: 3,
            backoff_base: Duration::from_millis(1),
            user_agent: "test-agent/1.0".into(),
        }
    }

    #[test]
    fn sample_profile_is_marked_error() {
        let profile = sample_profile("https://example.com");
        assert_eq!(profile.status, ProfileStatus::Error);
        assert_eq!(profile.url, "https://example.com");
        assert_eq!(profile.legal_info.ceo_name.as_deref(), Some("홍길동"));

        let json = serde_json::to_value(&profile).expect("serialize");
        assert_eq!(json["status"], "error");
        assert_eq!(json["company_info"]["business_number"], "123-45-67890");
    }

    #[tokio::test]
    async fn scrapes_live_page() {
        let server = MockServer::start().await;
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

        let scraper = ProfileScraper::new(&config()).unwrap();
        let url = format!("{}/", server.uri());
        let outcome = scraper.scrape(&url).await;

        assert!(!outcome.is_degraded());
        let profile = outcome.into_value();
        assert_eq!(profile.status, ProfileStatus::Success);
        assert_eq!(profile.url, url);
        assert_eq!(profile.title, "알파테크 | 정보보호 컨설팅");
    }

    #[tokio::test]
    async fn euc_kr_page_yields_korean_fields() {
        let server = MockServer::start().await;
        let html = std::fs::read_to_string("../../../fixtures/html/company-homepage.html")
            .expect("fixture should exist")
            .replace(r#"<meta charset="utf-8">"#, r#"<meta charset="euc-kr">"#);
        let (body, _, unmappable) = encoding_rs::EUC_KR.encode(&html);
        assert!(!unmappable);
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(body.into_owned()),
            )
            .mount(&server)
            .await;

        let scraper = ProfileScraper::new(&config()).unwrap();
        let profile = scraper.scrape(&format!("{}/", server.uri())).await.into_value();

        assert_eq!(profile.status, ProfileStatus::Success);
        assert_eq!(profile.title, "알파테크 | 정보보호 컨설팅");
        assert_eq!(profile.legal_info.legal_name.as_deref(), Some("알파테크"));
        assert_eq!(profile.legal_info.ceo_name.as_deref(), Some("홍길동"));
        assert_eq!(
            profile.contact_info.addresses.first().map(String::as_str),
            Some("서울특별시 강남구 테헤란로 123")
        );
    }

    #[tokio::test]
    async fn exhausted_retries_return_sample() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let scraper = ProfileScraper::new(&config()).unwrap();
        let outcome = scraper.scrape(&server.uri()).await;

        assert!(matches!(outcome.reason(), Some(DegradeReason::Transport(_))));
        assert_eq!(outcome.value().status, ProfileStatus::Error);
        assert_eq!(outcome.value().title, "샘플 웹사이트");
    }
}
