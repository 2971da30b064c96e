//! Social-media mentions.
//!
//! There is no live social collector: mentions are derived from the social
//! links found on the company homepage.

use insightmatch_shared::{DegradeReason, SocialMention, SourceOutcome, SourceTag, WebsiteProfile};

const PLATFORMS: [(&str, &str); 5] = [
    ("facebook.com", "Facebook"),
    ("twitter.com", "Twitter"),
    ("instagram.com", "Instagram"),
    ("linkedin.com", "LinkedIn"),
    ("youtube.com", "YouTube"),
];

/// `(date, snippet)` for each sample mention.
const SAMPLE_SOCIAL: [(&str, &str); 2] = [
    ("2024-01-12", "고객 만족/불만, 평판 이슈 요약."),
    ("2024-01-10", "브랜드 인지도 및 고객 피드백."),
];

fn platform_of(link: &str) -> &'static str {
    let lowered = link.to_lowercase();
    PLATFORMS
        .iter()
        .find(|(domain, _)| lowered.contains(domain))
        .map(|(_, name)| *name)
        .unwrap_or("Social")
}

/// Placeholder mentions used when the homepage lists no social accounts.
pub fn sample_social(company: &str) -> Vec<SocialMention> {
    SAMPLE_SOCIAL
        .iter()
        .enumerate()
        .map(|(i, (date, snippet))| SocialMention {
            title: format!("{company} 소셜 언급 {}", i + 1),
            url: format!("https://social.example.com/{company}/{}", i + 1),
            snippet: (*snippet).to_string(),
            source_tag: SourceTag::Social,
            date: (*date).to_string(),
        })
        .collect()
}

/// One mention per social link on the profile; samples when there are none.
pub fn social_mentions(
    company: &str,
    profile: Option<&WebsiteProfile>,
) -> SourceOutcome<Vec<SocialMention>> {
    let links = profile.map(|p| p.social_links.as_slice()).unwrap_or_default();
    if links.is_empty() {
        return SourceOutcome::degraded(sample_social(company), DegradeReason::NoResults);
    }

    let date = profile
        .map(|p| p.fetched_at.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    let mentions = links
        .iter()
        .map(|link| {
            let platform = platform_of(link);
            SocialMention {
                title: format!("{company} · {platform}"),
                url: link.clone(),
                snippet: format!("{platform} 공식 계정"),
                source_tag: SourceTag::Social,
                date: date.clone(),
            }
        })
        .collect();
    SourceOutcome::Fresh(mentions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use insightmatch_shared::{ContactInfo, LegalInfo, ProfileStatus};

    fn profile(links: &[&str]) -> WebsiteProfile {
        WebsiteProfile {
            url: "https://alpha.co.kr".into(),
            title: "알파".into(),
            description: String::new(),
            keywords: Vec::new(),
            legal_info: LegalInfo::default(),
            contact_info: ContactInfo::default(),
            social_links: links.iter().map(|l| l.to_string()).collect(),
            status: ProfileStatus::Success,
            fetched_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn mentions_follow_profile_links() {
        let p = profile(&[
            "https://www.facebook.com/alpha",
            "https://www.LinkedIn.com/company/alpha",
        ]);
        let outcome = social_mentions("알파", Some(&p));
        assert!(!outcome.is_degraded());

        let mentions = outcome.into_value();
        assert_eq!(mentions.len(), 2);
        assert_eq!(mentions[0].title, "알파 · Facebook");
        assert_eq!(mentions[1].title, "알파 · LinkedIn");
        assert_eq!(mentions[1].url, "https://www.LinkedIn.com/company/alpha");
        assert_eq!(mentions[0].date, "2024-03-01");
        assert!(mentions.iter().all(|m| m.source_tag == SourceTag::Social));
    }

    #[test]
    fn no_links_gives_two_samples() {
        let p = profile(&[]);
        let outcome = social_mentions("알파", Some(&p));
        assert_eq!(outcome.reason(), Some(&DegradeReason::NoResults));
        let mentions = outcome.into_value();
        assert_eq!(mentions.len(), 2);
        assert_eq!(mentions[0].title, "알파 소셜 언급 1");
        assert_eq!(mentions[1].url, "https://social.example.com/알파/2");

        assert_eq!(social_mentions("알파", None).value().len(), 2);
    }
}
