//! Contact details and social links.

use std::sync::LazyLock;

use insightmatch_shared::ContactInfo;
use regex::Regex;
use scraper::{Html, Selector};

const MAX_PHONES: usize = 3;
const MAX_EMAILS: usize = 3;
const MAX_ADDRESSES: usize = 2;
const MAX_SOCIAL_LINKS: usize = 5;

static PHONE_RES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        r"\d{2,3}-\d{3,4}-\d{4}",
        r"\d{2,3} \d{3,4} \d{4}",
        r"\+82 ?\d{2,3} ?\d{3,4} ?\d{4}",
    ]
    .map(|p| Regex::new(p).expect("phone regex"))
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("email regex")
});

static ADDRESS_RES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        r"[가-힣]{2,4}(?:시|도) [가-힣]{2,4}(?:구|군|시) [가-힣 \d\-]+",
        r"[가-힣]{2,4}(?:구|군|시) [가-힣 \d\-]+",
    ]
    .map(|p| Regex::new(p).expect("address regex"))
});

static SOCIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:facebook|twitter|instagram|linkedin|youtube)\.com/[^/\s]+")
        .expect("social link regex")
});

static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("link selector"));

/// Distinct values in first-seen order, at most `cap`.
fn first_distinct<'a>(values: impl Iterator<Item = &'a str>, cap: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if out.len() == cap {
            break;
        }
        if !out.iter().any(|seen| seen == value) {
            out.push(value.to_string());
        }
    }
    out
}

fn all_matches<'t>(patterns: &'t [Regex], text: &'t str) -> impl Iterator<Item = &'t str> {
    patterns
        .iter()
        .flat_map(move |re| re.find_iter(text).map(|m| m.as_str().trim()))
}

pub fn extract_contact_info(text: &str) -> ContactInfo {
    ContactInfo {
        phones: first_distinct(all_matches(PHONE_RES.as_slice(), text), MAX_PHONES),
        emails: first_distinct(EMAIL_RE.find_iter(text).map(|m| m.as_str()), MAX_EMAILS),
        addresses: first_distinct(all_matches(ADDRESS_RES.as_slice(), text), MAX_ADDRESSES),
    }
}

/// Anchor targets on the major social platforms, first-seen, at most 5.
pub fn extract_social_links(doc: &Html) -> Vec<String> {
    let hrefs = doc
        .select(&LINK_SEL)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| SOCIAL_RE.is_match(href));
    first_distinct(hrefs, MAX_SOCIAL_LINKS)
}
