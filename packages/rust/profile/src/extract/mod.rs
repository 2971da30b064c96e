//! Field extractors for homepage HTML.
//!
//! Each extractor is a pure function over the parsed document or its visible
//! text and never fails: a field that can't be found is left empty (or set to
//! its marker value).

pub mod contact;
pub mod legal;
pub mod meta;
pub mod text;

use chrono::Utc;
use insightmatch_shared::{ProfileStatus, WebsiteProfile};
use scraper::Html;

pub use contact::{extract_contact_info, extract_social_links};
pub use legal::extract_legal_info;
pub use meta::{NO_DESCRIPTION, NO_TITLE, extract_description, extract_keywords, extract_title};
pub use text::page_text;

/// Build a profile for `url` from its HTML.
pub fn extract_profile(url: &str, html: &str) -> WebsiteProfile {
    let doc = Html::parse_document(html);
    let text = page_text(&doc);

    WebsiteProfile {
        url: url.to_string(),
        title: extract_title(&doc),
        description: extract_description(&doc),
        keywords: extract_keywords(&doc),
        legal_info: extract_legal_info(&text),
        contact_info: extract_contact_info(&text),
        social_links: extract_social_links(&doc),
        status: ProfileStatus::Success,
        fetched_at: Utc::now(),
    }
}
