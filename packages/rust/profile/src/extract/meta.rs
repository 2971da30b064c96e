//! Title, description and keywords from document markup.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

pub const NO_TITLE: &str = "제목 없음";
pub const NO_DESCRIPTION: &str = "설명 없음";

const TITLE_MAX_CHARS: usize = 100;
const DESCRIPTION_MAX_CHARS: usize = 200;
const HEADING_KEYWORD_MAX_CHARS: usize = 50;
const MAX_KEYWORDS: usize = 10;

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("title selector"));
static H1_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("h1 selector"));
static P_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").expect("p selector"));
static HEADINGS_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3").expect("headings selector"));
static META_DESCRIPTION_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[name="description"]"#).expect("meta description selector")
});
static META_KEYWORDS_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[name="keywords"]"#).expect("meta keywords selector")
});

/// First `max` characters of `s`.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// First `max` characters of `s` followed by `...`, if `s` is longer.
fn ellipsize(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        format!("{}...", truncate_chars(s, max))
    } else {
        s.to_string()
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn first_text(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

fn meta_content(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

/// `<title>`, else the first `<h1>`, else [`NO_TITLE`].
pub fn extract_title(doc: &Html) -> String {
    if let Some(title) = first_text(doc, &TITLE_SEL) {
        return ellipsize(&title, TITLE_MAX_CHARS);
    }
    if let Some(h1) = first_text(doc, &H1_SEL) {
        return truncate_chars(&h1, TITLE_MAX_CHARS);
    }
    NO_TITLE.to_string()
}

/// Meta description, else the first `<p>`, else [`NO_DESCRIPTION`].
pub fn extract_description(doc: &Html) -> String {
    if let Some(content) = meta_content(doc, &META_DESCRIPTION_SEL) {
        return truncate_chars(&content, DESCRIPTION_MAX_CHARS);
    }
    if let Some(p) = first_text(doc, &P_SEL) {
        return ellipsize(&p, DESCRIPTION_MAX_CHARS);
    }
    NO_DESCRIPTION.to_string()
}

/// Meta keywords followed by short `h1`-`h3` headings, first-seen, at most 10.
pub fn extract_keywords(doc: &Html) -> Vec<String> {
    let from_meta = meta_content(doc, &META_KEYWORDS_SEL)
        .map(|content| {
            content
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let from_headings = doc
        .select(&HEADINGS_SEL)
        .map(element_text)
        .filter(|t| !t.is_empty() && t.chars().count() < HEADING_KEYWORD_MAX_CHARS);

    let mut keywords: Vec<String> = Vec::new();
    for keyword in from_meta.into_iter().chain(from_headings) {
        if keywords.len() == MAX_KEYWORDS {
            break;
        }
        if !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
    }
    keywords
}
