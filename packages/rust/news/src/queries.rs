//! Search query construction.

use url::{Host, Url};

/// Names longer than this (in characters) also get an exact-phrase query.
const QUOTE_MIN_CHARS: usize = 3;

/// Host labels that never identify a company.
const GENERIC_HOST_LABELS: [&str; 2] = ["www", "m"];

/// Ordered, de-duplicated search queries for a company.
///
/// 1. the bare name;
/// 2. the name in double quotes, if longer than three characters;
/// 3. the first host label of `homepage`.
pub fn build_queries(name: &str, homepage: Option<&str>) -> Vec<String> {
    let mut queries: Vec<String> = Vec::new();
    let name = name.trim();

    if !name.is_empty() {
        queries.push(name.to_string());
        if name.chars().count() > QUOTE_MIN_CHARS {
            queries.push(format!("\"{name}\""));
        }
    }

    if let Some(label) = homepage.and_then(host_label) {
        queries.push(label);
    }

    let mut unique = Vec::with_capacity(queries.len());
    for query in queries {
        if !unique.contains(&query) {
            unique.push(query);
        }
    }
    unique
}

/// First label of the homepage host, lower-cased, without a leading `www.`.
fn host_label(homepage: &str) -> Option<String> {
    let url = Url::parse(homepage.trim()).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    let host = match url.host()? {
        Host::Domain(domain) => unicode_domain(domain),
        ip => ip.to_string(),
    }
    .to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let label = host.split('.').next()?;

    if label.is_empty() || GENERIC_HOST_LABELS.contains(&label) {
        None
    } else {
        Some(label.to_string())
    }
}

/// Punycode labels decoded back to Unicode; left as-is if they don't decode.
fn unicode_domain(domain: &str) -> String {
    let (unicode, outcome) = idna::domain_to_unicode(domain);
    match outcome {
        Ok(()) => unicode,
        Err(_) => domain.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_with_homepage_gives_two_queries() {
        let queries = build_queries("알파", Some("https://www.alpha.co.kr"));
        assert_eq!(queries, vec!["알파", "alpha"]);
    }

    #[test]
    fn long_name_with_homepage_gives_three_queries() {
        let queries = build_queries("알파테크놀로지", Some("https://www.alpha.co.kr/about"));
        assert_eq!(queries, vec!["알파테크놀로지", "\"알파테크놀로지\"", "alpha"]);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // three Hangul syllables are nine bytes
        assert_eq!(build_queries("알파테", None), vec!["알파테"]);
        assert_eq!(build_queries("알파테크", None).len(), 2);
    }

    #[test]
    fn host_label_duplicate_of_name_is_dropped() {
        let queries = build_queries("acme", Some("https://acme.com"));
        assert_eq!(queries, vec!["acme"]);
    }

    #[test]
    fn generic_labels_are_skipped() {
        assert_eq!(build_queries("ab", Some("https://m.example.com")), vec!["ab"]);
        assert_eq!(build_queries("ab", Some("https://www.www.example.com")), vec!["ab"]);
    }

    #[test]
    fn hangul_host_label_stays_readable() {
        let queries = build_queries("알파", Some("https://www.알파테크.kr"));
        assert_eq!(queries, vec!["알파", "알파테크"]);
        assert_eq!(build_queries("", Some("https://xn--pe5bm7rgtaj8c.kr")), vec!["알파테크"]);
    }

    #[test]
    fn host_is_lowercased() {
        assert_eq!(build_queries("", Some("https://WWW.Example.COM")), vec!["example"]);
    }

    #[test]
    fn unparseable_homepage_adds_nothing() {
        assert_eq!(build_queries("알파", Some("not a url")), vec!["알파"]);
        assert_eq!(build_queries("알파", Some("example.com")), vec!["알파"]);
        assert!(build_queries("  ", None).is_empty());
    }
}
