//! Company name derivation from a homepage URL.

use insightmatch_shared::{CompanyIdentity, UNKNOWN_COMPANY};
use url::{Host, ParseError, Url};

/// Derive a company name from a homepage URL. Never fails.
///
/// `https://www.example.co.kr` becomes `Example`: the first host label with
/// anything but ASCII letters, digits and Hangul syllables removed, then
/// capitalized. Unparseable input gives [`UNKNOWN_COMPANY`].
pub fn resolve_identity(url: &str) -> String {
    let Some(domain) = domain_of(url.trim()) else {
        return UNKNOWN_COMPANY.to_string();
    };
    let domain = domain.strip_prefix("www.").unwrap_or(&domain);

    let labels: Vec<&str> = domain.split('.').collect();
    let name = if labels.len() >= 2 {
        let cleaned: String = labels[0]
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || is_hangul_syllable(*c))
            .collect();
        capitalize(&cleaned)
    } else {
        capitalize(domain)
    };

    if name.trim().is_empty() {
        UNKNOWN_COMPANY.to_string()
    } else {
        name
    }
}

/// The identity for a request: an explicit non-blank name wins over the
/// derived one.
pub fn identify(url: &str, name: Option<&str>) -> CompanyIdentity {
    let normalized_name = match name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => resolve_identity(url),
    };
    CompanyIdentity {
        raw_url: url.to_string(),
        normalized_name,
    }
}

/// Host of an absolute URL, or the whole input when it has no scheme.
fn domain_of(input: &str) -> Option<String> {
    if input.is_empty() {
        return None;
    }
    match Url::parse(input) {
        Ok(url) => match url.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => Some(unicode_domain(domain)),
            Some(Host::Domain(_)) | None => Some(url.path().to_string()).filter(|p| !p.is_empty()),
            Some(ip) => Some(ip.to_string()),
        },
        Err(ParseError::RelativeUrlWithoutBase) => Some(input.to_string()),
        Err(_) => None,
    }
}

/// `Url` stores internationalized hosts as punycode; labels are compared in
/// their Unicode form.
fn unicode_domain(domain: &str) -> String {
    let (unicode, outcome) = idna::domain_to_unicode(domain);
    match outcome {
        Ok(()) => unicode,
        Err(_) => domain.to_string(),
    }
}

fn is_hangul_syllable(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

/// First character upper-case, the rest lower-case.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_www_and_public_suffix() {
        assert_eq!(resolve_identity("https://www.example.co.kr"), "Example");
        assert_eq!(resolve_identity("http://ACME.com/about"), "Acme");
        assert_eq!(resolve_identity("https://shop.example.com:8443"), "Shop");
    }

    #[test]
    fn removes_punctuation_from_label() {
        assert_eq!(resolve_identity("https://my-company.kr"), "Mycompany");
        assert_eq!(resolve_identity("알파테크.kr"), "알파테크");
    }

    #[test]
    fn hangul_domain_is_kept_in_unicode() {
        assert_eq!(resolve_identity("https://알파테크.kr"), "알파테크");
        assert_eq!(resolve_identity("https://www.베타소프트.co.kr/about"), "베타소프트");
        assert_eq!(resolve_identity("https://xn--pe5bm7rgtaj8c.kr"), "알파테크");
    }

    #[test]
    fn schemeless_input_uses_path() {
        assert_eq!(resolve_identity("example.com"), "Example");
        assert_eq!(resolve_identity("www.beta.io/contact"), "Beta");
    }

    #[test]
    fn single_label_host_is_capitalized_whole() {
        assert_eq!(resolve_identity("http://localhost:3000"), "Localhost");
    }

    #[test]
    fn malformed_input_is_unknown() {
        assert_eq!(resolve_identity("http://"), UNKNOWN_COMPANY);
        assert_eq!(resolve_identity("https://[::1"), UNKNOWN_COMPANY);
        assert_eq!(resolve_identity(""), UNKNOWN_COMPANY);
        assert_eq!(resolve_identity("!!!.com"), UNKNOWN_COMPANY);
    }

    #[test]
    fn explicit_name_wins() {
        let identity = identify("https://www.example.com", Some(" 알파테크 "));
        assert_eq!(identity.normalized_name, "알파테크");
        assert_eq!(identity.raw_url, "https://www.example.com");

        let identity = identify("https://www.example.com", Some("  "));
        assert_eq!(identity.normalized_name, "Example");
    }
}
