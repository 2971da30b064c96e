//! Legal entity details from page text.

use std::sync::LazyLock;

use insightmatch_shared::LegalInfo;
use regex::Regex;

/// Name next to a legal-form marker, in either order. Group 1 is the name.
static LEGAL_NAME_RES: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        r"([가-힣A-Za-z&·ㆍ\-\s]{2,}?)\s*(?:주식회사|㈜)",
        r"(?:주식회사|㈜)\s*([가-힣A-Za-z&·ㆍ\-\s]{2,})",
        r"([가-힣A-Za-z&·ㆍ\-\s]{2,}?)\s*(?:유한회사|\(유\))",
        r"(?:유한회사|\(유\))\s*([가-힣A-Za-z&·ㆍ\-\s]{2,})",
    ]
    .map(|p| Regex::new(p).expect("legal name regex"))
});

static REGISTRATION_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"사업자등록번호\s*:?\s*(\d{3}-\d{2}-\d{5})").expect("registration number regex")
});

static CEO_RES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        r"대표자\s*:?\s*([가-힣]{2,4})",
        r"대표이사\s*:?\s*([가-힣]{2,4})",
        r"CEO\s*:?\s*([가-힣A-Za-z ]{2,20})",
    ]
    .map(|p| Regex::new(p).expect("ceo regex"))
});

/// First non-blank group 1 of the first pattern that yields one.
fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|re| {
        re.captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .find(|s| !s.is_empty())
            .map(str::to_string)
    })
}

pub fn extract_legal_info(text: &str) -> LegalInfo {
    LegalInfo {
        legal_name: first_capture(LEGAL_NAME_RES.as_slice(), text),
        registration_number: REGISTRATION_NUMBER_RE
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string()),
        ceo_name: first_capture(CEO_RES.as_slice(), text),
    }
}
