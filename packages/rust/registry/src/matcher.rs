//! Company-name matching against the registry index.
//!
//! Rules, strongest first:
//! 1. case-insensitive containment (either direction) between the raw names;
//! 2. containment between the normalized names;
//! 3. normalized-name similarity of at least [`SIMILARITY_THRESHOLD`].
//!
//! With [`MatchStrategy::FirstMatch`] the first entry in index order that
//! satisfies any rule wins, even if a later entry would match better.
//! [`MatchStrategy::BestScore`] scans every entry instead.

use std::collections::HashMap;
use std::sync::LazyLock;

use insightmatch_shared::{MatchStrategy, RegistryEntry};
use regex::Regex;

/// Minimum normalized similarity for a fuzzy match.
pub const SIMILARITY_THRESHOLD: f64 = 0.8;

/// Legal-entity markers removed during normalization.
const LEGAL_FORM_TOKENS: [&str; 7] = [
    "주식회사",
    "(주)",
    "㈜",
    "유한회사",
    "(유)",
    "합자회사",
    "(합)",
];

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

static BRACKETS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[()\[\]{}]").expect("brackets regex"));

/// Canonical comparison form of a company name.
///
/// Idempotent: removing one marker can expose another (`주[식]회사`), so the
/// pass repeats until nothing changes.
pub fn normalize_company_name(name: &str) -> String {
    let mut current = normalize_once(name);
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(name: &str) -> String {
    let mut out = WHITESPACE_RE.replace_all(name, "").into_owned();
    for token in LEGAL_FORM_TOKENS {
        out = out.replace(token, "");
    }
    BRACKETS_RE.replace_all(&out, "").to_lowercase()
}

/// Matching-blocks similarity in `[0, 1]`, counted in characters.
///
/// `2·M / (len(a) + len(b))`, where `M` is the total size of the blocks
/// found by repeatedly taking the longest common run and recursing on both
/// sides of it (Ratcliff/Obershelp). Two empty strings are identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * BlockMatcher::new(&a, &b).matched_chars() as f64 / total as f64
}

/// Sequences at least this long drop their most frequent characters from
/// the block index.
const POPULAR_MIN_LEN: usize = 200;

struct BlockMatcher<'s> {
    a: &'s [char],
    b: &'s [char],
    /// Positions of each character in `b`, ascending.
    b_positions: HashMap<char, Vec<usize>>,
}

impl<'s> BlockMatcher<'s> {
    fn new(a: &'s [char], b: &'s [char]) -> Self {
        let mut b_positions: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b_positions.entry(*c).or_default().push(j);
        }
        if b.len() >= POPULAR_MIN_LEN {
            let limit = b.len() / 100 + 1;
            b_positions.retain(|_, positions| positions.len() <= limit);
        }
        Self { a, b, b_positions }
    }

    /// Total length of all matching blocks.
    fn matched_chars(&self) -> usize {
        let mut pending = vec![(0, self.a.len(), 0, self.b.len())];
        let mut matched = 0;
        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let (i, j, k) = self.longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            matched += k;
            if alo < i && blo < j {
                pending.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                pending.push((i + k, ahi, j + k, bhi));
            }
        }
        matched
    }

    /// Longest common run in `a[alo..ahi]` and `b[blo..bhi]` as
    /// `(start in a, start in b, length)`; earliest wins ties.
    fn longest_match(
        &self,
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (a, b) = (self.a, self.b);
        let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);
        let mut run_ending_at: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next_runs = HashMap::new();
            if let Some(positions) = self.b_positions.get(&a[i]) {
                for &j in positions.iter().filter(|&&j| j >= blo).take_while(|&&j| j < bhi) {
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| run_ending_at.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_runs.insert(j, k);
                    if k > best_len {
                        (best_i, best_j, best_len) = (i + 1 - k, j + 1 - k, k);
                    }
                }
            }
            run_ending_at = next_runs;
        }

        // Characters left out of the index can still extend a run.
        while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_len += 1;
        }
        while best_i + best_len < ahi
            && best_j + best_len < bhi
            && a[best_i + best_len] == b[best_j + best_len]
        {
            best_len += 1;
        }
        (best_i, best_j, best_len)
    }
}

/// Which rule accepted a candidate. Ordered strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchRule {
    RawContainment,
    NormalizedContainment,
    Similarity,
}

/// An accepted candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct NameMatch<'a> {
    pub entry: &'a RegistryEntry,
    pub rule: MatchRule,
    /// Similarity of the normalized names.
    pub similarity: f64,
    /// Position of the entry in the index.
    pub position: usize,
}

/// A query name prepared once and tested against many candidates.
struct Query {
    lowered: String,
    normalized: String,
}

impl Query {
    fn new(name: &str) -> Self {
        Self {
            lowered: name.trim().to_lowercase(),
            normalized: normalize_company_name(name),
        }
    }

    fn rule_for(&self, candidate: &str) -> (Option<MatchRule>, f64) {
        let lowered = candidate.to_lowercase();
        let normalized = normalize_company_name(candidate);
        let score = similarity(&self.normalized, &normalized);

        if lowered.contains(&self.lowered) || self.lowered.contains(&lowered) {
            return (Some(MatchRule::RawContainment), score);
        }

        if !self.normalized.is_empty()
            && !normalized.is_empty()
            && (normalized.contains(&self.normalized) || self.normalized.contains(&normalized))
        {
            return (Some(MatchRule::NormalizedContainment), score);
        }

        if score >= SIMILARITY_THRESHOLD {
            return (Some(MatchRule::Similarity), score);
        }

        (None, score)
    }
}

/// Find the registry entry for `name`. A blank name never matches.
pub fn find_match<'a>(
    entries: &'a [RegistryEntry],
    name: &str,
    strategy: MatchStrategy,
) -> Option<NameMatch<'a>> {
    if name.trim().is_empty() {
        return None;
    }
    let query = Query::new(name);

    let mut candidates = entries.iter().enumerate().filter_map(|(position, entry)| {
        let (rule, similarity) = query.rule_for(&entry.legal_name);
        rule.map(|rule| NameMatch {
            entry,
            rule,
            similarity,
            position,
        })
    });

    match strategy {
        MatchStrategy::FirstMatch => candidates.next(),
        MatchStrategy::BestScore => candidates.fold(None, |best: Option<NameMatch<'a>>, next| {
            match best {
                Some(best) if !outranks(&next, &best) => Some(best),
                _ => Some(next),
            }
        }),
    }
}

/// Stronger rule first, then higher similarity. Ties keep the earlier entry.
fn outranks(candidate: &NameMatch<'_>, current: &NameMatch<'_>) -> bool {
    candidate.rule < current.rule
        || (candidate.rule == current.rule && candidate.similarity > current.similarity)
}
