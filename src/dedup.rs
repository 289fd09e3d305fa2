use crate::types::{Field, ValidatedRecord};
use std::collections::HashSet;
use tracing::debug;

/// Legal-form tokens ignored when comparing company names; "ABC Trading" and
/// "ABC Trading Pvt. Ltd." should compare as the same name.
const NAME_STOPWORDS: &[&str] = &[
    "pvt", "ltd", "llp", "llc", "inc", "corp", "co", "private", "limited", "company",
    "enterprises", "industries", "international",
];

/// Similarity fingerprint for duplicate-set membership. Derived from a
/// validated record and owned by the deduplicator for the run.
#[derive(Debug, Clone)]
struct DedupKey {
    name: String,
    name_tokens: HashSet<String>,
    email: Option<String>,
    email_domain: Option<String>,
    /// Last 10 digits, enough to match across country-code variants
    phone_tail: Option<String>,
    domain: Option<String>,
}

fn name_tokens(name: &str) -> HashSet<String> {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !NAME_STOPWORDS.contains(t))
        .map(|t| t.to_string())
        .collect()
}

fn phone_tail(field: &Field) -> Option<String> {
    let digits: String = field
        .as_parsed()?
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    if digits.len() < 7 {
        return None;
    }
    let tail_len = digits.len().min(10);
    Some(digits[digits.len() - tail_len..].to_string())
}

fn website_domain(field: &Field) -> Option<String> {
    let url = field.as_parsed()?;
    let host = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = host.split('/').next()?.trim_start_matches("www.");
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

impl DedupKey {
    fn from_record(record: &ValidatedRecord) -> Self {
        let rec = &record.record;
        let email = rec.email.as_parsed().map(|e| e.to_string());
        let email_domain = email
            .as_deref()
            .and_then(|e| e.rsplit_once('@').map(|(_, d)| d.to_string()));
        Self {
            name: rec.company_name.to_lowercase(),
            name_tokens: name_tokens(&rec.company_name),
            email,
            email_domain,
            phone_tail: phone_tail(&rec.phone),
            domain: website_domain(&rec.website),
        }
    }

    fn exact_contact_match(&self, other: &Self) -> bool {
        matches_some(&self.email, &other.email)
            || matches_some(&self.domain, &other.domain)
            || matches_some(&self.phone_tail, &other.phone_tail)
    }

    /// Looser contact overlap used together with name similarity: shared
    /// email domain or a shared 7-digit phone tail.
    fn near_contact_match(&self, other: &Self) -> bool {
        if matches_some(&self.email_domain, &other.email_domain) {
            return true;
        }
        if let (Some(a), Some(b)) = (&self.phone_tail, &other.phone_tail) {
            let n = a.len().min(b.len()).min(7);
            if n >= 7 && a[a.len() - n..] == b[b.len() - n..] {
                return true;
            }
        }
        false
    }
}

fn matches_some(a: &Option<String>, b: &Option<String>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

/// Name similarity: the better of normalized Levenshtein over the full
/// lowercased names and token-set overlap with legal-form noise removed.
fn name_similarity(a: &DedupKey, b: &DedupKey) -> f64 {
    let edit = strsim::normalized_levenshtein(&a.name, &b.name);

    let union = a.name_tokens.union(&b.name_tokens).count();
    let overlap = if union == 0 {
        0.0
    } else {
        a.name_tokens.intersection(&b.name_tokens).count() as f64 / union as f64
    };

    edit.max(overlap)
}

/// Collapses near-duplicate records for one run. First-seen wins; later
/// duplicates are dropped and counted, never merged. Mutated only from the
/// pipeline's single consumer task.
pub struct Deduplicator {
    threshold: f64,
    accepted: Vec<DedupKey>,
    dropped: usize,
}

impl Deduplicator {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            accepted: Vec::new(),
            dropped: 0,
        }
    }

    fn is_duplicate_of(&self, key: &DedupKey, seen: &DedupKey) -> bool {
        // An exact contact match is decisive on its own
        if key.exact_contact_match(seen) {
            return true;
        }
        name_similarity(key, seen) >= self.threshold && key.near_contact_match(seen)
    }

    /// Admit a record if it duplicates nothing accepted so far.
    pub fn accept(&mut self, record: &ValidatedRecord) -> bool {
        let key = DedupKey::from_record(record);
        let duplicate = self.accepted.iter().any(|seen| self.is_duplicate_of(&key, seen));
        if duplicate {
            self.dropped += 1;
            debug!(company = %record.record.company_name, "dropped duplicate record");
            false
        } else {
            self.accepted.push(key);
            true
        }
    }

    pub fn unique_count(&self) -> usize {
        self.accepted.len()
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped
    }
}
