use crate::types::CheckStatus;
use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder and spam company names seen in scraped listings. A match on
/// any of these rejects the record outright.
static SPAM_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"test\s*company",
        r"example\s*corp",
        r"sample\s*ltd",
        r"dummy\s*business",
        r"fake\s*enterprise",
        r"xxx+",
        r"aaa+",
        r"lorem\s*ipsum",
        r"john\s*doe",
        r"company\s*name",
        r"business\s*here",
        r"enter\s*name",
        r"your\s*company",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// True when any character repeats five or more times in a row. The regex
/// crate has no backreferences, so this is a plain scan.
fn has_repeated_run(text: &str) -> bool {
    let mut run = 1;
    let mut prev: Option<char> = None;
    for c in text.chars() {
        if prev == Some(c) {
            run += 1;
            if run >= 5 {
                return true;
            }
        } else {
            run = 1;
            prev = Some(c);
        }
    }
    false
}

/// Plausibility check for company names: rejects placeholders, all-numeric
/// strings, too-short names, and runs of 5+ repeated characters.
pub fn check_name(name: &str) -> CheckStatus {
    let trimmed = name.trim();
    if trimmed.len() < 3 {
        return CheckStatus::Invalid;
    }

    if !trimmed.chars().any(|c| c.is_alphabetic()) {
        return CheckStatus::Invalid;
    }

    let lowered = trimmed.to_lowercase();
    if SPAM_PATTERNS.iter().any(|p| p.is_match(&lowered)) {
        return CheckStatus::Invalid;
    }

    if has_repeated_run(trimmed) {
        return CheckStatus::Invalid;
    }

    CheckStatus::Valid
}
