use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?[0-9][0-9\s\-().]{8,18}[0-9]").unwrap());
static WEBSITE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)https?://[^\s<>"]+|www\.[^\s<>"]+\.[a-z]{2,}"#).unwrap()
});

/// First email-looking token in free text, if any.
pub fn email_from_text(text: &str) -> Option<String> {
    EMAIL_RE.find(text).map(|m| m.as_str().to_string())
}

/// First phone-looking run of digits and separators in free text.
pub fn phone_from_text(text: &str) -> Option<String> {
    PHONE_RE.find(text).map(|m| m.as_str().trim().to_string())
}

/// First URL in free text; bare `www.` hosts are left as-is for the
/// normalizer to scheme-qualify.
pub fn website_from_text(text: &str) -> Option<String> {
    WEBSITE_RE
        .find(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',']).to_string())
}

/// Listing pages for unrelated commodities come back from the same search
/// endpoints; a page that never mentions any search keyword is noise.
pub fn page_mentions_any(text: &str, keywords: &[String]) -> bool {
    let lowered = text.to_lowercase();
    keywords.iter().any(|k| lowered.contains(k.as_str()))
}

/// Keywords screened against fetched pages: the individual words of the
/// search term, lowercased, ignoring generic filler like "buyer".
pub fn screening_keywords(search_term: &str) -> Vec<String> {
    search_term
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.len() >= 4 && !matches!(*w, "buyer" | "bulk" | "company"))
        .map(|w| w.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulls_email_out_of_contact_blurb() {
        let text = "Contact: Mr. Sharma, Email: Sales@AbcTrading.com, Phone: +91-9876543210";
        assert_eq!(email_from_text(text), Some("Sales@AbcTrading.com".into()));
    }

    #[test]
    fn pulls_phone_with_separators() {
        let text = "Call us on +91-98765 43210 today";
        assert_eq!(phone_from_text(text), Some("+91-98765 43210".into()));
    }

    #[test]
    fn pulls_bare_www_host() {
        let text = "Visit www.abctrading.co.in for catalogue.";
        assert_eq!(website_from_text(text), Some("www.abctrading.co.in".into()));
    }

    #[test]
    fn no_matches_yield_none() {
        assert_eq!(email_from_text("no contact data"), None);
        assert_eq!(phone_from_text("no digits here"), None);
        assert_eq!(website_from_text("plain sentence"), None);
    }

    #[test]
    fn screening_keywords_drop_filler_words() {
        let kw = screening_keywords("bulk turmeric buyer");
        assert_eq!(kw, vec!["turmeric".to_string()]);
    }

    #[test]
    fn relevance_gate_matches_case_insensitively() {
        let kw = screening_keywords("Turmeric powder");
        assert!(page_mentions_any("Leading TURMERIC exporters", &kw));
        assert!(!page_mentions_any("Steel pipes wholesale", &kw));
    }
}
