use crate::error::{Result, ScraperError};
use crate::types::{Field, Location, LocationConfidence, NormalizedRecord, RawRecord};
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static COMPANY_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(M/s\.?|Messrs\.?)\s*").unwrap());
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap());
static DOMAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9\-.]*\.[A-Za-z]{2,}").unwrap());

/// Legal-suffix spellings folded to one canonical form. Applied after
/// title-casing, so each left-hand side is the title-cased spelling.
const SUFFIX_CANON: &[(&str, &str)] = &[
    ("Private Limited", "Pvt. Ltd."),
    ("Pvt Ltd", "Pvt. Ltd."),
    ("Pvt. Ltd", "Pvt. Ltd."),
    ("Llp", "LLP"),
    ("Llc", "LLC"),
    ("Corp", "Corp."),
    ("Corp.", "Corp."),
    ("Inc", "Inc."),
    ("Inc.", "Inc."),
    ("& Co", "& Co."),
];

/// Known city -> (region, country) aliases for the bundled India-centric
/// platforms. Free text that resolves here gets a high-confidence triple.
const CITY_ALIASES: &[(&str, &str, &str)] = &[
    ("mumbai", "Maharashtra", "India"),
    ("bombay", "Maharashtra", "India"),
    ("pune", "Maharashtra", "India"),
    ("nagpur", "Maharashtra", "India"),
    ("nashik", "Maharashtra", "India"),
    ("chennai", "Tamil Nadu", "India"),
    ("madras", "Tamil Nadu", "India"),
    ("coimbatore", "Tamil Nadu", "India"),
    ("madurai", "Tamil Nadu", "India"),
    ("salem", "Tamil Nadu", "India"),
    ("delhi", "Delhi", "India"),
    ("new delhi", "Delhi", "India"),
    ("bangalore", "Karnataka", "India"),
    ("bengaluru", "Karnataka", "India"),
    ("mysore", "Karnataka", "India"),
    ("hubli", "Karnataka", "India"),
    ("ahmedabad", "Gujarat", "India"),
    ("surat", "Gujarat", "India"),
    ("vadodara", "Gujarat", "India"),
    ("rajkot", "Gujarat", "India"),
    ("kolkata", "West Bengal", "India"),
    ("hyderabad", "Telangana", "India"),
    ("kochi", "Kerala", "India"),
    ("erode", "Tamil Nadu", "India"),
];

/// Strip HTML remnants and collapse whitespace. Every field goes through this
/// before field-specific handling.
pub fn clean_text(text: &str) -> String {
    let text = HTML_TAG_RE.replace_all(text, "");
    WHITESPACE_RE.replace_all(text.trim(), " ").to_string()
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Canonicalize a company name: trim, collapse whitespace, drop `M/s` style
/// prefixes, title-case, then fold legal suffixes to one spelling. The
/// composition is idempotent: re-running it on its own output is a no-op.
pub fn normalize_company_name(name: &str) -> String {
    let cleaned = clean_text(name);
    let without_prefix = COMPANY_PREFIX_RE.replace(&cleaned, "");

    let mut titled = without_prefix
        .split(' ')
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ");

    for (from, to) in SUFFIX_CANON {
        if let Some(pos) = titled.rfind(from) {
            // Only fold when the spelling sits at the end of the name
            if pos + from.len() == titled.len() {
                titled.replace_range(pos.., to);
            }
        }
    }
    titled
}

/// Attempt E.164. Strips separators, honors an explicit `+` country code,
/// drops a national trunk zero, and falls back to the source-locale default
/// code for bare national numbers. 7-15 significant digits or Unparseable.
pub fn normalize_phone(phone: &str, default_country_code: &str) -> Field {
    let cleaned = clean_text(phone);
    if cleaned.is_empty() {
        return Field::Empty;
    }

    let has_plus = cleaned.trim_start().starts_with('+');
    let digits: String = cleaned.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Field::Unparseable;
    }

    let full = if has_plus {
        digits
    } else if digits.len() == 10 {
        format!("{}{}", default_country_code, digits)
    } else if digits.len() == 11 && digits.starts_with('0') {
        // National trunk prefix
        format!("{}{}", default_country_code, &digits[1..])
    } else {
        // Anything longer is assumed to already carry its country code
        digits
    };

    if (7..=15).contains(&full.len()) {
        Field::Parsed(format!("+{}", full))
    } else {
        Field::Unparseable
    }
}

/// Lowercase and trim; syntactically malformed addresses are rejected here so
/// the validator never sees them.
pub fn normalize_email(email: &str) -> Field {
    let cleaned = clean_text(email).to_lowercase();
    if cleaned.is_empty() {
        return Field::Empty;
    }
    if EMAIL_RE.is_match(&cleaned) {
        Field::Parsed(cleaned)
    } else {
        Field::Unparseable
    }
}

/// Normalize a website URL: lowercase host, default https scheme. Anything
/// that does not look like a domain is Unparseable.
pub fn normalize_website(website: &str) -> Field {
    let cleaned = clean_text(website);
    if cleaned.is_empty() {
        return Field::Empty;
    }
    let lowered = cleaned.to_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);

    if DOMAIN_RE.is_match(without_scheme) {
        Field::Parsed(format!("https://{}", without_scheme.trim_end_matches('/')))
    } else {
        Field::Unparseable
    }
}

/// Map free-text location to a `(city, region, country)` triple. Comma-split
/// parts are alias-matched; unresolvable text is kept verbatim in `city` with
/// low confidence rather than discarded.
pub fn normalize_location(address: &str) -> Location {
    let cleaned = clean_text(address);
    if cleaned.is_empty() {
        return Location {
            city: String::new(),
            region: String::new(),
            country: String::new(),
            confidence: LocationConfidence::Low,
        };
    }

    let parts: Vec<String> = cleaned
        .split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    // Alias lookup over every comma part, earliest match wins
    for part in &parts {
        let key = part.to_lowercase();
        for (alias, region, country) in CITY_ALIASES {
            if key == *alias || key.contains(*alias) {
                return Location {
                    city: title_case_word(alias),
                    region: (*region).to_string(),
                    country: (*country).to_string(),
                    confidence: LocationConfidence::High,
                };
            }
        }
    }

    // Fall back to positional split, verbatim, low confidence
    Location {
        city: parts.first().cloned().unwrap_or_default(),
        region: parts.get(1).cloned().unwrap_or_default(),
        country: parts.get(2).cloned().unwrap_or_default(),
        confidence: LocationConfidence::Low,
    }
}

/// Turn a raw scraped record into its canonical form. Records with no name or
/// with every contact field empty are dropped with `IncompleteRecord`.
pub fn normalize_record(raw: &RawRecord, default_country_code: &str) -> Result<NormalizedRecord> {
    let company_name = normalize_company_name(&raw.name);
    let phone = normalize_phone(&raw.phone, default_country_code);
    let email = normalize_email(&raw.email);
    let website = normalize_website(&raw.website);
    let location = normalize_location(&raw.address);

    let no_contact = phone.as_parsed().is_none()
        && email.as_parsed().is_none()
        && website.as_parsed().is_none();
    if company_name.len() < 3 || no_contact {
        return Err(ScraperError::IncompleteRecord {
            platform: raw.source.to_string(),
        });
    }

    Ok(NormalizedRecord {
        source: raw.source,
        company_name,
        phone,
        email,
        website,
        location,
        listing_url: raw.listing_url.clone(),
        fetched_at: raw.fetched_at,
    })
}
