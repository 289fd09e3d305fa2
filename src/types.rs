use crate::error::Result;
use crate::fetch::PoliteClient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for an external listing platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    TradeIndia,
    IndiaMart,
    ExportersIndia,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::TradeIndia => "tradeindia",
            SourceId::IndiaMart => "indiamart",
            SourceId::ExportersIndia => "exportersindia",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "tradeindia" => Some(SourceId::TradeIndia),
            "indiamart" => Some(SourceId::IndiaMart),
            "exportersindia" => Some(SourceId::ExportersIndia),
            _ => None,
        }
    }

    pub fn all() -> &'static [SourceId] {
        &[
            SourceId::TradeIndia,
            SourceId::IndiaMart,
            SourceId::ExportersIndia,
        ]
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw company listing as scraped from a platform page, before any cleanup.
/// Immutable once produced by an adapter; discarded after normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub source: SourceId,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub website: String,
    pub description: String,
    /// URL of the listing page this record was parsed from
    pub listing_url: String,
    pub fetched_at: DateTime<Utc>,
}

/// A text field after normalization: either a canonical value or the reason
/// it could not be canonicalized. Downstream stages match on this instead of
/// re-inspecting raw text shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    Parsed(String),
    Unparseable,
    Empty,
}

impl Field {
    pub fn as_parsed(&self) -> Option<&str> {
        match self {
            Field::Parsed(v) => Some(v),
            _ => None,
        }
    }
}

/// Confidence in the location triple produced by normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationConfidence {
    High,
    Low,
}

/// Canonical `(city, region, country)` triple. Unresolvable free text is kept
/// verbatim in `city` with `confidence` set to `Low`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub region: String,
    pub country: String,
    pub confidence: LocationConfidence,
}

/// Record with canonical field values, ready for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub source: SourceId,
    pub company_name: String,
    pub phone: Field,
    pub email: Field,
    pub website: Field,
    pub location: Location,
    pub listing_url: String,
    pub fetched_at: DateTime<Utc>,
}

/// Outcome of a single validation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    Valid,
    Invalid,
    /// Could not confirm, not confirmed wrong (timeouts, ambiguous redirects)
    Unverifiable,
}

/// Which validation checks to run. Mirrors the `enabled_checks` config set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    Email,
    Phone,
    Domain,
    Name,
}

impl CheckKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Email => "email",
            CheckKind::Phone => "phone",
            CheckKind::Domain => "domain",
            CheckKind::Name => "name",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "email" => Some(CheckKind::Email),
            "phone" => Some(CheckKind::Phone),
            "domain" => Some(CheckKind::Domain),
            "name" => Some(CheckKind::Name),
            _ => None,
        }
    }
}

/// Per-field verdicts plus the overall record status and a 0-100 confidence
/// score. A check that was not enabled for the run is recorded as `None` and
/// contributes nothing to the score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub email: Option<CheckStatus>,
    pub phone: Option<CheckStatus>,
    pub domain: Option<CheckStatus>,
    pub name: Option<CheckStatus>,
    pub overall: CheckStatus,
    pub confidence: u8,
}

impl ValidationVerdict {
    /// Overall status: Valid only if every enabled check is Valid; Invalid if
    /// any enabled check is Invalid; otherwise Unverifiable.
    pub fn combine(checks: &[Option<CheckStatus>]) -> CheckStatus {
        let enabled: Vec<CheckStatus> = checks.iter().filter_map(|c| *c).collect();
        if enabled.iter().any(|s| *s == CheckStatus::Invalid) {
            CheckStatus::Invalid
        } else if enabled.iter().all(|s| *s == CheckStatus::Valid) {
            CheckStatus::Valid
        } else {
            CheckStatus::Unverifiable
        }
    }

    /// Confidence in the record, 0-100: each enabled check contributes
    /// equally, with Valid worth full marks, Unverifiable half, Invalid
    /// nothing. No enabled checks means nothing disputed the record.
    pub fn confidence(checks: &[Option<CheckStatus>]) -> u8 {
        let enabled: Vec<CheckStatus> = checks.iter().filter_map(|c| *c).collect();
        if enabled.is_empty() {
            return 100;
        }
        let halves: usize = enabled
            .iter()
            .map(|s| match s {
                CheckStatus::Valid => 2,
                CheckStatus::Unverifiable => 1,
                CheckStatus::Invalid => 0,
            })
            .sum();
        (halves * 50 / enabled.len()) as u8
    }
}

/// A record that passed every enabled validation check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedRecord {
    pub record: NormalizedRecord,
    pub verdict: ValidationVerdict,
}

impl ValidatedRecord {
    /// Always true for emitted records; kept explicit because the CSV export
    /// carries the column.
    pub fn status_verified(&self) -> bool {
        self.verdict.overall == CheckStatus::Valid
    }
}

/// Snapshot emitted after each fully processed page. Consumed immediately by
/// the presentation shell, never stored by the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub source: SourceId,
    pub pages_fetched: u32,
    pub records_fetched: usize,
    pub records_validated: usize,
    pub records_remaining: usize,
}

/// Aggregate counters for one pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub total_fetched: usize,
    pub total_validated: usize,
    pub total_incomplete_dropped: usize,
    pub total_invalid_dropped: usize,
    pub total_unverifiable_dropped: usize,
    pub total_duplicates_dropped: usize,
    pub pages_fetched: u32,
    pub page_failures: u32,
    pub elapsed_ms: u64,
}

/// One page worth of raw records plus the pagination hint.
#[derive(Debug)]
pub struct PageBatch {
    pub records: Vec<RawRecord>,
    pub has_more: bool,
}

/// Core trait every listing-platform adapter implements. Adapters own the
/// platform's pagination and markup quirks; politeness (delay, user-agent
/// rotation, retry) lives in the shared [`PoliteClient`].
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Unique identifier for this platform
    fn source_id(&self) -> SourceId;

    /// Fetch one listing page of search results for the configured commodity
    async fn fetch_page(&self, page: u32, client: &PoliteClient) -> Result<String>;

    /// Parse a fetched page into raw records. Must return
    /// `ScraperError::Parse` when the markup is unrecognized rather than
    /// panicking or silently returning nothing for a non-empty page.
    fn parse_page(&self, html: &str, page: u32) -> Result<Vec<RawRecord>>;

    /// Fetch and parse one page. `has_more` is false once the platform stops
    /// yielding listings, which ends pagination for this source.
    async fn fetch_batch(&self, page: u32, client: &PoliteClient) -> Result<PageBatch> {
        let html = self.fetch_page(page, client).await?;
        let records = self.parse_page(&html, page)?;
        let has_more = !records.is_empty();
        Ok(PageBatch { records, has_more })
    }
}
