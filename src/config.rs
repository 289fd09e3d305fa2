use crate::error::{Result, ScraperError};
use crate::types::{CheckKind, SourceId};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;

/// Browser user-agent strings rotated across page requests to reduce
/// blocking. Adapters never pick one themselves; the shared client does.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// Immutable per-run configuration supplied by the caller (CLI or shell).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Commodity search term, e.g. "turmeric buyer"
    pub search_term: String,
    /// Stop once this many unique validated records are accumulated
    pub target_count: usize,
    pub sources: Vec<SourceId>,
    /// Randomized politeness delay bounds between page requests
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
    pub enabled_checks: HashSet<CheckKind>,
    /// Name similarity above which a contact-field match makes a duplicate
    pub dedup_threshold: f64,
    pub max_pages_per_source: u32,
    pub worker_limit: usize,
    pub request_timeout_ms: u64,
    /// Budget for each individual validation check (MX lookup, liveness probe)
    pub check_timeout_ms: u64,
    /// Country calling code assumed for bare national phone numbers
    pub default_country_code: String,
    pub user_agents: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search_term: "turmeric buyer".to_string(),
            target_count: 50,
            sources: SourceId::all().to_vec(),
            delay_min_ms: 500,
            delay_max_ms: 2000,
            enabled_checks: [
                CheckKind::Email,
                CheckKind::Phone,
                CheckKind::Domain,
                CheckKind::Name,
            ]
            .into_iter()
            .collect(),
            dedup_threshold: 0.85,
            max_pages_per_source: 5,
            worker_limit: 3,
            request_timeout_ms: 15_000,
            check_timeout_ms: 5_000,
            default_country_code: "91".to_string(),
            user_agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PipelineConfig {
    /// Checks the invariants the pipeline assumes hold for the whole run.
    pub fn validate(&self) -> Result<()> {
        if self.search_term.trim().len() < 3 {
            return Err(ScraperError::Config(
                "search term must be at least 3 characters".into(),
            ));
        }
        if self.target_count == 0 {
            return Err(ScraperError::Config("target count must be > 0".into()));
        }
        if self.sources.is_empty() {
            return Err(ScraperError::Config(
                "at least one source must be enabled".into(),
            ));
        }
        if self.delay_min_ms > self.delay_max_ms {
            return Err(ScraperError::Config(format!(
                "delay range is inverted: min {}ms > max {}ms",
                self.delay_min_ms, self.delay_max_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.dedup_threshold) {
            return Err(ScraperError::Config(format!(
                "dedup threshold {} is outside [0, 1]",
                self.dedup_threshold
            )));
        }
        if self.worker_limit == 0 {
            return Err(ScraperError::Config("worker limit must be > 0".into()));
        }
        if self.user_agents.is_empty() {
            return Err(ScraperError::Config(
                "user agent pool must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Load overrides from a TOML file and apply them on top of defaults.
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!("Failed to read config file '{}': {}", path, e))
        })?;
        let file: ConfigFile = toml::from_str(&content)?;
        let config = file.into_config()?;
        config.validate()?;
        Ok(config)
    }
}

/// On-disk shape of the config file; every field optional so a partial file
/// only overrides what it names.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    search_term: Option<String>,
    target_count: Option<usize>,
    sources: Option<Vec<String>>,
    delay_min_ms: Option<u64>,
    delay_max_ms: Option<u64>,
    enabled_checks: Option<Vec<String>>,
    dedup_threshold: Option<f64>,
    max_pages_per_source: Option<u32>,
    worker_limit: Option<usize>,
    request_timeout_ms: Option<u64>,
    check_timeout_ms: Option<u64>,
    default_country_code: Option<String>,
    user_agents: Option<Vec<String>>,
}

impl ConfigFile {
    fn into_config(self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::default();
        if let Some(v) = self.search_term {
            config.search_term = v;
        }
        if let Some(v) = self.target_count {
            config.target_count = v;
        }
        if let Some(names) = self.sources {
            config.sources = parse_sources(&names)?;
        }
        if let Some(v) = self.delay_min_ms {
            config.delay_min_ms = v;
        }
        if let Some(v) = self.delay_max_ms {
            config.delay_max_ms = v;
        }
        if let Some(names) = self.enabled_checks {
            config.enabled_checks = parse_checks(&names)?;
        }
        if let Some(v) = self.dedup_threshold {
            config.dedup_threshold = v;
        }
        if let Some(v) = self.max_pages_per_source {
            config.max_pages_per_source = v;
        }
        if let Some(v) = self.worker_limit {
            config.worker_limit = v;
        }
        if let Some(v) = self.request_timeout_ms {
            config.request_timeout_ms = v;
        }
        if let Some(v) = self.check_timeout_ms {
            config.check_timeout_ms = v;
        }
        if let Some(v) = self.default_country_code {
            config.default_country_code = v;
        }
        if let Some(v) = self.user_agents {
            if !v.is_empty() {
                config.user_agents = v;
            }
        }
        Ok(config)
    }
}

pub fn parse_sources(names: &[String]) -> Result<Vec<SourceId>> {
    let mut sources = Vec::new();
    for name in names {
        let id = SourceId::parse(name)
            .ok_or_else(|| ScraperError::Config(format!("unknown source '{}'", name)))?;
        if !sources.contains(&id) {
            sources.push(id);
        }
    }
    Ok(sources)
}

pub fn parse_checks(names: &[String]) -> Result<HashSet<CheckKind>> {
    let mut checks = HashSet::new();
    for name in names {
        let kind = CheckKind::parse(name)
            .ok_or_else(|| ScraperError::Config(format!("unknown check '{}'", name)))?;
        checks.insert(kind);
    }
    Ok(checks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_passes_validation() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_delay_range_is_rejected() {
        let config = PipelineConfig {
            delay_min_ms: 3000,
            delay_max_ms: 1000,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ScraperError::Config(msg)) if msg.contains("inverted")
        ));
    }

    #[test]
    fn zero_target_count_is_rejected() {
        let config = PipelineConfig {
            target_count: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let config = PipelineConfig {
            dedup_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_file_only_overrides_named_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "target_count = 25\nsources = [\"tradeindia\", \"indiamart\"]\nenabled_checks = [\"email\", \"name\"]"
        )
        .unwrap();

        let config = PipelineConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.target_count, 25);
        assert_eq!(
            config.sources,
            vec![SourceId::TradeIndia, SourceId::IndiaMart]
        );
        assert_eq!(config.enabled_checks.len(), 2);
        assert!(config.enabled_checks.contains(&CheckKind::Email));
        // untouched default
        assert_eq!(config.max_pages_per_source, 5);
    }

    #[test]
    fn unknown_source_name_is_a_config_error() {
        let err = parse_sources(&["alibaba".to_string()]).unwrap_err();
        assert!(matches!(err, ScraperError::Config(_)));
    }
}
