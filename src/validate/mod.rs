pub mod domain;
pub mod email;
pub mod name;
pub mod phone;

use crate::config::PipelineConfig;
use crate::error::{Result, ScraperError};
use crate::types::{
    CheckKind, CheckStatus, Field, NormalizedRecord, ValidatedRecord, ValidationVerdict,
};
use async_trait::async_trait;
use domain::{LivenessProbe, ProbeOutcome};
use email::{MxLookup, MxOutcome};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use trust_dns_resolver::error::ResolveErrorKind;
use trust_dns_resolver::TokioAsyncResolver;

/// MX lookups through the system resolver.
pub struct ResolverMx {
    resolver: TokioAsyncResolver,
}

impl ResolverMx {
    pub fn new() -> Self {
        let resolver = TokioAsyncResolver::tokio(
            trust_dns_resolver::config::ResolverConfig::default(),
            trust_dns_resolver::config::ResolverOpts::default(),
        );
        Self { resolver }
    }
}

#[async_trait]
impl MxLookup for ResolverMx {
    async fn lookup_mx(&self, domain: &str) -> MxOutcome {
        match self.resolver.mx_lookup(domain).await {
            Ok(lookup) => {
                if lookup.iter().next().is_some() {
                    MxOutcome::HasRecords
                } else {
                    MxOutcome::NoRecords
                }
            }
            Err(e) => match e.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => MxOutcome::NoRecords,
                _ => {
                    debug!(domain, error = %e, "MX lookup failed");
                    MxOutcome::LookupFailed
                }
            },
        }
    }
}

/// Website liveness probes through a dedicated HTTP client with a bounded
/// redirect policy.
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LivenessProbe for HttpProbe {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        match self.client.get(url).send().await {
            Ok(resp) => ProbeOutcome::Responded(resp.status().as_u16()),
            Err(e) if e.is_timeout() => ProbeOutcome::Timeout,
            Err(e) if e.is_redirect() => ProbeOutcome::RedirectLoop,
            Err(_) => ProbeOutcome::Refused,
        }
    }
}

/// Runs the enabled authenticity checks for one record. Network checks are
/// bounded by the configured per-check timeout and run concurrently with each
/// other; all complete before the overall verdict is computed.
pub struct Validator {
    enabled: HashSet<CheckKind>,
    check_timeout: Duration,
    mx: Arc<dyn MxLookup>,
    probe: Arc<dyn LivenessProbe>,
}

impl Validator {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let check_timeout = Duration::from_millis(config.check_timeout_ms);
        Ok(Self {
            enabled: config.enabled_checks.clone(),
            check_timeout,
            mx: Arc::new(ResolverMx::new()),
            probe: Arc::new(HttpProbe::new(check_timeout)?),
        })
    }

    /// Injectable backends for tests and for callers that already hold a
    /// resolver.
    pub fn with_backends(
        enabled: HashSet<CheckKind>,
        check_timeout: Duration,
        mx: Arc<dyn MxLookup>,
        probe: Arc<dyn LivenessProbe>,
    ) -> Self {
        Self {
            enabled,
            check_timeout,
            mx,
            probe,
        }
    }

    fn is_enabled(&self, kind: CheckKind) -> bool {
        self.enabled.contains(&kind)
    }

    /// A check enabled for a field the record simply does not have is skipped;
    /// a field that failed to canonicalize fails the check.
    fn field_gate(field: &Field) -> Option<std::result::Result<&str, CheckStatus>> {
        match field {
            Field::Parsed(v) => Some(Ok(v)),
            Field::Unparseable => Some(Err(CheckStatus::Invalid)),
            Field::Empty => None,
        }
    }

    async fn email_check(&self, record: &NormalizedRecord) -> Option<CheckStatus> {
        if !self.is_enabled(CheckKind::Email) {
            return None;
        }
        match Self::field_gate(&record.email)? {
            Err(status) => Some(status),
            Ok(addr) => {
                let fut = email::check_email(addr, self.mx.as_ref());
                match tokio::time::timeout(self.check_timeout, fut).await {
                    Ok(status) => Some(status),
                    Err(_) => {
                        let err = ScraperError::ValidationTimeout {
                            check: CheckKind::Email.as_str().to_string(),
                            timeout_ms: self.check_timeout.as_millis() as u64,
                        };
                        warn!(email = addr, error = %err, "email check timed out");
                        Some(CheckStatus::Unverifiable)
                    }
                }
            }
        }
    }

    async fn domain_check(&self, record: &NormalizedRecord) -> Option<CheckStatus> {
        if !self.is_enabled(CheckKind::Domain) {
            return None;
        }
        match Self::field_gate(&record.website)? {
            Err(status) => Some(status),
            Ok(url) => {
                // Probe budget covers the retry inside check_domain
                let fut = domain::check_domain(url, self.probe.as_ref());
                match tokio::time::timeout(self.check_timeout * 2, fut).await {
                    Ok(status) => Some(status),
                    Err(_) => {
                        let err = ScraperError::ValidationTimeout {
                            check: CheckKind::Domain.as_str().to_string(),
                            timeout_ms: (self.check_timeout * 2).as_millis() as u64,
                        };
                        warn!(url, error = %err, "domain check timed out");
                        Some(CheckStatus::Unverifiable)
                    }
                }
            }
        }
    }

    fn phone_check(&self, record: &NormalizedRecord) -> Option<CheckStatus> {
        if !self.is_enabled(CheckKind::Phone) {
            return None;
        }
        match Self::field_gate(&record.phone)? {
            Err(status) => Some(status),
            Ok(number) => Some(phone::check_phone(number)),
        }
    }

    fn name_check(&self, record: &NormalizedRecord) -> Option<CheckStatus> {
        if !self.is_enabled(CheckKind::Name) {
            return None;
        }
        Some(name::check_name(&record.company_name))
    }

    /// Validate one record. The two network checks run concurrently; phone
    /// and name checks are pure and computed inline.
    pub async fn validate(&self, record: NormalizedRecord) -> ValidatedRecord {
        let (email_status, domain_status) =
            tokio::join!(self.email_check(&record), self.domain_check(&record));
        let phone_status = self.phone_check(&record);
        let name_status = self.name_check(&record);

        let statuses = [email_status, phone_status, domain_status, name_status];
        let overall = ValidationVerdict::combine(&statuses);
        let confidence = ValidationVerdict::confidence(&statuses);

        debug!(
            company = %record.company_name,
            ?email_status,
            ?phone_status,
            ?domain_status,
            ?name_status,
            ?overall,
            confidence,
            "validation verdict"
        );

        ValidatedRecord {
            record,
            verdict: ValidationVerdict {
                email: email_status,
                phone: phone_status,
                domain: domain_status,
                name: name_status,
                overall,
                confidence,
            },
        }
    }
}
