use crate::config::PipelineConfig;
use crate::dedup::Deduplicator;
use crate::error::{Result, ScraperError};
use crate::fetch::PoliteClient;
use crate::normalize;
use crate::types::{
    CheckStatus, ProgressEvent, RunSummary, SourceAdapter, SourceId, ValidatedRecord,
};
use crate::validate::Validator;
use metrics::{counter, histogram};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// Everything one run produces: the unique validated records in acceptance
/// order plus the aggregate counters.
#[derive(Debug)]
pub struct RunOutput {
    pub records: Vec<ValidatedRecord>,
    pub summary: RunSummary,
}

/// One fully processed page travelling from a source worker to the dedup
/// consumer.
struct PageOutcome {
    source: SourceId,
    page: u32,
    raw_count: usize,
    incomplete: usize,
    invalid: usize,
    unverifiable: usize,
    validated: Vec<ValidatedRecord>,
}

/// Drives the configured adapters under a bounded worker pool and funnels
/// their records through normalize -> validate -> dedup, emitting a progress
/// event per processed page.
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    validator: Arc<Validator>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let validator = Arc::new(Validator::new(&config)?);
        Ok(Self {
            config: Arc::new(config),
            validator,
        })
    }

    /// Injectable validator for tests and embedders.
    pub fn with_validator(config: PipelineConfig, validator: Validator) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            validator: Arc::new(validator),
        })
    }

    /// Run to completion: until the target count of unique validated records
    /// is reached, every source is exhausted, or `cancel` fires. Fails only
    /// when every source dies on its first page.
    #[instrument(skip_all, fields(target = self.config.target_count))]
    pub async fn run(
        &self,
        adapters: Vec<Box<dyn SourceAdapter>>,
        cancel: CancellationToken,
        progress: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Result<RunOutput> {
        let started = Instant::now();
        let stop = cancel.child_token();
        let accepted_count = Arc::new(AtomicUsize::new(0));
        let workers = Arc::new(Semaphore::new(self.config.worker_limit));
        let (tx, mut rx) = mpsc::unbounded_channel::<PageOutcome>();

        info!(
            sources = adapters.len(),
            search_term = %self.config.search_term,
            "starting acquisition run"
        );
        counter!("buyerscout_runs_total").increment(1);

        let mut handles = Vec::new();
        for adapter in adapters {
            let config = Arc::clone(&self.config);
            let validator = Arc::clone(&self.validator);
            let workers = Arc::clone(&workers);
            let accepted_count = Arc::clone(&accepted_count);
            let stop = stop.clone();
            let tx = tx.clone();

            handles.push(tokio::spawn(async move {
                source_worker(adapter, config, validator, workers, accepted_count, stop, tx)
                    .await
            }));
        }
        // Consumer sees channel closure once every worker is done
        drop(tx);

        // Single-writer dedup: all duplicate decisions happen on this task so
        // two near-duplicates produced concurrently cannot both be accepted.
        let mut dedup = Deduplicator::new(self.config.dedup_threshold);
        let mut records: Vec<ValidatedRecord> = Vec::new();
        let mut summary = RunSummary::default();
        let mut pages_per_source: std::collections::HashMap<SourceId, u32> =
            std::collections::HashMap::new();

        while let Some(outcome) = rx.recv().await {
            summary.pages_fetched += 1;
            summary.total_fetched += outcome.raw_count;
            summary.total_incomplete_dropped += outcome.incomplete;
            summary.total_invalid_dropped += outcome.invalid;
            summary.total_unverifiable_dropped += outcome.unverifiable;

            for record in outcome.validated {
                if records.len() >= self.config.target_count {
                    break;
                }
                if dedup.accept(&record) {
                    records.push(record);
                }
            }
            summary.total_duplicates_dropped = dedup.dropped_count();
            summary.total_validated = records.len();
            accepted_count.store(records.len(), Ordering::SeqCst);

            let pages = pages_per_source.entry(outcome.source).or_insert(0);
            *pages += 1;

            let event = ProgressEvent {
                source: outcome.source,
                pages_fetched: *pages,
                records_fetched: summary.total_fetched,
                records_validated: records.len(),
                records_remaining: self.config.target_count.saturating_sub(records.len()),
            };
            let _ = progress.send(event);

            counter!("buyerscout_pages_processed_total", "source" => outcome.source.as_str())
                .increment(1);
            histogram!("buyerscout_records_per_page", "source" => outcome.source.as_str())
                .record(outcome.raw_count as f64);

            if records.len() >= self.config.target_count {
                info!(
                    validated = records.len(),
                    last_page = outcome.page,
                    "target count reached, stopping sources"
                );
                stop.cancel();
            }
        }

        // Workers are done; collect first-page verdicts for the fatal case
        let mut any_first_page_ok = false;
        let mut any_attempted = false;
        let mut failures: u32 = 0;
        for handle in handles {
            match handle.await {
                Ok(report) => {
                    any_attempted |= report.attempted;
                    any_first_page_ok |= report.first_page_ok;
                    failures += report.page_failures;
                }
                Err(e) => {
                    error!(error = %e, "source worker panicked");
                    failures += 1;
                }
            }
        }
        summary.page_failures = failures;
        summary.elapsed_ms = started.elapsed().as_millis() as u64;

        if any_attempted && !any_first_page_ok {
            error!("every configured source failed on its first page");
            return Err(ScraperError::NoSourceAvailable);
        }

        counter!("buyerscout_records_validated_total").increment(records.len() as u64);
        histogram!("buyerscout_run_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        info!(
            validated = summary.total_validated,
            fetched = summary.total_fetched,
            duplicates = summary.total_duplicates_dropped,
            invalid = summary.total_invalid_dropped,
            elapsed_ms = summary.elapsed_ms,
            "run complete"
        );

        Ok(RunOutput { records, summary })
    }
}

/// What a source worker reports back after its pagination ends.
struct WorkerReport {
    /// False until page 1 was actually tried; a run cancelled before any
    /// fetch is not the all-sources-dead case
    attempted: bool,
    first_page_ok: bool,
    page_failures: u32,
}

/// One worker: walks a single source's pages in ascending order, normalizing
/// and validating each page before handing it to the dedup consumer. Holds
/// its own HTTP client; only configuration is shared.
async fn source_worker(
    adapter: Box<dyn SourceAdapter>,
    config: Arc<PipelineConfig>,
    validator: Arc<Validator>,
    workers: Arc<Semaphore>,
    accepted_count: Arc<AtomicUsize>,
    stop: CancellationToken,
    tx: mpsc::UnboundedSender<PageOutcome>,
) -> WorkerReport {
    let source = adapter.source_id();
    let mut report = WorkerReport {
        attempted: false,
        first_page_ok: false,
        page_failures: 0,
    };

    let client = match PoliteClient::new(&config) {
        Ok(c) => c,
        Err(e) => {
            error!(%source, error = %e, "could not build HTTP client");
            report.page_failures = 1;
            return report;
        }
    };

    let mut raw_total = 0usize;
    for page in 1..=config.max_pages_per_source {
        if stop.is_cancelled() {
            info!(%source, page, "stop requested, ending pagination");
            break;
        }
        if accepted_count.load(Ordering::SeqCst) >= config.target_count {
            break;
        }
        // Enough raw material already fetched from this source
        if raw_total >= config.target_count {
            info!(%source, raw_total, "per-source raw cap reached");
            break;
        }

        // Bound concurrent page processing across all sources
        let permit = match workers.acquire().await {
            Ok(p) => p,
            Err(_) => break,
        };

        let t_page = Instant::now();
        report.attempted = true;
        let batch = match adapter.fetch_batch(page, &client).await {
            Ok(batch) => batch,
            Err(e) => {
                // A failed fetch ends this source's pagination outright; a
                // run never keeps records from a source that already errored
                warn!(%source, page, error = %e, "page failed, ending pagination");
                counter!("buyerscout_page_failures_total", "source" => source.as_str())
                    .increment(1);
                report.page_failures += 1;
                drop(permit);
                break;
            }
        };
        if page == 1 {
            report.first_page_ok = true;
        }

        let mut outcome = PageOutcome {
            source,
            page,
            raw_count: batch.records.len(),
            incomplete: 0,
            invalid: 0,
            unverifiable: 0,
            validated: Vec::new(),
        };
        raw_total += batch.records.len();

        for raw in &batch.records {
            let normalized = match normalize::normalize_record(raw, &config.default_country_code) {
                Ok(n) => n,
                Err(e) => {
                    info!(%source, page, error = %e, "dropping incomplete record");
                    outcome.incomplete += 1;
                    continue;
                }
            };

            let validated = validator.validate(normalized).await;
            match validated.verdict.overall {
                CheckStatus::Valid => outcome.validated.push(validated),
                CheckStatus::Invalid => outcome.invalid += 1,
                CheckStatus::Unverifiable => outcome.unverifiable += 1,
            }
        }
        drop(permit);

        histogram!("buyerscout_page_duration_seconds", "source" => source.as_str())
            .record(t_page.elapsed().as_secs_f64());

        let has_more = batch.has_more;
        if tx.send(outcome).is_err() {
            break;
        }
        if !has_more {
            info!(%source, page, "pagination exhausted");
            break;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as ScraperResult;
    use crate::types::{CheckKind, RawRecord};
    use crate::validate::domain::{LivenessProbe, ProbeOutcome};
    use crate::validate::email::{MxLookup, MxOutcome};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::time::Duration;

    /// Adapter fabricating an endless stream of distinct listings, with one
    /// optional scripted page failure.
    struct EndlessSource {
        source: SourceId,
        per_page: usize,
        fail_page: Option<u32>,
    }

    #[async_trait]
    impl SourceAdapter for EndlessSource {
        fn source_id(&self) -> SourceId {
            self.source
        }

        async fn fetch_page(&self, page: u32, _client: &PoliteClient) -> ScraperResult<String> {
            if self.fail_page == Some(page) {
                return Err(ScraperError::Fetch {
                    platform: self.source.to_string(),
                    page,
                    cause: "connection refused".into(),
                });
            }
            Ok(format!("page-{page}"))
        }

        fn parse_page(&self, html: &str, _page: u32) -> ScraperResult<Vec<RawRecord>> {
            let page: u32 = html.trim_start_matches("page-").parse().unwrap();
            Ok((0..self.per_page)
                .map(|i| {
                    let n = u64::from(page) * 1000 + i as u64;
                    RawRecord {
                        source: self.source,
                        name: format!("{} Trading House {}", self.source, n),
                        phone: format!("+91{:010}", 9_000_000_000u64 + n),
                        email: String::new(),
                        address: "Erode, Tamil Nadu".into(),
                        website: String::new(),
                        description: "turmeric".into(),
                        listing_url: format!("https://example.test/page/{page}"),
                        fetched_at: Utc::now(),
                    }
                })
                .collect())
        }
    }

    struct NoMx;
    #[async_trait]
    impl MxLookup for NoMx {
        async fn lookup_mx(&self, _domain: &str) -> MxOutcome {
            MxOutcome::NoRecords
        }
    }

    struct DeadProbe;
    #[async_trait]
    impl LivenessProbe for DeadProbe {
        async fn probe(&self, _url: &str) -> ProbeOutcome {
            ProbeOutcome::Refused
        }
    }

    fn offline_validator(checks: &[CheckKind]) -> Validator {
        Validator::with_backends(
            checks.iter().copied().collect(),
            Duration::from_millis(200),
            Arc::new(NoMx),
            Arc::new(DeadProbe),
        )
    }

    fn fast_config(target: usize) -> PipelineConfig {
        PipelineConfig {
            target_count: target,
            delay_min_ms: 0,
            delay_max_ms: 0,
            max_pages_per_source: 50,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn run_stops_at_target_even_with_endless_sources() {
        let pipeline = Pipeline::with_validator(
            fast_config(50),
            offline_validator(&[CheckKind::Phone, CheckKind::Name]),
        )
        .unwrap();

        let adapters: Vec<Box<dyn SourceAdapter>> = vec![
            Box::new(EndlessSource {
                source: SourceId::TradeIndia,
                per_page: 8,
                fail_page: None,
            }),
            Box::new(EndlessSource {
                source: SourceId::IndiaMart,
                per_page: 8,
                fail_page: None,
            }),
        ];

        let (tx, mut rx) = mpsc::unbounded_channel();
        let output = pipeline
            .run(adapters, CancellationToken::new(), tx)
            .await
            .unwrap();

        assert_eq!(output.records.len(), 50);
        assert_eq!(output.summary.total_validated, 50);

        // Progress events were emitted and the final one reports zero remaining
        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert_eq!(last.unwrap().records_remaining, 0);
    }

    #[tokio::test]
    async fn emitted_records_are_pairwise_unique() {
        let pipeline = Pipeline::with_validator(
            fast_config(30),
            offline_validator(&[CheckKind::Phone, CheckKind::Name]),
        )
        .unwrap();

        let adapters: Vec<Box<dyn SourceAdapter>> = vec![Box::new(EndlessSource {
            source: SourceId::TradeIndia,
            per_page: 10,
            fail_page: None,
        })];

        let (tx, _rx) = mpsc::unbounded_channel();
        let output = pipeline
            .run(adapters, CancellationToken::new(), tx)
            .await
            .unwrap();

        let mut phones: Vec<_> = output
            .records
            .iter()
            .map(|r| r.record.phone.as_parsed().unwrap().to_string())
            .collect();
        let before = phones.len();
        phones.sort();
        phones.dedup();
        assert_eq!(phones.len(), before);
    }

    #[tokio::test]
    async fn all_sources_failing_first_page_is_fatal() {
        let pipeline = Pipeline::with_validator(
            PipelineConfig {
                max_pages_per_source: 1,
                ..fast_config(10)
            },
            offline_validator(&[CheckKind::Name]),
        )
        .unwrap();

        let adapters: Vec<Box<dyn SourceAdapter>> = vec![
            Box::new(EndlessSource {
                source: SourceId::TradeIndia,
                per_page: 5,
                fail_page: Some(1),
            }),
            Box::new(EndlessSource {
                source: SourceId::IndiaMart,
                per_page: 5,
                fail_page: Some(1),
            }),
        ];

        let (tx, _rx) = mpsc::unbounded_channel();
        let err = pipeline
            .run(adapters, CancellationToken::new(), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, ScraperError::NoSourceAvailable));
    }

    #[tokio::test]
    async fn one_dead_source_does_not_abort_the_run() {
        let pipeline = Pipeline::with_validator(
            fast_config(20),
            offline_validator(&[CheckKind::Phone, CheckKind::Name]),
        )
        .unwrap();

        let adapters: Vec<Box<dyn SourceAdapter>> = vec![
            Box::new(EndlessSource {
                source: SourceId::TradeIndia,
                per_page: 10,
                fail_page: Some(1),
            }),
            Box::new(EndlessSource {
                source: SourceId::IndiaMart,
                per_page: 10,
                fail_page: None,
            }),
        ];

        let (tx, _rx) = mpsc::unbounded_channel();
        let output = pipeline
            .run(adapters, CancellationToken::new(), tx)
            .await
            .unwrap();
        assert_eq!(output.records.len(), 20);
        assert!(output.summary.page_failures >= 1);
    }

    #[tokio::test]
    async fn page_failure_ends_that_sources_pagination() {
        let pipeline = Pipeline::with_validator(
            fast_config(100),
            offline_validator(&[CheckKind::Phone, CheckKind::Name]),
        )
        .unwrap();

        // Page 1 succeeds, page 2 errors; pages 3+ would succeed but must
        // never be fetched
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![Box::new(EndlessSource {
            source: SourceId::TradeIndia,
            per_page: 5,
            fail_page: Some(2),
        })];

        let (tx, _rx) = mpsc::unbounded_channel();
        let output = pipeline
            .run(adapters, CancellationToken::new(), tx)
            .await
            .unwrap();

        assert_eq!(output.records.len(), 5);
        assert_eq!(output.summary.pages_fetched, 1);
        assert_eq!(output.summary.page_failures, 1);
    }

    #[tokio::test]
    async fn first_page_failure_yields_no_records_from_later_pages() {
        let pipeline = Pipeline::with_validator(
            fast_config(10),
            offline_validator(&[CheckKind::Phone, CheckKind::Name]),
        )
        .unwrap();

        // The source has perfectly good listings from page 2 on, but a dead
        // first page ends its pagination, so the run is the fatal empty case
        let adapters: Vec<Box<dyn SourceAdapter>> = vec![Box::new(EndlessSource {
            source: SourceId::TradeIndia,
            per_page: 5,
            fail_page: Some(1),
        })];

        let (tx, _rx) = mpsc::unbounded_channel();
        let err = pipeline
            .run(adapters, CancellationToken::new(), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, ScraperError::NoSourceAvailable));
    }

    #[tokio::test]
    async fn invalid_records_never_reach_the_output() {
        // Email check enabled against a resolver that always says no MX:
        // records carrying an email must all be dropped
        let pipeline = Pipeline::with_validator(
            PipelineConfig {
                max_pages_per_source: 2,
                ..fast_config(10)
            },
            offline_validator(&[CheckKind::Email, CheckKind::Name]),
        )
        .unwrap();

        struct EmailSource;
        #[async_trait]
        impl SourceAdapter for EmailSource {
            fn source_id(&self) -> SourceId {
                SourceId::TradeIndia
            }
            async fn fetch_page(&self, _page: u32, _c: &PoliteClient) -> ScraperResult<String> {
                Ok(String::new())
            }
            fn parse_page(&self, _html: &str, page: u32) -> ScraperResult<Vec<RawRecord>> {
                Ok(vec![RawRecord {
                    source: SourceId::TradeIndia,
                    name: format!("Mx Less Trading {page}"),
                    phone: String::new(),
                    email: format!("info{page}@dead-domain.test"),
                    address: String::new(),
                    website: String::new(),
                    description: String::new(),
                    listing_url: String::new(),
                    fetched_at: Utc::now(),
                }])
            }
        }

        let (tx, _rx) = mpsc::unbounded_channel();
        let output = pipeline
            .run(vec![Box::new(EmailSource)], CancellationToken::new(), tx)
            .await
            .unwrap();
        assert!(output.records.is_empty());
        assert_eq!(output.summary.total_invalid_dropped, 2);
    }

    #[tokio::test]
    async fn cancellation_stops_new_pages() {
        let pipeline = Pipeline::with_validator(
            fast_config(10_000),
            offline_validator(&[CheckKind::Phone, CheckKind::Name]),
        )
        .unwrap();

        let adapters: Vec<Box<dyn SourceAdapter>> = vec![Box::new(EndlessSource {
            source: SourceId::TradeIndia,
            per_page: 5,
            fail_page: None,
        })];

        let cancel = CancellationToken::new();
        cancel.cancel();
        let (tx, _rx) = mpsc::unbounded_channel();
        let output = pipeline.run(adapters, cancel, tx).await.unwrap();
        // Cancelled before the first page: nothing fetched, and this is not
        // the fatal all-sources-failed case
        assert!(output.records.is_empty());
        assert_eq!(output.summary.pages_fetched, 0);
    }
}
