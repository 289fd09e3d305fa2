use crate::config::PipelineConfig;
use crate::error::{Result, ScraperError};
use crate::types::SourceId;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client wrapper enforcing the politeness contract shared by every
/// adapter: a randomized delay inside the configured range before each page
/// request, user-agent rotation across requests, and one bounded retry with
/// jittered backoff on transport errors and block responses (403/429).
///
/// Each worker gets its own `PoliteClient` so no connection state is shared
/// across sources; only the configuration (delay bounds, agent pool) is.
pub struct PoliteClient {
    client: reqwest::Client,
    user_agents: Vec<String>,
    next_agent: AtomicUsize,
    delay_min_ms: u64,
    delay_max_ms: u64,
}

impl PoliteClient {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            user_agents: config.user_agents.clone(),
            next_agent: AtomicUsize::new(0),
            delay_min_ms: config.delay_min_ms,
            delay_max_ms: config.delay_max_ms,
        })
    }

    /// Round-robin over the configured agent pool.
    fn next_user_agent(&self) -> &str {
        let idx = self.next_agent.fetch_add(1, Ordering::Relaxed) % self.user_agents.len();
        &self.user_agents[idx]
    }

    fn politeness_delay(&self) -> Duration {
        if self.delay_max_ms == 0 {
            return Duration::ZERO;
        }
        let ms = rand::thread_rng().gen_range(self.delay_min_ms..=self.delay_max_ms);
        Duration::from_millis(ms)
    }

    /// Fetch one listing page. Applies the politeness delay first, then up to
    /// two attempts; a second attempt waits an extra 1-3s the way blocked
    /// crawlers back off.
    pub async fn get_page(&self, source: SourceId, page: u32, url: &str) -> Result<String> {
        tokio::time::sleep(self.politeness_delay()).await;

        let mut last_cause = String::new();
        for attempt in 0..2 {
            if attempt > 0 {
                let backoff = rand::thread_rng().gen_range(1000..=3000);
                debug!(%source, page, backoff_ms = backoff, "retrying page fetch");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let response = self
                .client
                .get(url)
                .header("User-Agent", self.next_user_agent())
                .header(
                    "Accept",
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                )
                .header("Accept-Language", "en-US,en;q=0.9")
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp.text().await.map_err(|e| ScraperError::Fetch {
                            platform: source.to_string(),
                            page,
                            cause: e.to_string(),
                        })?);
                    }
                    if status.as_u16() == 403 || status.as_u16() == 429 {
                        warn!(%source, page, status = status.as_u16(), "rate limited or blocked");
                        last_cause = format!("blocked with HTTP {}", status.as_u16());
                        continue;
                    }
                    // Other HTTP errors are not worth a retry
                    return Err(ScraperError::Fetch {
                        platform: source.to_string(),
                        page,
                        cause: format!("HTTP {}", status.as_u16()),
                    });
                }
                Err(e) => {
                    last_cause = e.to_string();
                    continue;
                }
            }
        }

        Err(ScraperError::Fetch {
            platform: source.to_string(),
            page,
            cause: last_cause,
        })
    }
}
