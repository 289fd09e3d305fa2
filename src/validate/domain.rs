use crate::types::CheckStatus;
use async_trait::async_trait;
use tracing::debug;

/// What a liveness probe observed, reduced to the cases the verdict cares
/// about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Any non-5xx HTTP response counts as a live site
    Responded(u16),
    Timeout,
    Refused,
    /// Redirect chain never settled
    RedirectLoop,
}

/// Seam over the HTTP client so the domain check is testable offline.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// Website reachability check. One retry on timeout; connection refusal or a
/// second timeout is Invalid, an unsettled redirect chain is Unverifiable.
pub async fn check_domain(url: &str, probe: &dyn LivenessProbe) -> CheckStatus {
    let mut outcome = probe.probe(url).await;
    if outcome == ProbeOutcome::Timeout {
        debug!(url, "liveness probe timed out, retrying once");
        outcome = probe.probe(url).await;
    }

    match outcome {
        ProbeOutcome::Responded(status) if status < 500 => CheckStatus::Valid,
        ProbeOutcome::Responded(_) => CheckStatus::Invalid,
        ProbeOutcome::Timeout | ProbeOutcome::Refused => CheckStatus::Invalid,
        ProbeOutcome::RedirectLoop => CheckStatus::Unverifiable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Script(Vec<ProbeOutcome>, AtomicUsize);

    impl Script {
        fn new(outcomes: Vec<ProbeOutcome>) -> Self {
            Self(outcomes, AtomicUsize::new(0))
        }
    }

    #[async_trait]
    impl LivenessProbe for Script {
        async fn probe(&self, _url: &str) -> ProbeOutcome {
            let i = self.1.fetch_add(1, Ordering::SeqCst);
            self.0[i.min(self.0.len() - 1)]
        }
    }

    #[tokio::test]
    async fn ok_response_is_valid() {
        let probe = Script::new(vec![ProbeOutcome::Responded(200)]);
        assert_eq!(
            check_domain("https://spicehub.com", &probe).await,
            CheckStatus::Valid
        );
    }

    #[tokio::test]
    async fn client_error_still_counts_as_live() {
        let probe = Script::new(vec![ProbeOutcome::Responded(404)]);
        assert_eq!(
            check_domain("https://spicehub.com", &probe).await,
            CheckStatus::Valid
        );
    }

    #[tokio::test]
    async fn server_error_is_invalid() {
        let probe = Script::new(vec![ProbeOutcome::Responded(503)]);
        assert_eq!(
            check_domain("https://spicehub.com", &probe).await,
            CheckStatus::Invalid
        );
    }

    #[tokio::test]
    async fn timeout_then_success_is_valid() {
        let probe = Script::new(vec![ProbeOutcome::Timeout, ProbeOutcome::Responded(200)]);
        assert_eq!(
            check_domain("https://spicehub.com", &probe).await,
            CheckStatus::Valid
        );
        assert_eq!(probe.1.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn persistent_timeout_is_invalid() {
        let probe = Script::new(vec![ProbeOutcome::Timeout, ProbeOutcome::Timeout]);
        assert_eq!(
            check_domain("https://spicehub.com", &probe).await,
            CheckStatus::Invalid
        );
    }

    #[tokio::test]
    async fn refused_connection_is_invalid_without_retry() {
        let probe = Script::new(vec![ProbeOutcome::Refused]);
        assert_eq!(
            check_domain("https://spicehub.com", &probe).await,
            CheckStatus::Invalid
        );
        assert_eq!(probe.1.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn redirect_loop_is_unverifiable() {
        let probe = Script::new(vec![ProbeOutcome::RedirectLoop]);
        assert_eq!(
            check_domain("https://spicehub.com", &probe).await,
            CheckStatus::Unverifiable
        );
    }
}
