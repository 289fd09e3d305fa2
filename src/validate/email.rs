use crate::types::CheckStatus;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use tracing::debug;

/// Throwaway mail providers; addresses on these domains are rejected.
static DISPOSABLE_DOMAINS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "10minutemail.com",
        "tempmail.org",
        "guerrillamail.com",
        "mailinator.com",
        "yopmail.com",
        "temp-mail.org",
        "throwaway.email",
        "maildrop.cc",
        "getnada.com",
        "tempail.com",
        "sharklasers.com",
        "grr.la",
        "fakeinbox.com",
        "spamgourmet.com",
        "dispostable.com",
        "mailnesia.com",
        "guerrillamailblock.com",
        "0-mail.com",
    ]
    .into_iter()
    .collect()
});

/// Result of an MX record lookup, separated from "the lookup itself failed"
/// so a resolver outage maps to Unverifiable instead of Invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MxOutcome {
    HasRecords,
    NoRecords,
    LookupFailed,
}

/// Seam over the DNS resolver so the email check is testable offline.
#[async_trait]
pub trait MxLookup: Send + Sync {
    async fn lookup_mx(&self, domain: &str) -> MxOutcome;
}

pub fn is_disposable(domain: &str) -> bool {
    DISPOSABLE_DOMAINS.contains(domain)
}

/// Full email authenticity check: syntax (already gated by normalization, but
/// re-verified), disposable-domain membership, and a live MX lookup.
pub async fn check_email(email: &str, mx: &dyn MxLookup) -> CheckStatus {
    let domain = match email.rsplit_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => domain,
        _ => return CheckStatus::Invalid,
    };

    if is_disposable(domain) {
        debug!(email, "disposable email domain");
        return CheckStatus::Invalid;
    }

    match mx.lookup_mx(domain).await {
        MxOutcome::HasRecords => CheckStatus::Valid,
        MxOutcome::NoRecords => CheckStatus::Invalid,
        MxOutcome::LookupFailed => CheckStatus::Unverifiable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedMx(MxOutcome);

    #[async_trait]
    impl MxLookup for FixedMx {
        async fn lookup_mx(&self, _domain: &str) -> MxOutcome {
            self.0
        }
    }

    #[tokio::test]
    async fn email_with_mx_records_is_valid() {
        let status = check_email("info@abctrading.com", &FixedMx(MxOutcome::HasRecords)).await;
        assert_eq!(status, CheckStatus::Valid);
    }

    #[tokio::test]
    async fn email_without_mx_records_is_invalid() {
        let status = check_email("john@example.com", &FixedMx(MxOutcome::NoRecords)).await;
        assert_eq!(status, CheckStatus::Invalid);
    }

    #[tokio::test]
    async fn lookup_failure_is_unverifiable_not_invalid() {
        let status = check_email("info@abctrading.com", &FixedMx(MxOutcome::LookupFailed)).await;
        assert_eq!(status, CheckStatus::Unverifiable);
    }

    #[tokio::test]
    async fn disposable_domain_is_invalid_without_lookup() {
        // MX says records exist, disposable membership still wins
        let status = check_email("user@mailinator.com", &FixedMx(MxOutcome::HasRecords)).await;
        assert_eq!(status, CheckStatus::Invalid);
    }

    #[tokio::test]
    async fn malformed_address_is_invalid() {
        let status = check_email("@nobody", &FixedMx(MxOutcome::HasRecords)).await;
        assert_eq!(status, CheckStatus::Invalid);
    }
}
