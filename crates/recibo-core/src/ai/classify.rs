//! Error-message classification at the AI collaborator boundary.
//!
//! Upstream error shapes are undocumented and vary between providers, so
//! classification falls back to substring matching on the raw message.
//! That fragility is confined to this module: if the provider changes its
//! error text, this is the only place to touch.

use crate::error::UpstreamError;

/// Message fragments indicating the current (key, model) strategy is
/// exhausted or missing and the client should rotate.
const QUOTA_FRAGMENTS: &[&str] = &["429", "quota", "limit", "404", "503"];

/// Transport/gRPC-style codes the outer retry loop treats as transient.
const TRANSIENT_CODES: &[&str] = &[
    "RESOURCE_EXHAUSTED",
    "UNAVAILABLE",
    "DEADLINE_EXCEEDED",
    "INTERNAL",
    "ECONNRESET",
    "ETIMEDOUT",
    "ENOTFOUND",
    "EAI_AGAIN",
];

/// HTTP statuses the outer retry loop treats as transient.
const TRANSIENT_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

/// Message fragments the outer retry loop treats as transient.
const TRANSIENT_FRAGMENTS: &[&str] = &[
    "timeout",
    "rate limit",
    "quota",
    "overloaded",
    "temporarily unavailable",
    "econnreset",
    "socket hang up",
];

/// Whether a raw upstream message signals a quota/availability failure
/// of the current strategy, i.e. the client should rotate key/model and
/// retry the same document.
pub fn is_quota_message(message: &str) -> bool {
    let lowered = message.to_lowercase();
    QUOTA_FRAGMENTS.iter().any(|f| lowered.contains(f))
}

/// Whether an unclassified upstream failure is worth another attempt of
/// the outer retry loop.
///
/// Independent of [`is_quota_message`]: rotation handles "this key/model
/// is exhausted", this handles "the network/service hiccuped". The two
/// compose.
pub fn is_transient_upstream(error: &UpstreamError) -> bool {
    if let Some(code) = &error.code {
        if TRANSIENT_CODES.iter().any(|c| code.eq_ignore_ascii_case(c)) {
            return true;
        }
    }

    if let Some(status) = error.status {
        if TRANSIENT_STATUSES.contains(&status) {
            return true;
        }
    }

    let lowered = error.message.to_lowercase();
    TRANSIENT_FRAGMENTS.iter().any(|f| lowered.contains(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_fragments_trigger_rotation() {
        assert!(is_quota_message("429 Too Many Requests"));
        assert!(is_quota_message("Quota exceeded for project"));
        assert!(is_quota_message("requests per day limit reached"));
        assert!(is_quota_message("model not found (404)"));
        assert!(is_quota_message("503 Service Unavailable"));
    }

    #[test]
    fn ordinary_failures_do_not_rotate() {
        assert!(!is_quota_message("connection refused"));
        assert!(!is_quota_message("invalid response body"));
    }

    #[test]
    fn transient_codes_are_retryable() {
        let err = UpstreamError::message("stream closed").with_code("ECONNRESET");
        assert!(is_transient_upstream(&err));
        let err = UpstreamError::message("backend").with_code("resource_exhausted");
        assert!(is_transient_upstream(&err));
    }

    #[test]
    fn transient_statuses_are_retryable() {
        for status in [429, 500, 502, 503, 504] {
            let err = UpstreamError::message("boom").with_status(status);
            assert!(is_transient_upstream(&err), "status {status}");
        }
        let err = UpstreamError::message("bad request").with_status(400);
        assert!(!is_transient_upstream(&err));
    }

    #[test]
    fn transient_message_fragments_are_retryable() {
        assert!(is_transient_upstream(&UpstreamError::message(
            "socket hang up"
        )));
        assert!(is_transient_upstream(&UpstreamError::message(
            "model is overloaded, try later"
        )));
        assert!(!is_transient_upstream(&UpstreamError::message(
            "permission denied"
        )));
    }
}
