//! Raw Kickbox response → canonical `VerificationResult`.
//!
//! Normalization is total: every missing or malformed field degrades to a
//! fixed default. A response carrying a truthy `error` field must be rejected
//! by the caller before it gets here.

use chrono::{DateTime, Utc};

use crate::coercion::{coerce_bool, coerce_f64, coerce_string};
use crate::models::{RawVerificationResponse, VerificationResult};

/// Reason shown by display contexts when none was returned.
pub const DISPLAY_REASON_DEFAULT: &str = "N/A";

/// Normalizes a raw response, stamping it with the current time.
pub fn normalize(raw: &RawVerificationResponse) -> VerificationResult {
    normalize_at(raw, Utc::now())
}

/// Normalizes a raw response with an explicit verification timestamp.
pub fn normalize_at(raw: &RawVerificationResponse, verified_at: DateTime<Utc>) -> VerificationResult {
    VerificationResult {
        result: coerce_string(raw.result.as_ref()).unwrap_or_default(),
        reason: coerce_string(raw.reason.as_ref()),
        disposable: coerce_bool(raw.disposable.as_ref()),
        accept_all: coerce_bool(raw.accept_all.as_ref()),
        role: coerce_bool(raw.role.as_ref()),
        free: coerce_bool(raw.free.as_ref()),
        success: coerce_bool(raw.success.as_ref()),
        sendex: coerce_f64(raw.sendex.as_ref()),
        did_you_mean: coerce_string(raw.did_you_mean.as_ref()),
        email_normalized: coerce_string(raw.email.as_ref()),
        verified_at,
    }
}

/// Reason as displayed: the raw code, or `"N/A"` when absent or empty.
pub fn display_reason(result: &VerificationResult) -> &str {
    result
        .reason
        .as_deref()
        .filter(|r| !r.is_empty())
        .unwrap_or(DISPLAY_REASON_DEFAULT)
}
