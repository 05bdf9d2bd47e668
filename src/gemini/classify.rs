//! Rejection-text classification.
//!
//! The service reports entitlement and safety refusals as prose, not
//! structured codes. The matching rules live here as plain data so they can
//! be extended (or replaced by structured codes) without touching the
//! request flow.

use crate::error::FailureKind;

/// Ordered substring rules, first match wins. Matched case-insensitively
/// against the concatenated rejection text.
const REJECTION_RULES: &[(&str, FailureKind)] = &[
    // The service answers "Requested entity was not found" when the key
    // lacks access to the model.
    ("requested entity was not found", FailureKind::EntitlementDenied),
    ("permission_denied", FailureKind::EntitlementDenied),
    ("prohibited_content", FailureKind::SafetyRejected),
    ("content policy", FailureKind::SafetyRejected),
    ("safety", FailureKind::SafetyRejected),
];

/// Classify a textual rejection from the service. Anything unmatched is
/// [`FailureKind::Unknown`].
pub fn classify_rejection(text: &str) -> FailureKind {
    let haystack = text.to_lowercase();
    for (needle, kind) in REJECTION_RULES {
        if haystack.contains(needle) {
            return *kind;
        }
    }
    FailureKind::Unknown
}
