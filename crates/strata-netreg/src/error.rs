use thiserror::Error;

use crate::tech::Domain;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum NetRegError {
    #[error("invalid registration domain code {0}")]
    InvalidArgument(i32),
    #[error("unrecognized {shape} payload for {domain} registration")]
    NormalizationFailed { domain: Domain, shape: &'static str },
    #[error("carrier config unavailable for subscription {sub_id}: {reason}")]
    ConfigUnavailable { sub_id: i32, reason: String },
    #[error("malformed RAT family group {group:?} at entry {entry:?}: {reason}")]
    MalformedFamilyGroup {
        group: String,
        entry: String,
        reason: FamilyFault,
    },
    #[error("network service for slot {0} is closed")]
    SessionClosed(usize),
}

/// Why a family group entry was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FamilyFault {
    #[error("not an integer")]
    Unparseable,
    #[error("not a known radio technology code")]
    UnknownTechnology,
    #[error("already listed in another family")]
    Duplicate,
}

/// Result code delivered to request callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResultCode {
    #[error("request failed")]
    Failed,
    #[error("invalid argument")]
    InvalidArgument,
}

/// Failure reported by the radio channel for one request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("radio request failed: {0}")]
pub struct RadioError(pub String);
