use dcl_compliance::ComplianceError;
use dcl_types::{CreditMonth, RepresentativeId};

use crate::records::{ApprovalState, CessionId, UsageId};

/// Errors produced by ledger operations.
///
/// Rule failures are not errors: they come back as rejected outcomes carrying
/// every violated rule. These variants cover missing entities, concurrency
/// and storage failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("representative not found: {0}")]
    RepresentativeNotFound(RepresentativeId),

    #[error("usage record not found: {0}")]
    UsageNotFound(UsageId),

    #[error("cession not found: {0}")]
    CessionNotFound(CessionId),

    #[error("invalid representative: {0}")]
    InvalidRepresentative(String),

    #[error("credit period {month} of {representative} is not open")]
    PeriodNotOpen {
        representative: RepresentativeId,
        month: CreditMonth,
    },

    #[error("credit period {month} is more than {limit} month(s) ahead of the current month")]
    BeyondHorizon { month: CreditMonth, limit: u32 },

    #[error("concurrent modification of {0}; re-read the balance and resubmit")]
    Conflict(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("cannot move usage approval from {from} to {to}")]
    InvalidTransition {
        from: ApprovalState,
        to: ApprovalState,
    },

    #[error("duplicate record id: {0}")]
    DuplicateRecord(String),

    #[error("compliance error: {0}")]
    Compliance(#[from] ComplianceError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    /// Only stale-snapshot conflicts are worth retrying as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
