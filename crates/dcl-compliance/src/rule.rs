use chrono::NaiveDate;
use dcl_types::{Hours, RepresentativeId};
use serde::{Deserialize, Serialize};

use crate::codes::{Check, Finding, Severity};
use crate::config::PolicyConfig;
use crate::error::ComplianceError;

// ---------------------------------------------------------------------------
// Rule inputs
// ---------------------------------------------------------------------------

/// Everything the cession rules need, read from one consistent snapshot.
#[derive(Clone, Debug)]
pub struct CessionContext {
    pub donor: RepresentativeId,
    pub donor_mandate_active: bool,
    /// Remaining base plus, when policy allows, remaining carried-over hours.
    pub donor_transferable: Hours,
    pub recipient: RecipientSnapshot,
    pub hours: Hours,
    pub effective_date: NaiveDate,
    pub today: NaiveDate,
    pub reason: String,
}

/// The receiving side of a cession as seen at validation time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecipientSnapshot {
    Internal {
        id: RepresentativeId,
        balance: Hours,
        base_credit: Hours,
        mandate_active: bool,
    },
    External {
        name: String,
    },
}

impl RecipientSnapshot {
    pub fn is_external(&self) -> bool {
        matches!(self, Self::External { .. })
    }
}

/// Inputs of the usage-declaration rules.
#[derive(Clone, Debug)]
pub struct UsageContext {
    pub representative: RepresentativeId,
    pub mandate_active: bool,
    pub hours: Hours,
    pub date: NaiveDate,
    /// Part of the request no source can cover.
    pub projected_overage: Hours,
}

// ---------------------------------------------------------------------------
// RuleOutcome
// ---------------------------------------------------------------------------

/// The outcome of a single rule evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleOutcome {
    Pass,
    /// Hard failure; the request must not be committed.
    Violation(Finding),
    /// Soft failure; the caller may override and commit anyway.
    Warning(Finding),
}

impl RuleOutcome {
    /// Map a predicate result onto an outcome, using the code's severity.
    pub fn from_check(check: Check, message: impl FnOnce() -> String) -> Self {
        match check.code {
            Some(code) if !check.passed => {
                let finding = Finding::new(code, message());
                match code.severity() {
                    Severity::Violation => Self::Violation(finding),
                    Severity::Warning => Self::Warning(finding),
                }
            }
            _ => Self::Pass,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

// ---------------------------------------------------------------------------
// ComplianceRule trait
// ---------------------------------------------------------------------------

/// A single check run by a [`crate::ComplianceGate`].
///
/// Rules are object-safe and `Send + Sync` so they can be stored in a
/// `Vec<Box<dyn ComplianceRule<C>>>`.
pub trait ComplianceRule<C>: Send + Sync {
    /// Short stable name used in reports and logs.
    fn name(&self) -> &str;

    fn evaluate(&self, context: &C, policy: &PolicyConfig) -> Result<RuleOutcome, ComplianceError>;
}
