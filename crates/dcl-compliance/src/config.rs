use dcl_types::Hours;
use serde::{Deserialize, Serialize};

use crate::error::ComplianceError;

/// Statutory and local-agreement knobs consumed by the ledger.
///
/// The ledger does not own these values; they come from the deployment
/// configuration and may differ between companies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Whether unused hours roll into the next month at all.
    pub carry_over_allowed: bool,
    /// Whether carried-over hours may be ceded, or only the base grant.
    pub cede_from_carried_allowed: bool,
    /// Months after which an unused carried-over tranche lapses.
    pub carry_over_expiry_months: u32,
    /// Recipient balance cap, as a percentage of the reference credit.
    pub recipient_cap_percent: u32,
    /// Which credit the recipient cap is computed from.
    pub cap_reference: CapReference,
    /// Reference credit used when the recipient has no base of their own
    /// (substitutes). `None` means such recipients have a zero cap.
    pub fallback_reference: Option<Hours>,
    /// Minimum days between the request and the effective usage date.
    pub notice_days: i64,
    /// What to do with usage exceeding every source.
    pub overage: OveragePolicy,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            carry_over_allowed: true,
            cede_from_carried_allowed: true,
            carry_over_expiry_months: 3,
            recipient_cap_percent: 150,
            cap_reference: CapReference::OwnBase,
            fallback_reference: Some(Hours::from_hours(22)),
            notice_days: 8,
            overage: OveragePolicy::Flag,
        }
    }
}

impl PolicyConfig {
    /// Reject configurations under which no cession could ever pass.
    pub fn validate(&self) -> Result<(), ComplianceError> {
        if self.recipient_cap_percent == 0 {
            return Err(ComplianceError::Config(
                "recipient_cap_percent must be positive".into(),
            ));
        }
        if self.notice_days < 0 {
            return Err(ComplianceError::Config(
                "notice_days must not be negative".into(),
            ));
        }
        if let CapReference::Fixed { hours } = self.cap_reference {
            if !hours.is_positive() {
                return Err(ComplianceError::Config(
                    "fixed cap reference must be positive".into(),
                ));
            }
        }
        if self.fallback_reference.is_some_and(|h| h.is_negative()) {
            return Err(ComplianceError::Config(
                "fallback_reference must not be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Basis of the recipient cap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CapReference {
    /// The recipient's own statutory monthly base credit.
    OwnBase,
    /// A fixed reference credit, e.g. the 22h grant of a 250+ employee company.
    Fixed { hours: Hours },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OveragePolicy {
    /// Commit and record the overage for employer authorization.
    #[default]
    Flag,
    /// Reject the declaration.
    Block,
}
