//! Stateless rule checks.
//!
//! These are the building blocks of the cession and usage rules, exposed on
//! their own so callers can pre-validate a draft before submitting it.

use chrono::NaiveDate;
use dcl_types::{CreditSource, Hours};

use crate::codes::{Check, ComplianceCode};
use crate::config::{CapReference, PolicyConfig};

/// Whether hours from `source` may be ceded under `policy`.
pub fn is_transferable(source: CreditSource, policy: &PolicyConfig) -> Check {
    let allowed = match source {
        CreditSource::Base => true,
        CreditSource::CarriedOver => policy.cede_from_carried_allowed,
        CreditSource::Received => false,
    };
    Check::from_bool(allowed, ComplianceCode::SourceNotTransferable)
}

/// Maximum balance a recipient may hold after a cession.
pub fn recipient_cap(recipient_base_credit: Hours, policy: &PolicyConfig) -> Hours {
    let reference = match policy.cap_reference {
        CapReference::Fixed { hours } => hours,
        CapReference::OwnBase if recipient_base_credit.is_positive() => recipient_base_credit,
        CapReference::OwnBase => policy.fallback_reference.unwrap_or(Hours::ZERO),
    };
    reference.percent(policy.recipient_cap_percent)
}

/// Passes while `current_balance + incoming` stays at or under the cap.
pub fn within_recipient_cap(
    current_balance: Hours,
    incoming: Hours,
    recipient_base_credit: Hours,
    policy: &PolicyConfig,
) -> Check {
    let cap = recipient_cap(recipient_base_credit, policy);
    Check::from_bool(
        current_balance + incoming <= cap,
        ComplianceCode::RecipientCapExceeded,
    )
}

/// Days between `today` and `effective_date`.
pub fn notice_days(effective_date: NaiveDate, today: NaiveDate) -> i64 {
    (effective_date - today).num_days()
}

pub fn has_sufficient_notice(
    effective_date: NaiveDate,
    today: NaiveDate,
    policy: &PolicyConfig,
) -> Check {
    Check::from_bool(
        notice_days(effective_date, today) >= policy.notice_days,
        ComplianceCode::NoticeShortfall,
    )
}

pub fn is_reason_present(reason: &str) -> Check {
    Check::from_bool(!reason.trim().is_empty(), ComplianceCode::MissingReason)
}

pub fn is_positive_amount(hours: Hours) -> Check {
    Check::from_bool(hours.is_positive(), ComplianceCode::InvalidHours)
}
