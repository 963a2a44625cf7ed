use crate::codes::{Check, ComplianceCode};
use crate::config::PolicyConfig;
use crate::error::ComplianceError;
use crate::predicates::{
    has_sufficient_notice, is_reason_present, notice_days, recipient_cap, within_recipient_cap,
};
use crate::rule::{CessionContext, ComplianceRule, RecipientSnapshot, RuleOutcome};

/// A reason is required for every cession, internal or external.
pub struct ReasonRule;

impl ComplianceRule<CessionContext> for ReasonRule {
    fn name(&self) -> &str {
        "reason"
    }

    fn evaluate(
        &self,
        context: &CessionContext,
        _policy: &PolicyConfig,
    ) -> Result<RuleOutcome, ComplianceError> {
        Ok(RuleOutcome::from_check(is_reason_present(&context.reason), || {
            "a cession requires a reason".to_string()
        }))
    }
}

/// A representative cannot cede hours to themselves.
pub struct SelfCessionRule;

impl ComplianceRule<CessionContext> for SelfCessionRule {
    fn name(&self) -> &str {
        "self-cession"
    }

    fn evaluate(
        &self,
        context: &CessionContext,
        _policy: &PolicyConfig,
    ) -> Result<RuleOutcome, ComplianceError> {
        let same = matches!(&context.recipient, RecipientSnapshot::Internal { id, .. } if *id == context.donor);
        Ok(RuleOutcome::from_check(
            Check::from_bool(!same, ComplianceCode::SelfCession),
            || format!("{} cannot cede hours to themselves", context.donor),
        ))
    }
}

/// The donor's base and (policy permitting) carried-over remainders must
/// cover the whole cession. Received hours never count.
pub struct TransferableSourceRule;

impl ComplianceRule<CessionContext> for TransferableSourceRule {
    fn name(&self) -> &str {
        "transferable-source"
    }

    fn evaluate(
        &self,
        context: &CessionContext,
        _policy: &PolicyConfig,
    ) -> Result<RuleOutcome, ComplianceError> {
        if !context.hours.is_positive() {
            return Ok(RuleOutcome::Pass);
        }
        Ok(RuleOutcome::from_check(
            Check::from_bool(
                context.donor_transferable >= context.hours,
                ComplianceCode::InsufficientTransferableSource,
            ),
            || {
                format!(
                    "{} has {} transferable, {} requested",
                    context.donor, context.donor_transferable, context.hours
                )
            },
        ))
    }
}

/// Internal recipients may not end above the cap. Skipped for external ones.
pub struct RecipientCapRule;

impl ComplianceRule<CessionContext> for RecipientCapRule {
    fn name(&self) -> &str {
        "recipient-cap"
    }

    fn evaluate(
        &self,
        context: &CessionContext,
        policy: &PolicyConfig,
    ) -> Result<RuleOutcome, ComplianceError> {
        let RecipientSnapshot::Internal {
            id,
            balance,
            base_credit,
            ..
        } = &context.recipient
        else {
            return Ok(RuleOutcome::Pass);
        };

        let check = within_recipient_cap(*balance, context.hours, *base_credit, policy);
        Ok(RuleOutcome::from_check(check, || {
            format!(
                "{id} would hold {} against a cap of {}",
                *balance + context.hours,
                recipient_cap(*base_credit, policy)
            )
        }))
    }
}

/// Advance notice before the effective usage date. Soft: produces a warning.
pub struct NoticeRule;

impl ComplianceRule<CessionContext> for NoticeRule {
    fn name(&self) -> &str {
        "notice"
    }

    fn evaluate(
        &self,
        context: &CessionContext,
        policy: &PolicyConfig,
    ) -> Result<RuleOutcome, ComplianceError> {
        let check = has_sufficient_notice(context.effective_date, context.today, policy);
        Ok(RuleOutcome::from_check(check, || {
            format!(
                "effective date {} is {} day(s) away, {} required",
                context.effective_date,
                notice_days(context.effective_date, context.today),
                policy.notice_days
            )
        }))
    }
}
