use crate::codes::{Check, ComplianceCode, Finding};
use crate::config::PolicyConfig;
use crate::error::ComplianceError;
use crate::predicates::is_positive_amount;
use crate::rule::{CessionContext, ComplianceRule, RecipientSnapshot, RuleOutcome, UsageContext};

/// Requests must move a strictly positive amount.
pub struct PositiveHoursRule;

impl ComplianceRule<CessionContext> for PositiveHoursRule {
    fn name(&self) -> &str {
        "positive-hours"
    }

    fn evaluate(
        &self,
        context: &CessionContext,
        _policy: &PolicyConfig,
    ) -> Result<RuleOutcome, ComplianceError> {
        Ok(RuleOutcome::from_check(is_positive_amount(context.hours), || {
            format!("cession of {} must be positive", context.hours)
        }))
    }
}

impl ComplianceRule<UsageContext> for PositiveHoursRule {
    fn name(&self) -> &str {
        "positive-hours"
    }

    fn evaluate(
        &self,
        context: &UsageContext,
        _policy: &PolicyConfig,
    ) -> Result<RuleOutcome, ComplianceError> {
        Ok(RuleOutcome::from_check(is_positive_amount(context.hours), || {
            format!("usage of {} must be positive", context.hours)
        }))
    }
}

/// Every internal party must hold a mandate in force on the effective date.
pub struct MandateRule;

impl ComplianceRule<CessionContext> for MandateRule {
    fn name(&self) -> &str {
        "mandate"
    }

    fn evaluate(
        &self,
        context: &CessionContext,
        _policy: &PolicyConfig,
    ) -> Result<RuleOutcome, ComplianceError> {
        let mut inactive = Vec::new();
        if !context.donor_mandate_active {
            inactive.push(context.donor.to_string());
        }
        if let RecipientSnapshot::Internal {
            id,
            mandate_active: false,
            ..
        } = &context.recipient
        {
            inactive.push(id.to_string());
        }

        if inactive.is_empty() {
            return Ok(RuleOutcome::Pass);
        }
        Ok(RuleOutcome::Violation(Finding::new(
            ComplianceCode::MandateInactive,
            format!(
                "no mandate in force on {} for {}",
                context.effective_date,
                inactive.join(", ")
            ),
        )))
    }
}

impl ComplianceRule<UsageContext> for MandateRule {
    fn name(&self) -> &str {
        "mandate"
    }

    fn evaluate(
        &self,
        context: &UsageContext,
        _policy: &PolicyConfig,
    ) -> Result<RuleOutcome, ComplianceError> {
        Ok(RuleOutcome::from_check(
            Check::from_bool(context.mandate_active, ComplianceCode::MandateInactive),
            || {
                format!(
                    "no mandate in force on {} for {}",
                    context.date, context.representative
                )
            },
        ))
    }
}
