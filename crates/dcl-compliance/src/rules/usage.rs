use crate::codes::{Check, ComplianceCode};
use crate::config::{OveragePolicy, PolicyConfig};
use crate::error::ComplianceError;
use crate::rule::{ComplianceRule, RuleOutcome, UsageContext};

/// Blocks uncovered usage when local policy forbids committing an overage.
///
/// Under [`OveragePolicy::Flag`] the overage is not a rule failure; it is
/// committed and flagged on the usage record instead.
pub struct OverageRule;

impl ComplianceRule<UsageContext> for OverageRule {
    fn name(&self) -> &str {
        "overage"
    }

    fn evaluate(
        &self,
        context: &UsageContext,
        policy: &PolicyConfig,
    ) -> Result<RuleOutcome, ComplianceError> {
        let blocked =
            policy.overage == OveragePolicy::Block && context.projected_overage.is_positive();
        Ok(RuleOutcome::from_check(
            Check::from_bool(!blocked, ComplianceCode::OverageRequiresAuthorization),
            || {
                format!(
                    "{} of the requested {} exceed every source and need employer authorization",
                    context.projected_overage, context.hours
                )
            },
        ))
    }
}
