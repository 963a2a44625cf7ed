use serde::{Deserialize, Serialize};

use crate::codes::{ComplianceCode, Finding};
use crate::config::PolicyConfig;
use crate::error::ComplianceError;
use crate::rule::{CessionContext, ComplianceRule, RuleOutcome, UsageContext};
use crate::rules::{
    MandateRule, NoticeRule, OverageRule, PositiveHoursRule, ReasonRule, RecipientCapRule,
    SelfCessionRule, TransferableSourceRule,
};

// ---------------------------------------------------------------------------
// ComplianceReport
// ---------------------------------------------------------------------------

/// Per-rule pass/fail, in evaluation order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleResult {
    pub rule: String,
    pub passed: bool,
}

/// Everything the gate found wrong with a request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub violations: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub rule_results: Vec<RuleResult>,
}

impl ComplianceReport {
    /// No violations and no warnings.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.warnings.is_empty()
    }

    /// At least one hard violation.
    pub fn is_rejected(&self) -> bool {
        !self.violations.is_empty()
    }

    pub fn violation_codes(&self) -> Vec<ComplianceCode> {
        self.violations.iter().map(|f| f.code).collect()
    }

    pub fn warning_codes(&self) -> Vec<ComplianceCode> {
        self.warnings.iter().map(|f| f.code).collect()
    }

    pub fn has(&self, code: ComplianceCode) -> bool {
        self.violations
            .iter()
            .chain(self.warnings.iter())
            .any(|f| f.code == code)
    }
}

// ---------------------------------------------------------------------------
// ComplianceGate
// ---------------------------------------------------------------------------

/// An ordered set of rules evaluated against one request.
///
/// Unlike a fail-fast pipeline, every rule runs and every finding is
/// collected, so callers can present a complete correction list at once.
pub struct ComplianceGate<C> {
    rules: Vec<Box<dyn ComplianceRule<C>>>,
    policy: PolicyConfig,
}

impl<C> ComplianceGate<C> {
    /// Create a gate with no rules.
    pub fn new(policy: PolicyConfig) -> Self {
        Self {
            rules: Vec::new(),
            policy,
        }
    }

    pub fn add_rule(&mut self, rule: Box<dyn ComplianceRule<C>>) {
        self.rules.push(rule);
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn evaluate(&self, context: &C) -> Result<ComplianceReport, ComplianceError> {
        let mut report = ComplianceReport::default();

        for rule in &self.rules {
            let outcome = rule.evaluate(context, &self.policy)?;
            report.rule_results.push(RuleResult {
                rule: rule.name().to_string(),
                passed: outcome.is_pass(),
            });

            match outcome {
                RuleOutcome::Pass => {}
                RuleOutcome::Violation(finding) => {
                    tracing::debug!(rule = rule.name(), code = %finding.code, "rule violated");
                    report.violations.push(finding);
                }
                RuleOutcome::Warning(finding) => {
                    tracing::debug!(rule = rule.name(), code = %finding.code, "rule warned");
                    report.warnings.push(finding);
                }
            }
        }

        Ok(report)
    }
}

impl ComplianceGate<CessionContext> {
    /// The statutory cession rule set.
    pub fn for_cessions(policy: PolicyConfig) -> Self {
        let mut gate = Self::new(policy);
        gate.add_rule(Box::new(PositiveHoursRule));
        gate.add_rule(Box::new(ReasonRule));
        gate.add_rule(Box::new(SelfCessionRule));
        gate.add_rule(Box::new(MandateRule));
        gate.add_rule(Box::new(TransferableSourceRule));
        gate.add_rule(Box::new(RecipientCapRule));
        gate.add_rule(Box::new(NoticeRule));
        gate
    }
}

impl ComplianceGate<UsageContext> {
    /// The usage-declaration rule set.
    pub fn for_usage(policy: PolicyConfig) -> Self {
        let mut gate = Self::new(policy);
        gate.add_rule(Box::new(PositiveHoursRule));
        gate.add_rule(Box::new(MandateRule));
        gate.add_rule(Box::new(OverageRule));
        gate
    }
}
