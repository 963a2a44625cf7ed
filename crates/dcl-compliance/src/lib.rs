//! Compliance rules for the delegation credit ledger.
//!
//! Every usage declaration and cession passes through a [`ComplianceGate`]
//! before the ledger computes or commits anything. The gate evaluates all of
//! its rules and returns every violation and warning in one
//! [`ComplianceReport`]. The underlying predicates live in [`predicates`] and
//! can be called on their own to pre-validate a draft.
//!
//! # Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use dcl_compliance::{CessionContext, ComplianceGate, PolicyConfig, RecipientSnapshot};
//! use dcl_types::{Hours, RepresentativeId};
//!
//! let gate = ComplianceGate::for_cessions(PolicyConfig::default());
//! let context = CessionContext {
//!     donor: RepresentativeId::new("EMP-1").unwrap(),
//!     donor_mandate_active: true,
//!     donor_transferable: Hours::from_hours(10),
//!     recipient: RecipientSnapshot::External { name: "Federation".into() },
//!     hours: Hours::from_hours(4),
//!     effective_date: NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
//!     today: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
//!     reason: "congress".into(),
//! };
//! let report = gate.evaluate(&context).unwrap();
//! assert!(report.is_clean());
//! ```

pub mod codes;
pub mod config;
pub mod error;
pub mod gate;
pub mod predicates;
pub mod rule;
pub mod rules;

pub use codes::{Check, ComplianceCode, Finding, Severity};
pub use config::{CapReference, OveragePolicy, PolicyConfig};
pub use error::ComplianceError;
pub use gate::{ComplianceGate, ComplianceReport, RuleResult};
pub use rule::{CessionContext, ComplianceRule, RecipientSnapshot, RuleOutcome, UsageContext};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use dcl_types::{Hours, RepresentativeId};

    fn id(s: &str) -> RepresentativeId {
        RepresentativeId::new(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn internal(balance: i64, base: i64) -> RecipientSnapshot {
        RecipientSnapshot::Internal {
            id: id("EMP-2"),
            balance: Hours::from_hours(balance),
            base_credit: Hours::from_hours(base),
            mandate_active: true,
        }
    }

    fn cession(hours: i64, recipient: RecipientSnapshot) -> CessionContext {
        CessionContext {
            donor: id("EMP-1"),
            donor_mandate_active: true,
            donor_transferable: Hours::from_hours(20),
            recipient,
            hours: Hours::from_hours(hours),
            effective_date: date(2024, 3, 20),
            today: date(2024, 3, 1),
            reason: "works council plenary".into(),
        }
    }

    fn usage(hours: i64, overage: i64) -> UsageContext {
        UsageContext {
            representative: id("EMP-1"),
            mandate_active: true,
            hours: Hours::from_hours(hours),
            date: date(2024, 3, 5),
            projected_overage: Hours::from_hours(overage),
        }
    }

    // -----------------------------------------------------------------------
    // 1. A clean internal cession passes every rule
    // -----------------------------------------------------------------------
    #[test]
    fn clean_internal_cession_passes() {
        let gate = ComplianceGate::for_cessions(PolicyConfig::default());
        let report = gate.evaluate(&cession(4, internal(2, 10))).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.rule_results.len(), gate.rule_count());
        assert!(report.rule_results.iter().all(|r| r.passed));
    }

    // -----------------------------------------------------------------------
    // 2. Cap: 8 + 10 > 1.5 × 10 internally, ignored externally
    // -----------------------------------------------------------------------
    #[test]
    fn cap_applies_only_to_internal_recipients() {
        let gate = ComplianceGate::for_cessions(PolicyConfig::default());

        let report = gate.evaluate(&cession(10, internal(8, 10))).unwrap();
        assert_eq!(
            report.violation_codes(),
            vec![ComplianceCode::RecipientCapExceeded]
        );

        let external = RecipientSnapshot::External {
            name: "Union federation".into(),
        };
        let report = gate.evaluate(&cession(10, external)).unwrap();
        assert!(report.is_clean());
    }

    // -----------------------------------------------------------------------
    // 3. Violations accumulate instead of stopping at the first
    // -----------------------------------------------------------------------
    #[test]
    fn every_violation_is_reported() {
        let gate = ComplianceGate::for_cessions(PolicyConfig::default());
        let mut context = cession(25, internal(8, 10));
        context.reason = "   ".into();
        context.effective_date = date(2024, 3, 4);

        let report = gate.evaluate(&context).unwrap();
        assert!(report.is_rejected());
        assert_eq!(
            report.violation_codes(),
            vec![
                ComplianceCode::MissingReason,
                ComplianceCode::InsufficientTransferableSource,
                ComplianceCode::RecipientCapExceeded,
            ]
        );
        assert_eq!(report.warning_codes(), vec![ComplianceCode::NoticeShortfall]);
    }

    // -----------------------------------------------------------------------
    // 4. Notice shortfall alone is a warning, not a rejection
    // -----------------------------------------------------------------------
    #[test]
    fn notice_shortfall_is_only_a_warning() {
        let gate = ComplianceGate::for_cessions(PolicyConfig::default());
        let mut context = cession(4, internal(0, 10));
        context.effective_date = date(2024, 3, 6);

        let report = gate.evaluate(&context).unwrap();
        assert!(!report.is_rejected());
        assert!(!report.is_clean());
        assert!(report.has(ComplianceCode::NoticeShortfall));
    }

    // -----------------------------------------------------------------------
    // 5. Reason is required for external recipients too
    // -----------------------------------------------------------------------
    #[test]
    fn external_cession_still_needs_reason() {
        let gate = ComplianceGate::for_cessions(PolicyConfig::default());
        let mut context = cession(4, RecipientSnapshot::External { name: "X".into() });
        context.reason = String::new();
        let report = gate.evaluate(&context).unwrap();
        assert_eq!(report.violation_codes(), vec![ComplianceCode::MissingReason]);
    }

    // -----------------------------------------------------------------------
    // 6. Self cession and inactive mandates
    // -----------------------------------------------------------------------
    #[test]
    fn self_cession_and_inactive_parties_are_rejected() {
        let gate = ComplianceGate::for_cessions(PolicyConfig::default());
        let recipient = RecipientSnapshot::Internal {
            id: id("EMP-1"),
            balance: Hours::ZERO,
            base_credit: Hours::from_hours(10),
            mandate_active: false,
        };
        let report = gate.evaluate(&cession(2, recipient)).unwrap();
        assert!(report.has(ComplianceCode::SelfCession));
        assert!(report.has(ComplianceCode::MandateInactive));
    }

    // -----------------------------------------------------------------------
    // 7. Non-positive hours skip the source check
    // -----------------------------------------------------------------------
    #[test]
    fn zero_hours_reports_invalid_hours_only() {
        let gate = ComplianceGate::for_cessions(PolicyConfig::default());
        let report = gate.evaluate(&cession(0, internal(0, 10))).unwrap();
        assert_eq!(report.violation_codes(), vec![ComplianceCode::InvalidHours]);
    }

    // -----------------------------------------------------------------------
    // 8. Usage overage: flagged by default, blocked on request
    // -----------------------------------------------------------------------
    #[test]
    fn overage_respects_policy() {
        let flag = ComplianceGate::for_usage(PolicyConfig::default());
        assert!(flag.evaluate(&usage(20, 8)).unwrap().is_clean());

        let block = ComplianceGate::for_usage(PolicyConfig {
            overage: OveragePolicy::Block,
            ..Default::default()
        });
        let report = block.evaluate(&usage(20, 8)).unwrap();
        assert_eq!(
            report.violation_codes(),
            vec![ComplianceCode::OverageRequiresAuthorization]
        );
        assert!(block.evaluate(&usage(4, 0)).unwrap().is_clean());
    }

    // -----------------------------------------------------------------------
    // 9. Usage requires positive hours and an active mandate
    // -----------------------------------------------------------------------
    #[test]
    fn usage_rules_accumulate() {
        let gate = ComplianceGate::for_usage(PolicyConfig::default());
        let mut context = usage(0, 0);
        context.mandate_active = false;
        let report = gate.evaluate(&context).unwrap();
        assert_eq!(
            report.violation_codes(),
            vec![ComplianceCode::InvalidHours, ComplianceCode::MandateInactive]
        );
    }

    // -----------------------------------------------------------------------
    // 10. Custom rules extend the gate
    // -----------------------------------------------------------------------
    struct AlwaysWarn;

    impl ComplianceRule<UsageContext> for AlwaysWarn {
        fn name(&self) -> &str {
            "always-warn"
        }

        fn evaluate(
            &self,
            _context: &UsageContext,
            _policy: &PolicyConfig,
        ) -> Result<RuleOutcome, ComplianceError> {
            Ok(RuleOutcome::Warning(Finding::new(
                ComplianceCode::NoticeShortfall,
                "test",
            )))
        }
    }

    #[test]
    fn custom_rule_is_evaluated() {
        let mut gate = ComplianceGate::for_usage(PolicyConfig::default());
        gate.add_rule(Box::new(AlwaysWarn));
        let report = gate.evaluate(&usage(1, 0)).unwrap();
        assert_eq!(report.rule_results.last().unwrap().rule, "always-warn");
        assert_eq!(report.warnings.len(), 1);
    }
}
