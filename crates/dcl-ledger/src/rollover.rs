//! Period opening and carry-over expiry.

use dcl_compliance::PolicyConfig;
use dcl_types::{CreditMonth, Hours, Representative};

use crate::config::LedgerConfig;
use crate::period::{CarryTranche, CreditPeriod};

/// Tranches `prev` hands to `next_month`.
///
/// Consumed carried-over hours (used plus ceded) are charged to the oldest
/// tranches first. The unused base of `prev` becomes a new tranche. Tranches
/// older than the expiry window are dropped. Received hours never carry.
pub fn carry_forward(
    prev: &CreditPeriod,
    next_month: CreditMonth,
    policy: &PolicyConfig,
) -> Vec<CarryTranche> {
    if !policy.carry_over_allowed {
        return Vec::new();
    }

    let mut consumed = prev.used_from_carried() + prev.ceded_from_carried();
    let mut tranches = Vec::with_capacity(prev.carried_tranches().len() + 1);
    for tranche in prev.carried_tranches() {
        let charged = consumed.min(tranche.hours).clamp_non_negative();
        consumed -= charged;
        let left = tranche.hours - charged;
        if left.is_positive() {
            tranches.push(CarryTranche {
                origin: tranche.origin,
                hours: left,
            });
        }
    }

    let base_residue =
        (prev.base() - prev.used_from_base() - prev.ceded_from_base()).clamp_non_negative();
    if base_residue.is_positive() {
        tranches.push(CarryTranche {
            origin: prev.month(),
            hours: base_residue,
        });
    }

    let expiry = i64::from(policy.carry_over_expiry_months);
    tranches.retain(|t| t.origin.months_until(&next_month) <= expiry);
    tranches
}

/// Open `month` for `representative`, carrying over from `prev` if given.
///
/// Representatives whose mandate does not touch the month get no base.
pub fn open_period(
    representative: &Representative,
    month: CreditMonth,
    prev: Option<&CreditPeriod>,
    config: &LedgerConfig,
) -> CreditPeriod {
    let base = if representative.active_during(&month) {
        config.base_credit(representative)
    } else {
        Hours::ZERO
    };
    let tranches = prev
        .map(|p| carry_forward(p, month, &config.policy))
        .unwrap_or_default();

    let period = CreditPeriod::open(representative.id.clone(), month, base, tranches);
    tracing::debug!(
        representative = %representative.id,
        %month,
        base = %period.base(),
        carried_over = %period.carried_over(),
        "credit period opened"
    );
    period
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cession::SourceBreakdown;
    use crate::consumption::UsageAllocation;
    use chrono::NaiveDate;
    use dcl_types::{MembershipStatus, RepresentativeClass, RepresentativeId};

    fn h(n: i64) -> Hours {
        Hours::from_hours(n)
    }

    fn month(m: u32) -> CreditMonth {
        CreditMonth::new(2024, m).unwrap()
    }

    fn rep(status: MembershipStatus) -> Representative {
        Representative {
            id: RepresentativeId::new("EMP-1").unwrap(),
            name: "Ana Moreau".into(),
            class: RepresentativeClass::CouncilMember,
            status,
            mandate_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            mandate_end: None,
            archived: false,
        }
    }

    fn period(m: u32, base: i64, tranches: Vec<(u32, i64)>) -> CreditPeriod {
        CreditPeriod::open(
            RepresentativeId::new("EMP-1").unwrap(),
            month(m),
            h(base),
            tranches
                .into_iter()
                .map(|(origin, hours)| CarryTranche {
                    origin: month(origin),
                    hours: h(hours),
                })
                .collect(),
        )
    }

    #[test]
    fn unused_base_becomes_a_tranche() {
        let mut prev = period(3, 10, vec![]);
        prev.apply_usage(&UsageAllocation {
            from_base: h(4),
            ..Default::default()
        });
        prev.apply_cession_out(&SourceBreakdown {
            from_base: h(1),
            from_carried: Hours::ZERO,
        });
        let tranches = carry_forward(&prev, month(4), &PolicyConfig::default());
        assert_eq!(
            tranches,
            vec![CarryTranche {
                origin: month(3),
                hours: h(5)
            }]
        );
    }

    #[test]
    fn carried_consumption_charges_oldest_first() {
        let mut prev = period(4, 0, vec![(1, 2), (3, 3)]);
        prev.apply_usage(&UsageAllocation {
            from_carried: h(1),
            ..Default::default()
        });
        prev.apply_cession_out(&SourceBreakdown {
            from_base: Hours::ZERO,
            from_carried: h(2),
        });
        let tranches = carry_forward(&prev, month(5), &PolicyConfig::default());
        assert_eq!(
            tranches,
            vec![CarryTranche {
                origin: month(3),
                hours: h(2)
            }]
        );
    }

    #[test]
    fn tranches_expire_after_three_months() {
        let prev = period(4, 0, vec![(1, 2), (2, 3)]);
        let tranches = carry_forward(&prev, month(5), &PolicyConfig::default());
        assert_eq!(tranches.len(), 1);
        assert_eq!(tranches[0].origin, month(2));
    }

    #[test]
    fn received_residue_never_carries() {
        let mut prev = period(3, 0, vec![]);
        prev.apply_cession_in(h(6));
        assert!(carry_forward(&prev, month(4), &PolicyConfig::default()).is_empty());
    }

    #[test]
    fn carry_over_can_be_disabled() {
        let prev = period(3, 10, vec![]);
        let policy = PolicyConfig {
            carry_over_allowed: false,
            ..Default::default()
        };
        assert!(carry_forward(&prev, month(4), &policy).is_empty());
    }

    #[test]
    fn open_period_applies_base_table_and_status() {
        let config = LedgerConfig::default();
        let prev = period(3, 22, vec![]);

        let titular = open_period(&rep(MembershipStatus::Titular), month(4), Some(&prev), &config);
        assert_eq!(titular.base(), h(22));
        assert_eq!(titular.carried_over(), h(22));

        let substitute = open_period(&rep(MembershipStatus::Substitute), month(4), None, &config);
        assert_eq!(substitute.base(), Hours::ZERO);
        assert_eq!(substitute.carried_over(), Hours::ZERO);
    }

    #[test]
    fn inactive_month_gets_no_base() {
        let config = LedgerConfig::default();
        let mut r = rep(MembershipStatus::Titular);
        r.mandate_end = Some(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(open_period(&r, month(4), None, &config).base(), Hours::ZERO);
    }
}
