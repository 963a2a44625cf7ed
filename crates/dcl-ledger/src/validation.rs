use std::collections::BTreeMap;

use dcl_types::{CreditSource, Hours};
use serde::{Deserialize, Serialize};

use crate::cession::SourceBreakdown;
use crate::consumption::UsageAllocation;
use crate::error::LedgerError;
use crate::period::{CreditPeriod, PeriodKey};
use crate::traits::CreditStore;

/// Result of a full ledger audit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub periods_checked: usize,
    pub breaches: Vec<Breach>,
}

impl AuditReport {
    pub fn is_valid(&self) -> bool {
        self.breaches.is_empty()
    }
}

/// One inconsistency found by the auditor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breach {
    pub period: PeriodKey,
    pub kind: BreachKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreachKind {
    /// `used_S + ceded_S > S` for some source.
    SourceOverdrawn,
    NegativeBucket,
    /// Carried-over total differs from its tranches.
    TrancheMismatch,
    /// Ceded or received buckets differ from the cession log.
    CessionMismatch,
    /// Used or overage buckets differ from the usage log.
    UsageMismatch,
}

#[derive(Default)]
struct Expected {
    ceded: SourceBreakdown,
    received: Hours,
    used: UsageAllocation,
}

/// Replays the usage and cession logs against every stored period.
pub struct InvariantAuditor;

impl InvariantAuditor {
    pub fn audit<S: CreditStore + ?Sized>(store: &S) -> Result<AuditReport, LedgerError> {
        let periods = store.all_periods()?;
        let mut expected: BTreeMap<PeriodKey, Expected> = BTreeMap::new();

        for cession in store.all_cessions()? {
            let donor = expected
                .entry(PeriodKey {
                    representative: cession.donor.clone(),
                    month: cession.month,
                })
                .or_default();
            donor.ceded.from_base += cession.source.from_base;
            donor.ceded.from_carried += cession.source.from_carried;

            if let Some(id) = cession.beneficiary.id() {
                expected
                    .entry(PeriodKey {
                        representative: id.clone(),
                        month: cession.month,
                    })
                    .or_default()
                    .received += cession.hours;
            }
        }

        for usage in store.all_usage()? {
            let entry = expected
                .entry(PeriodKey {
                    representative: usage.representative.clone(),
                    month: usage.month,
                })
                .or_default();
            entry.used.from_received += usage.allocation.from_received;
            entry.used.from_carried += usage.allocation.from_carried;
            entry.used.from_base += usage.allocation.from_base;
            entry.used.overage += usage.allocation.overage;
        }

        let mut report = AuditReport {
            periods_checked: periods.len(),
            breaches: Vec::new(),
        };
        for period in &periods {
            let log = expected.remove(&period.key()).unwrap_or_default();
            check_period(period, &log, &mut report.breaches);
        }

        // Log entries pointing at periods that were never stored.
        for (key, log) in expected {
            let kind = if log.used != UsageAllocation::default() {
                BreachKind::UsageMismatch
            } else if log.ceded != SourceBreakdown::default() || !log.received.is_zero() {
                BreachKind::CessionMismatch
            } else {
                continue;
            };
            report.breaches.push(Breach {
                description: format!("{key}: records exist but the period was never opened"),
                period: key,
                kind,
            });
        }

        Ok(report)
    }
}

fn check_period(period: &CreditPeriod, log: &Expected, breaches: &mut Vec<Breach>) {
    let key = period.key();
    let mut push = |kind, description: String| {
        breaches.push(Breach {
            period: key.clone(),
            kind,
            description,
        })
    };

    let buckets = [
        ("base", period.base()),
        ("carried_over", period.carried_over()),
        ("received", period.received()),
        ("ceded_from_base", period.ceded_from_base()),
        ("ceded_from_carried", period.ceded_from_carried()),
        ("used_from_received", period.used_from_received()),
        ("used_from_carried", period.used_from_carried()),
        ("used_from_base", period.used_from_base()),
        ("overage", period.overage()),
    ];
    for (name, value) in buckets {
        if value.is_negative() {
            push(BreachKind::NegativeBucket, format!("{name} is {value}"));
        }
    }

    for source in CreditSource::ALL {
        let drawn = period.used_from(source) + period.ceded_from(source);
        if drawn > period.amount_of(source) {
            push(
                BreachKind::SourceOverdrawn,
                format!("{source}: {drawn} drawn from {}", period.amount_of(source)),
            );
        }
    }

    let tranches: Hours = period.carried_tranches().iter().map(|t| t.hours).sum();
    if tranches != period.carried_over() {
        push(
            BreachKind::TrancheMismatch,
            format!("tranches {tranches}, carried_over {}", period.carried_over()),
        );
    }

    if log.ceded.from_base != period.ceded_from_base()
        || log.ceded.from_carried != period.ceded_from_carried()
    {
        push(
            BreachKind::CessionMismatch,
            format!(
                "ceded {}/{} but cession log says {}/{}",
                period.ceded_from_base(),
                period.ceded_from_carried(),
                log.ceded.from_base,
                log.ceded.from_carried
            ),
        );
    }
    if log.received != period.received() {
        push(
            BreachKind::CessionMismatch,
            format!(
                "received {} but cession log says {}",
                period.received(),
                log.received
            ),
        );
    }

    let stored = UsageAllocation {
        from_received: period.used_from_received(),
        from_carried: period.used_from_carried(),
        from_base: period.used_from_base(),
        overage: period.overage(),
    };
    if stored != log.used {
        push(
            BreachKind::UsageMismatch,
            format!("buckets {stored:?} but usage log says {:?}", log.used),
        );
    }
}
