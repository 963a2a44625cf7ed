use std::fmt;

use dcl_types::{CreditMonth, CreditSource, Hours, RepresentativeId};
use serde::{Deserialize, Serialize};

use crate::cession::SourceBreakdown;
use crate::consumption::UsageAllocation;
use crate::error::LedgerError;

/// Primary key of a credit period.
///
/// Ordering: `representative` → `month`, so one representative's periods are
/// contiguous and chronological.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeriodKey {
    pub representative: RepresentativeId,
    pub month: CreditMonth,
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.representative, self.month)
    }
}

/// Carried-over hours grouped by the month they were originally granted in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarryTranche {
    pub origin: CreditMonth,
    pub hours: Hours,
}

/// One representative's credit for one calendar month.
///
/// Source buckets (`base`, `carried_over`, `received`) are fixed when the
/// period opens, except `received` which grows with incoming cessions.
/// Consumption buckets only move through the usage and cession engines;
/// outside this crate the period is read-only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditPeriod {
    pub(crate) representative: RepresentativeId,
    pub(crate) month: CreditMonth,
    pub(crate) base: Hours,
    pub(crate) carried_over: Hours,
    pub(crate) received: Hours,
    pub(crate) ceded_from_base: Hours,
    pub(crate) ceded_from_carried: Hours,
    pub(crate) used_from_received: Hours,
    pub(crate) used_from_carried: Hours,
    pub(crate) used_from_base: Hours,
    pub(crate) overage: Hours,
    pub(crate) carried_tranches: Vec<CarryTranche>,
    /// Optimistic-concurrency version; 0 until first stored.
    pub(crate) version: u64,
}

impl CreditPeriod {
    /// A fresh, unstored period.
    pub fn open(
        representative: RepresentativeId,
        month: CreditMonth,
        base: Hours,
        mut carried_tranches: Vec<CarryTranche>,
    ) -> Self {
        carried_tranches.retain(|t| t.hours.is_positive());
        carried_tranches.sort_by_key(|t| t.origin);
        let carried_over = carried_tranches.iter().map(|t| t.hours).sum();
        Self {
            representative,
            month,
            base: base.clamp_non_negative(),
            carried_over,
            received: Hours::ZERO,
            ceded_from_base: Hours::ZERO,
            ceded_from_carried: Hours::ZERO,
            used_from_received: Hours::ZERO,
            used_from_carried: Hours::ZERO,
            used_from_base: Hours::ZERO,
            overage: Hours::ZERO,
            carried_tranches,
            version: 0,
        }
    }

    pub fn key(&self) -> PeriodKey {
        PeriodKey {
            representative: self.representative.clone(),
            month: self.month,
        }
    }

    pub fn representative(&self) -> &RepresentativeId {
        &self.representative
    }

    pub fn month(&self) -> CreditMonth {
        self.month
    }

    pub fn base(&self) -> Hours {
        self.base
    }

    pub fn carried_over(&self) -> Hours {
        self.carried_over
    }

    pub fn received(&self) -> Hours {
        self.received
    }

    pub fn ceded_from_base(&self) -> Hours {
        self.ceded_from_base
    }

    pub fn ceded_from_carried(&self) -> Hours {
        self.ceded_from_carried
    }

    pub fn used_from_received(&self) -> Hours {
        self.used_from_received
    }

    pub fn used_from_carried(&self) -> Hours {
        self.used_from_carried
    }

    pub fn used_from_base(&self) -> Hours {
        self.used_from_base
    }

    /// Usage committed beyond every source, pending employer authorization.
    pub fn overage(&self) -> Hours {
        self.overage
    }

    pub fn carried_tranches(&self) -> &[CarryTranche] {
        &self.carried_tranches
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn amount_of(&self, source: CreditSource) -> Hours {
        match source {
            CreditSource::Received => self.received,
            CreditSource::CarriedOver => self.carried_over,
            CreditSource::Base => self.base,
        }
    }

    pub fn used_from(&self, source: CreditSource) -> Hours {
        match source {
            CreditSource::Received => self.used_from_received,
            CreditSource::CarriedOver => self.used_from_carried,
            CreditSource::Base => self.used_from_base,
        }
    }

    /// Received hours are never ceded, so that bucket is always zero.
    pub fn ceded_from(&self, source: CreditSource) -> Hours {
        match source {
            CreditSource::Received => Hours::ZERO,
            CreditSource::CarriedOver => self.ceded_from_carried,
            CreditSource::Base => self.ceded_from_base,
        }
    }

    /// Every way this period currently breaks its invariants.
    pub fn invariant_breaches(&self) -> Vec<String> {
        let mut breaches = Vec::new();

        let buckets = [
            ("base", self.base),
            ("carried_over", self.carried_over),
            ("received", self.received),
            ("ceded_from_base", self.ceded_from_base),
            ("ceded_from_carried", self.ceded_from_carried),
            ("used_from_received", self.used_from_received),
            ("used_from_carried", self.used_from_carried),
            ("used_from_base", self.used_from_base),
            ("overage", self.overage),
        ];
        for (name, value) in buckets {
            if value.is_negative() {
                breaches.push(format!("{}: {name} is negative ({value})", self.key()));
            }
        }

        for source in CreditSource::ALL {
            let drawn = self.used_from(source) + self.ceded_from(source);
            let amount = self.amount_of(source);
            if drawn > amount {
                breaches.push(format!(
                    "{}: {source} overdrawn, {drawn} drawn from {amount}",
                    self.key()
                ));
            }
        }

        let tranche_total: Hours = self.carried_tranches.iter().map(|t| t.hours).sum();
        if tranche_total != self.carried_over {
            breaches.push(format!(
                "{}: carried tranches sum to {tranche_total}, carried_over is {}",
                self.key(),
                self.carried_over
            ));
        }

        breaches
    }

    pub fn check_invariants(&self) -> Result<(), LedgerError> {
        let breaches = self.invariant_breaches();
        if breaches.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::InvariantViolation(breaches.join("; ")))
        }
    }

    // ---- engine-only mutations ----

    pub(crate) fn apply_usage(&mut self, allocation: &UsageAllocation) {
        self.used_from_received += allocation.from_received;
        self.used_from_carried += allocation.from_carried;
        self.used_from_base += allocation.from_base;
        self.overage += allocation.overage;
    }

    pub(crate) fn release_usage(&mut self, allocation: &UsageAllocation) {
        self.used_from_received -= allocation.from_received;
        self.used_from_carried -= allocation.from_carried;
        self.used_from_base -= allocation.from_base;
        self.overage -= allocation.overage;
    }

    pub(crate) fn apply_cession_out(&mut self, source: &SourceBreakdown) {
        self.ceded_from_base += source.from_base;
        self.ceded_from_carried += source.from_carried;
    }

    pub(crate) fn release_cession_out(&mut self, source: &SourceBreakdown) {
        self.ceded_from_base -= source.from_base;
        self.ceded_from_carried -= source.from_carried;
    }

    pub(crate) fn apply_cession_in(&mut self, hours: Hours) {
        self.received += hours;
    }

    pub(crate) fn release_cession_in(&mut self, hours: Hours) {
        self.received -= hours;
    }
}
