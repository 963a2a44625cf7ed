use dcl_types::{CreditSource, Hours};
use serde::{Deserialize, Serialize};

use crate::period::CreditPeriod;

/// Remaining consumable hours per source, clamped at zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub received: Hours,
    pub carried_over: Hours,
    pub base: Hours,
}

impl Capacity {
    pub fn of(&self, source: CreditSource) -> Hours {
        match source {
            CreditSource::Received => self.received,
            CreditSource::CarriedOver => self.carried_over,
            CreditSource::Base => self.base,
        }
    }

    pub fn total(&self) -> Hours {
        self.received + self.carried_over + self.base
    }
}

/// Derived view of a credit period.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Sources minus every ceded, used and overage bucket. Negative only when
    /// an overage was committed.
    pub available: Hours,
    pub by_capacity: Capacity,
}

/// Compute the balance of `period`. Pure; never fails.
pub fn compute_balance(period: &CreditPeriod) -> Balance {
    let available = period.base() + period.carried_over() + period.received()
        - period.ceded_from_base()
        - period.ceded_from_carried()
        - period.used_from_received()
        - period.used_from_carried()
        - period.used_from_base()
        - period.overage();

    let remaining = |source| {
        (period.amount_of(source) - period.used_from(source) - period.ceded_from(source))
            .clamp_non_negative()
    };

    Balance {
        available,
        by_capacity: Capacity {
            received: remaining(CreditSource::Received),
            carried_over: remaining(CreditSource::CarriedOver),
            base: remaining(CreditSource::Base),
        },
    }
}
