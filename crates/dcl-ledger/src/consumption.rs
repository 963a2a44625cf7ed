//! Usage consumption: draws a declaration across the sources in statutory
//! order.

use dcl_types::{CreditSource, Hours};
use serde::{Deserialize, Serialize};

use crate::balance::{compute_balance, Capacity};
use crate::period::CreditPeriod;

/// Received hours go first, then carried-over before they lapse, then base.
pub const CONSUMPTION_ORDER: [CreditSource; 3] = [
    CreditSource::Received,
    CreditSource::CarriedOver,
    CreditSource::Base,
];

/// Result of walking a ladder of sources.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Draw {
    pub taken: Vec<(CreditSource, Hours)>,
    pub unmet: Hours,
}

impl Draw {
    pub fn from(&self, source: CreditSource) -> Hours {
        self.taken
            .iter()
            .filter(|(s, _)| *s == source)
            .map(|(_, h)| *h)
            .sum()
    }
}

/// Take `requested` from `capacity`, one source at a time in `ladder` order.
///
/// Stops as soon as the request is met: a request that exactly empties a
/// source leaves every later source untouched.
pub fn draw(ladder: &[CreditSource], capacity: &Capacity, requested: Hours) -> Draw {
    let mut remaining = requested.clamp_non_negative();
    let mut taken = Vec::new();

    for &source in ladder {
        if remaining.is_zero() {
            break;
        }
        let take = remaining.min(capacity.of(source));
        if take.is_positive() {
            taken.push((source, take));
            remaining -= take;
        }
    }

    Draw {
        taken,
        unmet: remaining,
    }
}

/// How one usage declaration is charged to a period.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageAllocation {
    pub from_received: Hours,
    pub from_carried: Hours,
    pub from_base: Hours,
    /// Hours no source could cover.
    pub overage: Hours,
}

impl UsageAllocation {
    /// The compensating allocation of a correction.
    pub fn negated(&self) -> Self {
        Self {
            from_received: -self.from_received,
            from_carried: -self.from_carried,
            from_base: -self.from_base,
            overage: -self.overage,
        }
    }

    /// Hours charged to a real source.
    pub fn covered(&self) -> Hours {
        self.from_received + self.from_carried + self.from_base
    }

    pub fn total(&self) -> Hours {
        self.covered() + self.overage
    }
}

/// Allocate `requested` hours against the remaining capacity of `period`.
///
/// Never fails: whatever cannot be covered comes back as `overage`, and the
/// caller decides whether to commit it.
pub fn consume(period: &CreditPeriod, requested: Hours) -> UsageAllocation {
    let capacity = compute_balance(period).by_capacity;
    let draw = draw(&CONSUMPTION_ORDER, &capacity, requested);
    UsageAllocation {
        from_received: draw.from(CreditSource::Received),
        from_carried: draw.from(CreditSource::CarriedOver),
        from_base: draw.from(CreditSource::Base),
        overage: draw.unmet,
    }
}
