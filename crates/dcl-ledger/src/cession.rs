//! Cession engine: selects the donor's transferable sources and runs the
//! cession rules against one consistent snapshot.

use chrono::NaiveDate;
use dcl_compliance::predicates::is_transferable;
use dcl_compliance::{
    CessionContext, ComplianceGate, ComplianceReport, PolicyConfig, RecipientSnapshot,
};
use dcl_types::{CreditSource, Hours};
use serde::{Deserialize, Serialize};

use crate::balance::{compute_balance, Capacity};
use crate::consumption::draw;
use crate::error::LedgerError;
use crate::period::CreditPeriod;

/// Which donor buckets a cession was funded from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBreakdown {
    pub from_base: Hours,
    pub from_carried: Hours,
}

impl SourceBreakdown {
    pub fn total(&self) -> Hours {
        self.from_base + self.from_carried
    }
}

/// Base first, then carried-over when policy allows. Received never appears.
pub fn cession_ladder(policy: &PolicyConfig) -> Vec<CreditSource> {
    [CreditSource::Base, CreditSource::CarriedOver]
        .into_iter()
        .filter(|source| is_transferable(*source, policy).passed)
        .collect()
}

/// Hours the donor could cede right now.
pub fn transferable_capacity(capacity: &Capacity, policy: &PolicyConfig) -> Hours {
    cession_ladder(policy)
        .into_iter()
        .map(|source| capacity.of(source))
        .sum()
}

/// Receiving side as the engine sees it.
#[derive(Clone, Copy, Debug)]
pub enum CessionTarget<'a> {
    Internal {
        period: &'a CreditPeriod,
        mandate_active: bool,
    },
    External {
        name: &'a str,
    },
}

/// One cession request evaluated against current periods.
#[derive(Clone, Debug)]
pub struct CessionInput<'a> {
    pub donor: &'a CreditPeriod,
    pub donor_mandate_active: bool,
    pub target: CessionTarget<'a>,
    pub hours: Hours,
    pub effective_date: NaiveDate,
    pub today: NaiveDate,
    pub reason: &'a str,
}

/// Source selection plus everything the rules found.
///
/// `source` is only meaningful when the report carries no violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CessionDecision {
    pub source: SourceBreakdown,
    pub report: ComplianceReport,
}

pub struct CessionEngine {
    gate: ComplianceGate<CessionContext>,
}

impl CessionEngine {
    pub fn new(policy: PolicyConfig) -> Self {
        Self {
            gate: ComplianceGate::for_cessions(policy),
        }
    }

    pub fn policy(&self) -> &PolicyConfig {
        self.gate.policy()
    }

    /// Select sources and validate. Performs no mutation.
    pub fn cede(&self, input: &CessionInput<'_>) -> Result<CessionDecision, LedgerError> {
        let policy = self.gate.policy();
        let capacity = compute_balance(input.donor).by_capacity;
        let ladder = cession_ladder(policy);
        let drawn = draw(&ladder, &capacity, input.hours);

        let recipient = match input.target {
            CessionTarget::Internal {
                period,
                mandate_active,
            } => RecipientSnapshot::Internal {
                id: period.representative().clone(),
                balance: compute_balance(period).available,
                base_credit: period.base(),
                mandate_active,
            },
            CessionTarget::External { name } => RecipientSnapshot::External {
                name: name.to_string(),
            },
        };

        let context = CessionContext {
            donor: input.donor.representative().clone(),
            donor_mandate_active: input.donor_mandate_active,
            donor_transferable: transferable_capacity(&capacity, policy),
            recipient,
            hours: input.hours,
            effective_date: input.effective_date,
            today: input.today,
            reason: input.reason.to_string(),
        };
        let report = self.gate.evaluate(&context)?;

        Ok(CessionDecision {
            source: SourceBreakdown {
                from_base: drawn.from(CreditSource::Base),
                from_carried: drawn.from(CreditSource::CarriedOver),
            },
            report,
        })
    }
}
