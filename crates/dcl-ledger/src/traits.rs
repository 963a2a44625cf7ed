use dcl_types::{CreditMonth, Representative, RepresentativeId};

use crate::error::LedgerError;
use crate::period::CreditPeriod;
use crate::records::{ApprovalUpdate, CessionId, CessionRecord, UsageId, UsageRecord};

/// Everything one ledger operation writes, committed all or nothing.
///
/// Each period carries the version it was read at; a period read as absent
/// has version 0. The store rejects the whole set if any version is stale.
#[derive(Clone, Debug, Default)]
pub struct ChangeSet {
    pub periods: Vec<CreditPeriod>,
    pub usage_records: Vec<UsageRecord>,
    pub approvals: Vec<ApprovalUpdate>,
    pub cessions: Vec<CessionRecord>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
            && self.usage_records.is_empty()
            && self.approvals.is_empty()
            && self.cessions.is_empty()
    }

    pub fn touches(&self, representative: &RepresentativeId) -> bool {
        self.periods
            .iter()
            .any(|p| p.representative() == representative)
            || self
                .usage_records
                .iter()
                .any(|u| u.representative == *representative)
            || self.cessions.iter().any(|c| c.involves(representative))
    }
}

/// What a successful commit stored, with store-assigned fields filled in.
#[derive(Clone, Debug, Default)]
pub struct CommitReceipt {
    pub periods: Vec<CreditPeriod>,
    pub cessions: Vec<CessionRecord>,
}

/// Persistence boundary of the ledger.
///
/// Implementations must:
/// - apply a [`ChangeSet`] atomically, so a failure leaves no write behind;
/// - check period versions and the invariants of every written period
///   under the same lock as the writes;
/// - never delete or edit usage and cession records, apart from the
///   approval state of a usage record.
pub trait CreditStore: Send + Sync {
    fn representative(&self, id: &RepresentativeId) -> Result<Option<Representative>, LedgerError>;

    fn representatives(&self) -> Result<Vec<Representative>, LedgerError>;

    fn upsert_representative(&self, representative: Representative) -> Result<(), LedgerError>;

    fn period(
        &self,
        id: &RepresentativeId,
        month: CreditMonth,
    ) -> Result<Option<CreditPeriod>, LedgerError>;

    /// Most recent stored period strictly before `month`.
    fn latest_period_before(
        &self,
        id: &RepresentativeId,
        month: CreditMonth,
    ) -> Result<Option<CreditPeriod>, LedgerError>;

    /// All stored periods of one representative, oldest first.
    fn periods(&self, id: &RepresentativeId) -> Result<Vec<CreditPeriod>, LedgerError>;

    fn all_periods(&self) -> Result<Vec<CreditPeriod>, LedgerError>;

    fn usage_record(&self, id: &UsageId) -> Result<Option<UsageRecord>, LedgerError>;

    /// Usage records charged to one period, in commit order.
    fn usage_records(
        &self,
        id: &RepresentativeId,
        month: CreditMonth,
    ) -> Result<Vec<UsageRecord>, LedgerError>;

    fn all_usage(&self) -> Result<Vec<UsageRecord>, LedgerError>;

    fn cession(&self, id: &CessionId) -> Result<Option<CessionRecord>, LedgerError>;

    /// Cessions where `id` is donor or beneficiary, ordered by `seq`.
    fn cessions_for(&self, id: &RepresentativeId) -> Result<Vec<CessionRecord>, LedgerError>;

    fn all_cessions(&self) -> Result<Vec<CessionRecord>, LedgerError>;

    fn commit(&self, changes: ChangeSet) -> Result<CommitReceipt, LedgerError>;
}
