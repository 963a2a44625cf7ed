use std::sync::Arc;

use chrono::NaiveDate;
use dcl_compliance::{ComplianceCode, ComplianceGate, Finding, PolicyConfig, UsageContext};
use dcl_types::{Clock, CreditMonth, Representative, RepresentativeId, SystemClock};
use serde::{Deserialize, Serialize};

use crate::balance::{compute_balance, Balance};
use crate::cession::{CessionEngine, CessionInput, CessionTarget, SourceBreakdown};
use crate::config::LedgerConfig;
use crate::consumption::consume;
use crate::error::LedgerError;
use crate::period::CreditPeriod;
use crate::records::{
    ApprovalState, ApprovalUpdate, Beneficiary, CessionId, CessionRecord, UsageId, UsageRecord,
};
use crate::requests::{BeneficiaryRef, CorrectUsage, CreateCession, DeclareUsage, ReverseCession};
use crate::rollover::open_period;
use crate::traits::{ChangeSet, CommitReceipt, CreditStore};
use crate::validation::{AuditReport, InvariantAuditor};

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// A period together with its computed balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceView {
    pub period: CreditPeriod,
    pub balance: Balance,
}

impl BalanceView {
    pub fn of(period: CreditPeriod) -> Self {
        let balance = compute_balance(&period);
        Self { period, balance }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UsageOutcome {
    Committed {
        record: UsageRecord,
        balance: BalanceView,
    },
    Rejected {
        violations: Vec<Finding>,
    },
}

impl UsageOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CessionOutcome {
    Committed {
        record: CessionRecord,
        donor_balance: BalanceView,
        /// `None` for external beneficiaries.
        beneficiary_balance: Option<BalanceView>,
    },
    Rejected {
        violations: Vec<Finding>,
        warnings: Vec<Finding>,
    },
    /// Only soft warnings stand in the way; resubmit with the override flag.
    ConfirmationRequired {
        warnings: Vec<Finding>,
    },
}

impl CessionOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    pub fn violation_codes(&self) -> Vec<ComplianceCode> {
        match self {
            Self::Rejected { violations, .. } => violations.iter().map(|f| f.code).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloverReport {
    pub month: CreditMonth,
    pub opened: Vec<RepresentativeId>,
    pub already_open: usize,
}

// ---------------------------------------------------------------------------
// DelegationLedger
// ---------------------------------------------------------------------------

/// The ledger's request surface: every read and write of credit goes
/// through here.
///
/// Each operation reads one snapshot, validates it, and commits a single
/// [`ChangeSet`]. A stale snapshot is re-read and the operation replayed up
/// to `max_commit_retries` times before the conflict reaches the caller.
pub struct DelegationLedger<S: CreditStore> {
    store: S,
    config: LedgerConfig,
    clock: Arc<dyn Clock>,
    usage_gate: ComplianceGate<UsageContext>,
    cessions: CessionEngine,
}

impl<S: CreditStore> DelegationLedger<S> {
    pub fn new(store: S, config: LedgerConfig) -> Result<Self, LedgerError> {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: S,
        config: LedgerConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LedgerError> {
        config.validate()?;
        Ok(Self {
            usage_gate: ComplianceGate::for_usage(config.policy.clone()),
            cessions: CessionEngine::new(config.policy.clone()),
            store,
            config,
            clock,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.config.policy
    }

    // ---- representatives ----

    /// Create or update a representative.
    pub fn designate(&self, representative: Representative) -> Result<Representative, LedgerError> {
        if representative.name.trim().is_empty() {
            return Err(LedgerError::InvalidRepresentative(format!(
                "{} has no name",
                representative.id
            )));
        }
        if representative
            .mandate_end
            .is_some_and(|end| end < representative.mandate_start)
        {
            return Err(LedgerError::InvalidRepresentative(format!(
                "mandate of {} ends before it starts",
                representative.id
            )));
        }

        self.store.upsert_representative(representative.clone())?;
        tracing::info!(
            representative = %representative.id,
            class = %representative.class,
            substitute = representative.is_substitute(),
            "representative designated"
        );
        Ok(representative)
    }

    /// Close the mandate on `end`. Later months open with no base credit.
    pub fn archive(
        &self,
        id: &RepresentativeId,
        end: NaiveDate,
    ) -> Result<Representative, LedgerError> {
        let mut representative = self.representative(id)?;
        representative.mandate_end = Some(match representative.mandate_end {
            Some(current) if current < end => current,
            _ => end,
        });
        representative.archived = true;
        self.store.upsert_representative(representative.clone())?;
        tracing::info!(representative = %id, %end, "representative archived");
        Ok(representative)
    }

    pub fn representative(&self, id: &RepresentativeId) -> Result<Representative, LedgerError> {
        self.store
            .representative(id)?
            .ok_or_else(|| LedgerError::RepresentativeNotFound(id.clone()))
    }

    pub fn representatives(&self) -> Result<Vec<Representative>, LedgerError> {
        self.store.representatives()
    }

    // ---- reads ----

    /// Current period of `id` for `month` and its balance.
    ///
    /// Opens the period (and any gap before it) on first access. Months
    /// outside the mandate with nothing recorded are reported as not open.
    pub fn delegate_balance(
        &self,
        id: &RepresentativeId,
        month: CreditMonth,
    ) -> Result<BalanceView, LedgerError> {
        let representative = self.representative(id)?;
        if let Some(period) = self.store.period(id, month)? {
            return Ok(BalanceView::of(period));
        }
        if !representative.active_during(&month) {
            return Err(LedgerError::PeriodNotOpen {
                representative: id.clone(),
                month,
            });
        }
        self.with_retries(|| self.ensure_period(&representative, month))
            .map(BalanceView::of)
    }

    /// Cessions given or received by `id`, in commit order.
    pub fn cession_history(&self, id: &RepresentativeId) -> Result<Vec<CessionRecord>, LedgerError> {
        self.representative(id)?;
        self.store.cessions_for(id)
    }

    pub fn usage_history(
        &self,
        id: &RepresentativeId,
        month: CreditMonth,
    ) -> Result<Vec<UsageRecord>, LedgerError> {
        self.representative(id)?;
        self.store.usage_records(id, month)
    }

    pub fn audit(&self) -> Result<AuditReport, LedgerError> {
        InvariantAuditor::audit(&self.store)
    }

    // ---- usage ----

    pub fn declare_usage(&self, request: &DeclareUsage) -> Result<UsageOutcome, LedgerError> {
        let representative = self.representative(&request.representative)?;
        let month = CreditMonth::from_date(request.date);

        self.with_retries(|| {
            let period = self.ensure_period(&representative, month)?;
            let allocation = consume(&period, request.hours);

            let context = UsageContext {
                representative: representative.id.clone(),
                mandate_active: representative.mandate_covers(request.date),
                hours: request.hours,
                date: request.date,
                projected_overage: allocation.overage,
            };
            let report = self.usage_gate.evaluate(&context)?;
            if report.is_rejected() {
                tracing::warn!(
                    representative = %representative.id,
                    codes = ?report.violation_codes(),
                    "usage declaration rejected"
                );
                return Ok(UsageOutcome::Rejected {
                    violations: report.violations,
                });
            }

            let record = UsageRecord {
                id: UsageId::new(),
                representative: representative.id.clone(),
                date: request.date,
                month,
                hours: request.hours,
                category: request.category,
                justification: request.justification.clone(),
                approval: request.category.initial_approval(),
                allocation,
                correction_of: None,
                recorded_at: self.clock.now(),
            };

            let mut next = period;
            next.apply_usage(&allocation);
            let receipt = self.store.commit(ChangeSet {
                periods: vec![next],
                usage_records: vec![record.clone()],
                ..Default::default()
            })?;

            if record.requires_authorization() {
                tracing::warn!(
                    representative = %record.representative,
                    usage = %record.id,
                    overage = %allocation.overage,
                    "usage exceeds every source; employer authorization required"
                );
            }
            tracing::info!(
                representative = %record.representative,
                usage = %record.id,
                hours = %record.hours,
                "usage committed"
            );

            Ok(UsageOutcome::Committed {
                balance: period_view(&receipt, &record.representative)?,
                record,
            })
        })
    }

    /// Move a pending usage declaration to approved.
    pub fn approve_usage(&self, id: &UsageId) -> Result<UsageRecord, LedgerError> {
        let mut record = self
            .store
            .usage_record(id)?
            .ok_or(LedgerError::UsageNotFound(*id))?;
        if record.approval != ApprovalState::Pending {
            return Err(LedgerError::InvalidTransition {
                from: record.approval,
                to: ApprovalState::Approved,
            });
        }

        self.store.commit(ChangeSet {
            approvals: vec![ApprovalUpdate {
                id: *id,
                from: ApprovalState::Pending,
                to: ApprovalState::Approved,
            }],
            ..Default::default()
        })?;
        record.approval = ApprovalState::Approved;
        tracing::info!(usage = %id, "usage approved");
        Ok(record)
    }

    /// Append a compensating record that releases `id`'s allocation.
    pub fn correct_usage(
        &self,
        id: &UsageId,
        request: &CorrectUsage,
    ) -> Result<UsageOutcome, LedgerError> {
        let original = self
            .store
            .usage_record(id)?
            .ok_or(LedgerError::UsageNotFound(*id))?;
        let representative = self.representative(&original.representative)?;

        self.with_retries(|| {
            let mut violations = Vec::new();
            if request.reason.trim().is_empty() {
                violations.push(Finding::new(
                    ComplianceCode::MissingReason,
                    "a correction requires a reason",
                ));
            }
            if original.is_correction() {
                violations.push(Finding::new(
                    ComplianceCode::AlreadyCorrected,
                    format!("{id} is itself a correction"),
                ));
            } else if self
                .store
                .usage_records(&original.representative, original.month)?
                .iter()
                .any(|u| u.correction_of == Some(*id))
            {
                violations.push(Finding::new(
                    ComplianceCode::AlreadyCorrected,
                    format!("{id} has already been corrected"),
                ));
            }
            if !violations.is_empty() {
                tracing::warn!(usage = %id, "usage correction rejected");
                return Ok(UsageOutcome::Rejected { violations });
            }

            let period = self.ensure_period(&representative, original.month)?;
            let record = UsageRecord {
                id: UsageId::new(),
                representative: original.representative.clone(),
                date: original.date,
                month: original.month,
                hours: -original.hours,
                category: original.category,
                justification: Some(request.reason.clone()),
                approval: ApprovalState::Acknowledged,
                allocation: original.allocation.negated(),
                correction_of: Some(*id),
                recorded_at: self.clock.now(),
            };

            let mut next = period;
            next.release_usage(&original.allocation);
            let receipt = self.store.commit(ChangeSet {
                periods: vec![next],
                usage_records: vec![record.clone()],
                ..Default::default()
            })?;
            tracing::info!(usage = %id, correction = %record.id, "usage corrected");

            Ok(UsageOutcome::Committed {
                balance: period_view(&receipt, &record.representative)?,
                record,
            })
        })
    }

    // ---- cessions ----

    pub fn create_cession(&self, request: &CreateCession) -> Result<CessionOutcome, LedgerError> {
        let donor = self.representative(&request.donor)?;
        let month = CreditMonth::from_date(request.effective_date);
        let today = self.clock.today();

        self.with_retries(|| {
            let donor_period = self.ensure_period(&donor, month)?;
            let mut violations = Vec::new();

            let (beneficiary, beneficiary_period, mandate_active) = match &request.beneficiary {
                BeneficiaryRef::Internal { id } if *id == donor.id => (
                    Beneficiary::Internal {
                        id: id.clone(),
                        name: donor.name.clone(),
                    },
                    Some(donor_period.clone()),
                    donor.mandate_covers(request.effective_date),
                ),
                BeneficiaryRef::Internal { id } => match self.store.representative(id)? {
                    Some(rep) => (
                        Beneficiary::Internal {
                            id: id.clone(),
                            name: rep.name.clone(),
                        },
                        Some(self.ensure_period(&rep, month)?),
                        rep.mandate_covers(request.effective_date),
                    ),
                    None => {
                        violations.push(Finding::new(
                            ComplianceCode::UnknownRepresentative,
                            format!("{id} is not a designated representative"),
                        ));
                        (
                            Beneficiary::Internal {
                                id: id.clone(),
                                name: id.to_string(),
                            },
                            None,
                            false,
                        )
                    }
                },
                BeneficiaryRef::External { name } => {
                    (Beneficiary::External { name: name.clone() }, None, false)
                }
            };

            let target = match &beneficiary_period {
                Some(period) => CessionTarget::Internal {
                    period,
                    mandate_active,
                },
                None => CessionTarget::External {
                    name: beneficiary.name(),
                },
            };
            let decision = self.cessions.cede(&CessionInput {
                donor: &donor_period,
                donor_mandate_active: donor.mandate_covers(request.effective_date),
                target,
                hours: request.hours,
                effective_date: request.effective_date,
                today,
                reason: &request.reason,
            })?;

            violations.extend(decision.report.violations);
            let warnings = decision.report.warnings;
            if !violations.is_empty() {
                tracing::warn!(
                    donor = %donor.id,
                    codes = ?violations.iter().map(|f| f.code).collect::<Vec<_>>(),
                    "cession rejected"
                );
                return Ok(CessionOutcome::Rejected {
                    violations,
                    warnings,
                });
            }
            if !warnings.is_empty() && !request.force_override_notice {
                return Ok(CessionOutcome::ConfirmationRequired { warnings });
            }
            let notice_overridden = !warnings.is_empty();
            if notice_overridden {
                tracing::warn!(donor = %donor.id, "notice shortfall overridden");
            }

            let record = CessionRecord {
                id: CessionId::new(),
                seq: 0,
                donor: donor.id.clone(),
                beneficiary: beneficiary.clone(),
                hours: request.hours,
                effective_date: request.effective_date,
                month,
                reason: request.reason.trim().to_string(),
                created_by: request.created_by.clone(),
                created_at: self.clock.now(),
                source: decision.source,
                notice_overridden,
                reverses: None,
            };

            let mut donor_next = donor_period;
            donor_next.apply_cession_out(&decision.source);
            let mut periods = vec![donor_next];
            if let Some(mut next) = beneficiary_period {
                next.apply_cession_in(request.hours);
                periods.push(next);
            }

            let receipt = self.store.commit(ChangeSet {
                periods,
                cessions: vec![record],
                ..Default::default()
            })?;
            self.cession_committed(receipt, &beneficiary)
        })
    }

    /// Undo a cession with an inverse record. The original is never touched.
    pub fn reverse_cession(
        &self,
        id: &CessionId,
        request: &ReverseCession,
    ) -> Result<CessionOutcome, LedgerError> {
        let original = self
            .store
            .cession(id)?
            .ok_or(LedgerError::CessionNotFound(*id))?;
        let donor = self.representative(&original.donor)?;
        let beneficiary = match original.beneficiary.id() {
            Some(rep) => Some(self.representative(rep)?),
            None => None,
        };

        self.with_retries(|| {
            let mut violations = Vec::new();
            if request.reason.trim().is_empty() {
                violations.push(Finding::new(
                    ComplianceCode::MissingReason,
                    "a reversal requires a reason",
                ));
            }
            if original.is_reversal() {
                violations.push(Finding::new(
                    ComplianceCode::AlreadyReversed,
                    format!("{id} is itself a reversal"),
                ));
            } else if self
                .store
                .cessions_for(&original.donor)?
                .iter()
                .any(|c| c.reverses == Some(*id))
            {
                violations.push(Finding::new(
                    ComplianceCode::AlreadyReversed,
                    format!("{id} has already been reversed"),
                ));
            }

            let donor_period = self.ensure_period(&donor, original.month)?;
            let beneficiary_period = match &beneficiary {
                Some(rep) => Some(self.ensure_period(rep, original.month)?),
                None => None,
            };
            let reversed = violations
                .iter()
                .any(|f| f.code == ComplianceCode::AlreadyReversed);
            if let Some(period) = beneficiary_period.as_ref().filter(|_| !reversed) {
                let left = compute_balance(period).by_capacity.received;
                if left < original.hours {
                    violations.push(Finding::new(
                        ComplianceCode::ReceivedAlreadyConsumed,
                        format!(
                            "{} has only {left} of the {} received left",
                            period.representative(),
                            original.hours
                        ),
                    ));
                }
            }

            if !violations.is_empty() {
                tracing::warn!(cession = %id, "cession reversal rejected");
                return Ok(CessionOutcome::Rejected {
                    violations,
                    warnings: Vec::new(),
                });
            }

            let record = CessionRecord {
                id: CessionId::new(),
                seq: 0,
                donor: original.donor.clone(),
                beneficiary: original.beneficiary.clone(),
                hours: -original.hours,
                effective_date: original.effective_date,
                month: original.month,
                reason: request.reason.trim().to_string(),
                created_by: request.created_by.clone(),
                created_at: self.clock.now(),
                source: SourceBreakdown {
                    from_base: -original.source.from_base,
                    from_carried: -original.source.from_carried,
                },
                notice_overridden: false,
                reverses: Some(*id),
            };

            let mut donor_next = donor_period;
            donor_next.release_cession_out(&original.source);
            let mut periods = vec![donor_next];
            if let Some(mut next) = beneficiary_period {
                next.release_cession_in(original.hours);
                periods.push(next);
            }

            let receipt = self.store.commit(ChangeSet {
                periods,
                cessions: vec![record],
                ..Default::default()
            })?;
            self.cession_committed(receipt, &original.beneficiary)
        })
    }

    // ---- maintenance ----

    /// Open `month` for every representative whose mandate touches it.
    pub fn rollover(&self, month: CreditMonth) -> Result<RolloverReport, LedgerError> {
        let mut report = RolloverReport {
            month,
            opened: Vec::new(),
            already_open: 0,
        };
        for representative in self.store.representatives()? {
            if !representative.active_during(&month) {
                continue;
            }
            if self.store.period(&representative.id, month)?.is_some() {
                report.already_open += 1;
                continue;
            }
            self.with_retries(|| self.ensure_period(&representative, month))?;
            report.opened.push(representative.id);
        }
        tracing::info!(
            %month,
            opened = report.opened.len(),
            already_open = report.already_open,
            "rollover complete"
        );
        Ok(report)
    }

    // ---- internals ----

    /// The stored period for `month`, opening it and every missing month
    /// since the representative's last period in one commit.
    ///
    /// Months past the open horizon are refused. A month the mandate does
    /// not touch is returned unstored with no credit: every write against
    /// it fails the mandate rule, so nothing is persisted for it.
    fn ensure_period(
        &self,
        representative: &Representative,
        month: CreditMonth,
    ) -> Result<CreditPeriod, LedgerError> {
        if let Some(period) = self.store.period(&representative.id, month)? {
            return Ok(period);
        }

        let limit = self.config.max_open_ahead_months;
        let current = CreditMonth::from_date(self.clock.today());
        if current.months_until(&month) > i64::from(limit) {
            tracing::warn!(
                representative = %representative.id,
                %month,
                limit,
                "period beyond the open horizon refused"
            );
            return Err(LedgerError::BeyondHorizon { month, limit });
        }
        if !representative.active_during(&month) {
            return Ok(open_period(representative, month, None, &self.config));
        }

        let mut previous = self.store.latest_period_before(&representative.id, month)?;
        let mut cursor = previous.as_ref().map_or(month, |p| p.month().next());
        let mut opened = Vec::new();
        loop {
            let period = open_period(representative, cursor, previous.as_ref(), &self.config);
            opened.push(period.clone());
            previous = Some(period);
            if cursor >= month {
                break;
            }
            cursor = cursor.next();
        }

        let receipt = self.store.commit(ChangeSet {
            periods: opened,
            ..Default::default()
        })?;
        receipt
            .periods
            .into_iter()
            .find(|p| p.month() == month)
            .ok_or_else(|| LedgerError::PeriodNotOpen {
                representative: representative.id.clone(),
                month,
            })
    }

    fn cession_committed(
        &self,
        receipt: CommitReceipt,
        beneficiary: &Beneficiary,
    ) -> Result<CessionOutcome, LedgerError> {
        let record = receipt
            .cessions
            .first()
            .cloned()
            .ok_or_else(|| LedgerError::Storage("commit returned no cession".into()))?;
        let donor_balance = period_view(&receipt, &record.donor)?;
        let beneficiary_balance = match beneficiary.id() {
            Some(id) => Some(period_view(&receipt, id)?),
            None => None,
        };

        tracing::info!(
            cession = %record.id,
            seq = record.seq,
            donor = %record.donor,
            beneficiary = beneficiary.name(),
            hours = %record.hours,
            reversal = record.is_reversal(),
            "cession committed"
        );
        Ok(CessionOutcome::Committed {
            record,
            donor_balance,
            beneficiary_balance,
        })
    }

    /// Run `op`, replaying it while it fails with a retryable conflict.
    fn with_retries<T>(
        &self,
        mut op: impl FnMut() -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let attempts = self.config.max_commit_retries.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Err(e) if e.is_retryable() && attempt < attempts => {
                    tracing::debug!(attempt, error = %e, "stale snapshot, retrying");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

fn period_view(receipt: &CommitReceipt, id: &RepresentativeId) -> Result<BalanceView, LedgerError> {
    receipt
        .periods
        .iter()
        .find(|p| p.representative() == id)
        .cloned()
        .map(BalanceView::of)
        .ok_or_else(|| LedgerError::Storage(format!("commit returned no period for {id}")))
}
