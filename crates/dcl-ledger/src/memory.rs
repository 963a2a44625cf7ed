use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use dcl_types::{CreditMonth, Representative, RepresentativeId};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::period::{CreditPeriod, PeriodKey};
use crate::records::{CessionId, CessionRecord, UsageId, UsageRecord};
use crate::traits::{ChangeSet, CommitReceipt, CreditStore};

/// In-memory credit store for tests, the CLI state file, and embedding.
pub struct InMemoryLedger {
    inner: RwLock<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    representatives: BTreeMap<RepresentativeId, Representative>,
    periods: BTreeMap<PeriodKey, CreditPeriod>,
    usage: Vec<UsageRecord>,
    usage_index: HashMap<UsageId, usize>,
    cessions: Vec<CessionRecord>,
    cession_index: HashMap<CessionId, usize>,
    next_seq: u64,
    faults: HashSet<RepresentativeId>,
}

/// Serializable image of the whole store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub representatives: Vec<Representative>,
    pub periods: Vec<CreditPeriod>,
    pub usage: Vec<UsageRecord>,
    pub cessions: Vec<CessionRecord>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LedgerState {
                next_seq: 1,
                ..Default::default()
            }),
        }
    }

    /// Make the next commit that writes a period of `representative` fail
    /// with a storage error, after any earlier period of the same change set
    /// has been staged.
    pub fn inject_fault(&self, representative: &RepresentativeId) -> Result<(), LedgerError> {
        self.write_state()?.faults.insert(representative.clone());
        Ok(())
    }

    pub fn snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        let state = self.read_state()?;
        Ok(LedgerSnapshot {
            representatives: state.representatives.values().cloned().collect(),
            periods: state.periods.values().cloned().collect(),
            usage: state.usage.clone(),
            cessions: state.cessions.clone(),
        })
    }

    /// Rebuild a store from a snapshot, rejecting duplicate ids and periods
    /// that break their invariants.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self, LedgerError> {
        let mut state = LedgerState {
            next_seq: 1,
            ..Default::default()
        };

        for representative in snapshot.representatives {
            state
                .representatives
                .insert(representative.id.clone(), representative);
        }

        for period in snapshot.periods {
            period.check_invariants()?;
            let key = period.key();
            if state.periods.insert(key.clone(), period).is_some() {
                return Err(LedgerError::DuplicateRecord(key.to_string()));
            }
        }

        for record in snapshot.usage {
            if state.usage_index.contains_key(&record.id) {
                return Err(LedgerError::DuplicateRecord(record.id.to_string()));
            }
            state.usage_index.insert(record.id, state.usage.len());
            state.usage.push(record);
        }

        let mut cessions = snapshot.cessions;
        cessions.sort_by_key(|c| c.seq);
        for record in cessions {
            if state.cession_index.contains_key(&record.id) {
                return Err(LedgerError::DuplicateRecord(record.id.to_string()));
            }
            state.next_seq = state.next_seq.max(record.seq + 1);
            state.cession_index.insert(record.id, state.cessions.len());
            state.cessions.push(record);
        }

        Ok(Self {
            inner: RwLock::new(state),
        })
    }

    /// Replace the whole store with `snapshot`. Injected faults are kept.
    pub fn restore(&self, snapshot: LedgerSnapshot) -> Result<(), LedgerError> {
        let rebuilt = Self::from_snapshot(snapshot)?
            .inner
            .into_inner()
            .map_err(|_| LedgerError::Storage("ledger lock poisoned".into()))?;
        let mut state = self.write_state()?;
        let faults = std::mem::take(&mut state.faults);
        *state = LedgerState { faults, ..rebuilt };
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, LedgerError> {
        serde_json::to_string_pretty(&self.snapshot()?)
            .map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        let snapshot: LedgerSnapshot =
            serde_json::from_str(json).map_err(|e| LedgerError::Serialization(e.to_string()))?;
        Self::from_snapshot(snapshot)
    }

    /// Write the snapshot to `path` as JSON.
    pub fn save(&self, path: &Path) -> Result<(), LedgerError> {
        let json = self.to_json()?;
        std::fs::write(path, json)
            .map_err(|e| LedgerError::Storage(format!("writing {}: {e}", path.display())))
    }

    /// Load a store from a JSON state file; a missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        match std::fs::read_to_string(path) {
            Ok(json) => Self::from_json(&json),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(LedgerError::Storage(format!(
                "reading {}: {e}",
                path.display()
            ))),
        }
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, LedgerState>, LedgerError> {
        self.inner
            .read()
            .map_err(|_| LedgerError::Storage("ledger read lock poisoned".into()))
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, LedgerState>, LedgerError> {
        self.inner
            .write()
            .map_err(|_| LedgerError::Storage("ledger write lock poisoned".into()))
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl CreditStore for InMemoryLedger {
    fn representative(&self, id: &RepresentativeId) -> Result<Option<Representative>, LedgerError> {
        Ok(self.read_state()?.representatives.get(id).cloned())
    }

    fn representatives(&self) -> Result<Vec<Representative>, LedgerError> {
        Ok(self.read_state()?.representatives.values().cloned().collect())
    }

    fn upsert_representative(&self, representative: Representative) -> Result<(), LedgerError> {
        self.write_state()?
            .representatives
            .insert(representative.id.clone(), representative);
        Ok(())
    }

    fn period(
        &self,
        id: &RepresentativeId,
        month: CreditMonth,
    ) -> Result<Option<CreditPeriod>, LedgerError> {
        let key = PeriodKey {
            representative: id.clone(),
            month,
        };
        Ok(self.read_state()?.periods.get(&key).cloned())
    }

    fn latest_period_before(
        &self,
        id: &RepresentativeId,
        month: CreditMonth,
    ) -> Result<Option<CreditPeriod>, LedgerError> {
        let key = PeriodKey {
            representative: id.clone(),
            month,
        };
        let state = self.read_state()?;
        Ok(state
            .periods
            .range(..key)
            .next_back()
            .filter(|(k, _)| k.representative == *id)
            .map(|(_, p)| p.clone()))
    }

    fn periods(&self, id: &RepresentativeId) -> Result<Vec<CreditPeriod>, LedgerError> {
        Ok(self
            .read_state()?
            .periods
            .values()
            .filter(|p| p.representative() == id)
            .cloned()
            .collect())
    }

    fn all_periods(&self) -> Result<Vec<CreditPeriod>, LedgerError> {
        Ok(self.read_state()?.periods.values().cloned().collect())
    }

    fn usage_record(&self, id: &UsageId) -> Result<Option<UsageRecord>, LedgerError> {
        let state = self.read_state()?;
        Ok(state
            .usage_index
            .get(id)
            .and_then(|&i| state.usage.get(i))
            .cloned())
    }

    fn usage_records(
        &self,
        id: &RepresentativeId,
        month: CreditMonth,
    ) -> Result<Vec<UsageRecord>, LedgerError> {
        Ok(self
            .read_state()?
            .usage
            .iter()
            .filter(|u| u.representative == *id && u.month == month)
            .cloned()
            .collect())
    }

    fn all_usage(&self) -> Result<Vec<UsageRecord>, LedgerError> {
        Ok(self.read_state()?.usage.clone())
    }

    fn cession(&self, id: &CessionId) -> Result<Option<CessionRecord>, LedgerError> {
        let state = self.read_state()?;
        Ok(state
            .cession_index
            .get(id)
            .and_then(|&i| state.cessions.get(i))
            .cloned())
    }

    fn cessions_for(&self, id: &RepresentativeId) -> Result<Vec<CessionRecord>, LedgerError> {
        Ok(self
            .read_state()?
            .cessions
            .iter()
            .filter(|c| c.involves(id))
            .cloned()
            .collect())
    }

    fn all_cessions(&self) -> Result<Vec<CessionRecord>, LedgerError> {
        Ok(self.read_state()?.cessions.clone())
    }

    fn commit(&self, changes: ChangeSet) -> Result<CommitReceipt, LedgerError> {
        let mut state = self.write_state()?;

        // Stage everything first; `state` is only touched once nothing can fail.
        let mut staged: BTreeMap<PeriodKey, CreditPeriod> = BTreeMap::new();
        for period in changes.periods {
            if state.faults.remove(period.representative()) {
                tracing::warn!(period = %period.key(), "injected storage fault");
                return Err(LedgerError::Storage(format!(
                    "injected fault writing {}",
                    period.key()
                )));
            }

            let key = period.key();
            let current = staged
                .get(&key)
                .or_else(|| state.periods.get(&key))
                .map(CreditPeriod::version);
            match current {
                None if period.version() == 0 => {}
                Some(v) if v == period.version() => {}
                _ => return Err(LedgerError::Conflict(key.to_string())),
            }
            period.check_invariants()?;

            let mut next = period;
            next.version += 1;
            staged.insert(key, next);
        }

        let mut new_usage: Vec<UsageRecord> = Vec::with_capacity(changes.usage_records.len());
        for record in changes.usage_records {
            if state.usage_index.contains_key(&record.id)
                || new_usage.iter().any(|u| u.id == record.id)
            {
                return Err(LedgerError::DuplicateRecord(record.id.to_string()));
            }
            new_usage.push(record);
        }

        let mut approvals = Vec::with_capacity(changes.approvals.len());
        for update in changes.approvals {
            let index = *state
                .usage_index
                .get(&update.id)
                .ok_or(LedgerError::UsageNotFound(update.id))?;
            let current = state.usage[index].approval;
            if current != update.from {
                return Err(LedgerError::Conflict(format!(
                    "usage {} is {current}, expected {}",
                    update.id, update.from
                )));
            }
            approvals.push((index, update.to));
        }

        let mut new_cessions = Vec::with_capacity(changes.cessions.len());
        let mut seq = state.next_seq;
        for mut record in changes.cessions {
            if state.cession_index.contains_key(&record.id)
                || new_cessions.iter().any(|c: &CessionRecord| c.id == record.id)
            {
                return Err(LedgerError::DuplicateRecord(record.id.to_string()));
            }
            record.seq = seq;
            seq += 1;
            new_cessions.push(record);
        }

        // Apply.
        let receipt = CommitReceipt {
            periods: staged.values().cloned().collect(),
            cessions: new_cessions.clone(),
        };
        state.periods.extend(staged);
        for record in new_usage {
            let index = state.usage.len();
            state.usage_index.insert(record.id, index);
            state.usage.push(record);
        }
        for (index, to) in approvals {
            state.usage[index].approval = to;
        }
        for record in new_cessions {
            let index = state.cessions.len();
            state.cession_index.insert(record.id, index);
            state.cessions.push(record);
        }
        state.next_seq = seq;

        Ok(receipt)
    }
}
