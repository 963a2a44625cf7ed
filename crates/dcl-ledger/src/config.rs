use dcl_compliance::PolicyConfig;
use dcl_types::{Hours, Representative, RepresentativeClass};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Ledger-wide settings supplied by the deployment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub policy: PolicyConfig,
    /// Company headcount used to look up base credits.
    pub company_headcount: u32,
    pub base_hours: BaseHoursTable,
    /// Attempts for a commit that keeps hitting stale versions.
    pub max_commit_retries: u32,
    /// How far past the current month a request may open a period.
    pub max_open_ahead_months: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            policy: PolicyConfig::default(),
            company_headcount: 250,
            base_hours: BaseHoursTable::default(),
            max_commit_retries: 3,
            max_open_ahead_months: 12,
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<(), LedgerError> {
        self.policy.validate()?;
        if self.max_commit_retries == 0 {
            return Err(LedgerError::Config(
                "max_commit_retries must be at least 1".into(),
            ));
        }
        if self.base_hours.0.iter().any(|e| e.hours.is_negative()) {
            return Err(LedgerError::Config(
                "base hours must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Monthly base grant of `representative`. Substitutes get none.
    pub fn base_credit(&self, representative: &Representative) -> Hours {
        if representative.is_substitute() {
            return Hours::ZERO;
        }
        self.base_hours
            .monthly_base(representative.class, self.company_headcount)
    }
}

/// One threshold of the headcount lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseHoursEntry {
    pub class: RepresentativeClass,
    pub min_headcount: u32,
    pub hours: Hours,
}

/// Monthly base hours per representative class and company headcount.
///
/// For a class, the entry with the highest `min_headcount` not above the
/// headcount wins; no matching entry means no base credit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseHoursTable(pub Vec<BaseHoursEntry>);

impl BaseHoursTable {
    pub fn monthly_base(&self, class: RepresentativeClass, headcount: u32) -> Hours {
        self.0
            .iter()
            .filter(|e| e.class == class && e.min_headcount <= headcount)
            .max_by_key(|e| e.min_headcount)
            .map(|e| e.hours)
            .unwrap_or(Hours::ZERO)
    }
}

impl Default for BaseHoursTable {
    fn default() -> Self {
        use RepresentativeClass::*;

        let entry = |class, min_headcount, hours| BaseHoursEntry {
            class,
            min_headcount,
            hours: Hours::from_hours(hours),
        };
        Self(vec![
            entry(CouncilMember, 11, 10),
            entry(CouncilMember, 50, 18),
            entry(CouncilMember, 75, 19),
            entry(CouncilMember, 100, 21),
            entry(CouncilMember, 200, 22),
            entry(CouncilMember, 500, 24),
            entry(UnionDelegate, 50, 12),
            entry(UnionDelegate, 151, 18),
            entry(UnionDelegate, 500, 24),
            entry(ProximityRepresentative, 50, 5),
            entry(HealthCommitteeMember, 300, 5),
            entry(HealthCommitteeMember, 500, 10),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use dcl_types::{MembershipStatus, RepresentativeId};

    fn representative(class: RepresentativeClass, status: MembershipStatus) -> Representative {
        Representative {
            id: RepresentativeId::new("EMP-1").unwrap(),
            name: "Ana Moreau".into(),
            class,
            status,
            mandate_start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            mandate_end: None,
            archived: false,
        }
    }

    #[test]
    fn lookup_picks_highest_matching_threshold() {
        let table = BaseHoursTable::default();
        assert_eq!(
            table.monthly_base(RepresentativeClass::CouncilMember, 250),
            Hours::from_hours(22)
        );
        assert_eq!(
            table.monthly_base(RepresentativeClass::UnionDelegate, 151),
            Hours::from_hours(18)
        );
        assert_eq!(
            table.monthly_base(RepresentativeClass::UnionDelegate, 20),
            Hours::ZERO
        );
    }

    #[test]
    fn substitutes_get_no_base() {
        let config = LedgerConfig::default();
        let titular = representative(RepresentativeClass::CouncilMember, MembershipStatus::Titular);
        let substitute =
            representative(RepresentativeClass::CouncilMember, MembershipStatus::Substitute);
        assert_eq!(config.base_credit(&titular), Hours::from_hours(22));
        assert_eq!(config.base_credit(&substitute), Hours::ZERO);
    }

    #[test]
    fn toml_table_overrides_defaults() {
        let config: LedgerConfig = toml::from_str(
            r#"
            company_headcount = 80

            [[base_hours]]
            class = "council_member"
            min_headcount = 0
            hours = "10h"

            [policy]
            notice_days = 15
            "#,
        )
        .unwrap();
        assert_eq!(config.policy.notice_days, 15);
        assert_eq!(config.max_commit_retries, 3);
        assert_eq!(
            config
                .base_hours
                .monthly_base(RepresentativeClass::CouncilMember, 80),
            Hours::from_hours(10)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_retries_is_rejected() {
        let config = LedgerConfig {
            max_commit_retries: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(LedgerError::Config(_))));
    }
}
