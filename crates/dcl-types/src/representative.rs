use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::CreditMonth;
use crate::identity::RepresentativeId;

/// Body a representative sits on. Drives the statutory base-hours lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepresentativeClass {
    CouncilMember,
    UnionDelegate,
    ProximityRepresentative,
    HealthCommitteeMember,
}

impl RepresentativeClass {
    pub const ALL: [Self; 4] = [
        Self::CouncilMember,
        Self::UnionDelegate,
        Self::ProximityRepresentative,
        Self::HealthCommitteeMember,
    ];
}

impl fmt::Display for RepresentativeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CouncilMember => write!(f, "council_member"),
            Self::UnionDelegate => write!(f, "union_delegate"),
            Self::ProximityRepresentative => write!(f, "proximity_representative"),
            Self::HealthCommitteeMember => write!(f, "health_committee_member"),
        }
    }
}

/// Seat held on the body.
///
/// Substitutes never receive a base credit; they only hold hours ceded to them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Titular,
    Substitute,
}

/// An employee holding a representation mandate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Representative {
    pub id: RepresentativeId,
    pub name: String,
    pub class: RepresentativeClass,
    pub status: MembershipStatus,
    pub mandate_start: NaiveDate,
    #[serde(default)]
    pub mandate_end: Option<NaiveDate>,
    #[serde(default)]
    pub archived: bool,
}

impl Representative {
    pub fn is_substitute(&self) -> bool {
        self.status == MembershipStatus::Substitute
    }

    /// Whether the mandate is in force on `date`.
    pub fn mandate_covers(&self, date: NaiveDate) -> bool {
        !self.archived
            && date >= self.mandate_start
            && self.mandate_end.map_or(true, |end| date <= end)
    }

    /// Whether the mandate overlaps any day of `month`.
    pub fn active_during(&self, month: &CreditMonth) -> bool {
        !self.archived
            && self.mandate_start <= month.last_day()
            && self
                .mandate_end
                .map_or(true, |end| end >= month.first_day())
    }
}
