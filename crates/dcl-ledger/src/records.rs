//! Append-only usage and cession records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use dcl_types::{CreditMonth, Hours, RepresentativeId};
use serde::{Deserialize, Serialize};

use crate::cession::SourceBreakdown;
use crate::consumption::UsageAllocation;

macro_rules! record_id {
    ($name:ident, $label:literal) => {
        #[doc = concat!("Time-ordered (UUID v7) identifier of a ", $label, ".")]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }

            /// First 8 characters of the UUID.
            pub fn short_id(&self) -> String {
                self.0.to_string()[..8].to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.short_id())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }
    };
}

record_id!(UsageId, "usage record");
record_id!(CessionId, "cession record");

// ---------------------------------------------------------------------------
// Usage
// ---------------------------------------------------------------------------

/// What the delegation hours were spent on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageCategory {
    Delegation,
    Meeting,
    Training,
    Inquiry,
    /// Hours taken while on sick leave; acknowledged rather than approved.
    Medical,
}

impl UsageCategory {
    /// Approval state a fresh declaration starts in.
    ///
    /// Ordinary categories are free use: no prior justification, pending
    /// approval. Medical declarations are only acknowledged.
    pub fn initial_approval(&self) -> ApprovalState {
        match self {
            Self::Medical => ApprovalState::Acknowledged,
            _ => ApprovalState::Pending,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    Pending,
    Approved,
    Acknowledged,
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Acknowledged => write!(f, "acknowledged"),
        }
    }
}

/// One declaration of delegation hours, or the correction of one.
///
/// Corrections carry negated `hours` and `allocation` and point at the
/// record they compensate through `correction_of`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: UsageId,
    pub representative: RepresentativeId,
    pub date: NaiveDate,
    pub month: CreditMonth,
    pub hours: Hours,
    pub category: UsageCategory,
    #[serde(default)]
    pub justification: Option<String>,
    pub approval: ApprovalState,
    pub allocation: UsageAllocation,
    #[serde(default)]
    pub correction_of: Option<UsageId>,
    pub recorded_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn is_correction(&self) -> bool {
        self.correction_of.is_some()
    }

    /// Uncovered hours awaiting employer authorization.
    pub fn requires_authorization(&self) -> bool {
        !self.is_correction() && self.allocation.overage.is_positive()
    }
}

/// A change of approval state, checked against the current state at commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApprovalUpdate {
    pub id: UsageId,
    pub from: ApprovalState,
    pub to: ApprovalState,
}

// ---------------------------------------------------------------------------
// Cession
// ---------------------------------------------------------------------------

/// Receiving side of a cession.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Beneficiary {
    /// Another represented employee; their credit period is credited.
    Internal { id: RepresentativeId, name: String },
    /// A non-represented recipient; only the donor side is recorded.
    External { name: String },
}

impl Beneficiary {
    pub fn id(&self) -> Option<&RepresentativeId> {
        match self {
            Self::Internal { id, .. } => Some(id),
            Self::External { .. } => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Internal { name, .. } | Self::External { name } => name,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Self::External { .. })
    }
}

/// A committed transfer of hours. Never edited or deleted; undone only by a
/// reversal record pointing at it through `reverses`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CessionRecord {
    pub id: CessionId,
    /// Store-assigned commit order.
    pub seq: u64,
    pub donor: RepresentativeId,
    pub beneficiary: Beneficiary,
    pub hours: Hours,
    pub effective_date: NaiveDate,
    pub month: CreditMonth,
    pub reason: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub source: SourceBreakdown,
    /// Committed despite a notice shortfall on the caller's explicit request.
    #[serde(default)]
    pub notice_overridden: bool,
    #[serde(default)]
    pub reverses: Option<CessionId>,
}

impl CessionRecord {
    pub fn is_reversal(&self) -> bool {
        self.reverses.is_some()
    }

    pub fn involves(&self, representative: &RepresentativeId) -> bool {
        self.donor == *representative || self.beneficiary.id() == Some(representative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn medical_usage_is_acknowledged() {
        assert_eq!(
            UsageCategory::Medical.initial_approval(),
            ApprovalState::Acknowledged
        );
        assert_eq!(
            UsageCategory::Meeting.initial_approval(),
            ApprovalState::Pending
        );
    }

    #[test]
    fn ids_are_uuid_v7() {
        let id = CessionId::new();
        assert_eq!(id.as_uuid().get_version_num(), 7);
        assert_eq!(id.short_id().len(), 8);
    }

    #[test]
    fn ids_parse_from_display() {
        let id = UsageId::new();
        let parsed: UsageId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn beneficiary_accessors() {
        let internal = Beneficiary::Internal {
            id: RepresentativeId::new("EMP-2").unwrap(),
            name: "Lea Petit".into(),
        };
        assert_eq!(internal.name(), "Lea Petit");
        assert!(!internal.is_external());

        let external = Beneficiary::External {
            name: "Federation".into(),
        };
        assert!(external.id().is_none());
        assert!(external.is_external());
    }
}
