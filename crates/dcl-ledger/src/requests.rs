//! Inputs of the ledger operations. Callers build these from whatever their
//! forms or files hold; balances are always recomputed from the store.

use chrono::NaiveDate;
use dcl_types::{Hours, RepresentativeId};
use serde::{Deserialize, Serialize};

use crate::records::UsageCategory;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclareUsage {
    pub representative: RepresentativeId,
    pub date: NaiveDate,
    pub hours: Hours,
    pub category: UsageCategory,
    #[serde(default)]
    pub justification: Option<String>,
}

/// Who receives the hours of a cession.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BeneficiaryRef {
    Internal { id: RepresentativeId },
    External { name: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCession {
    pub donor: RepresentativeId,
    pub beneficiary: BeneficiaryRef,
    pub hours: Hours,
    pub effective_date: NaiveDate,
    #[serde(default)]
    pub reason: String,
    #[serde(default = "default_actor")]
    pub created_by: String,
    /// Commit despite a notice shortfall.
    #[serde(default)]
    pub force_override_notice: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectUsage {
    #[serde(default)]
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseCession {
    #[serde(default)]
    pub reason: String,
    #[serde(default = "default_actor")]
    pub created_by: String,
}

fn default_actor() -> String {
    "system".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cession_request_from_json() {
        let request: CreateCession = serde_json::from_str(
            r#"{
                "donor": "EMP-1",
                "beneficiary": { "kind": "external", "name": "Federation" },
                "hours": "4h30",
                "effective_date": "2024-03-20",
                "reason": "congress"
            }"#,
        )
        .unwrap();
        assert_eq!(request.hours, Hours::from_minutes(270));
        assert_eq!(request.created_by, "system");
        assert!(!request.force_override_notice);
        assert!(matches!(request.beneficiary, BeneficiaryRef::External { .. }));
    }
}
