use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Stable identifier of an employee representative.
///
/// Identifiers come from the HR system of record (employee numbers, matricules)
/// and are opaque to the ledger. Surrounding whitespace is stripped and the
/// empty string is rejected.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepresentativeId(String);

impl RepresentativeId {
    pub fn new(id: impl AsRef<str>) -> Result<Self, TypeError> {
        let trimmed = id.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TypeError::InvalidRepresentativeId(
                "identifier must not be empty".into(),
            ));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(TypeError::InvalidRepresentativeId(format!(
                "identifier contains control characters: {trimmed:?}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RepresentativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RepresentativeId({})", self.0)
    }
}

impl fmt::Display for RepresentativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RepresentativeId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RepresentativeId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RepresentativeId> for String {
    fn from(id: RepresentativeId) -> Self {
        id.0
    }
}
