use std::fmt;

use serde::{Deserialize, Serialize};

/// A bucket a credit period's hours come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditSource {
    /// Hours ceded to this representative by another one.
    Received,
    /// Unused hours brought forward from earlier months.
    CarriedOver,
    /// The statutory monthly grant.
    Base,
}

impl CreditSource {
    pub const ALL: [Self; 3] = [Self::Received, Self::CarriedOver, Self::Base];
}

impl fmt::Display for CreditSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::CarriedOver => write!(f, "carried_over"),
            Self::Base => write!(f, "base"),
        }
    }
}
