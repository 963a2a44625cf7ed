use std::fmt;

use serde::{Deserialize, Serialize};

/// Machine-readable rule identifiers returned to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceCode {
    /// Donor's base and carried-over remainders cannot fund the cession.
    InsufficientTransferableSource,
    /// A source that may never be ceded was requested.
    SourceNotTransferable,
    /// Cession submitted without a reason.
    MissingReason,
    /// Recipient would end up above the cap.
    RecipientCapExceeded,
    /// Effective date is closer than the notice period.
    NoticeShortfall,
    /// Zero or negative hours.
    InvalidHours,
    /// Donor and beneficiary are the same person.
    SelfCession,
    /// A party's mandate is not in force on the effective date.
    MandateInactive,
    /// A referenced representative is not designated.
    UnknownRepresentative,
    /// Usage exceeds every source and local policy blocks overage.
    OverageRequiresAuthorization,
    /// Reversal would take back hours the beneficiary already used.
    ReceivedAlreadyConsumed,
    /// The cession has already been reversed.
    AlreadyReversed,
    /// The usage record already has a compensating correction.
    AlreadyCorrected,
}

impl ComplianceCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientTransferableSource => "INSUFFICIENT_TRANSFERABLE_SOURCE",
            Self::SourceNotTransferable => "SOURCE_NOT_TRANSFERABLE",
            Self::MissingReason => "MISSING_REASON",
            Self::RecipientCapExceeded => "RECIPIENT_CAP_EXCEEDED",
            Self::NoticeShortfall => "NOTICE_SHORTFALL",
            Self::InvalidHours => "INVALID_HOURS",
            Self::SelfCession => "SELF_CESSION",
            Self::MandateInactive => "MANDATE_INACTIVE",
            Self::UnknownRepresentative => "UNKNOWN_REPRESENTATIVE",
            Self::OverageRequiresAuthorization => "OVERAGE_REQUIRES_AUTHORIZATION",
            Self::ReceivedAlreadyConsumed => "RECEIVED_ALREADY_CONSUMED",
            Self::AlreadyReversed => "ALREADY_REVERSED",
            Self::AlreadyCorrected => "ALREADY_CORRECTED",
        }
    }

    /// Warnings may be overridden by the caller; violations may not.
    pub fn severity(&self) -> Severity {
        match self {
            Self::NoticeShortfall => Severity::Warning,
            _ => Severity::Violation,
        }
    }
}

impl fmt::Display for ComplianceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Violation,
    Warning,
}

/// A rule failure with a human-readable explanation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub code: ComplianceCode,
    pub message: String,
}

impl Finding {
    pub fn new(code: ComplianceCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

/// Result of a single predicate: whether it passed, and if not, which code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    pub passed: bool,
    pub code: Option<ComplianceCode>,
}

impl Check {
    pub const fn pass() -> Self {
        Self {
            passed: true,
            code: None,
        }
    }

    pub const fn fail(code: ComplianceCode) -> Self {
        Self {
            passed: false,
            code: Some(code),
        }
    }

    pub const fn from_bool(passed: bool, code: ComplianceCode) -> Self {
        if passed {
            Self::pass()
        } else {
            Self::fail(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_screaming_snake() {
        let json = serde_json::to_string(&ComplianceCode::InsufficientTransferableSource).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_TRANSFERABLE_SOURCE\"");
        assert_eq!(
            ComplianceCode::RecipientCapExceeded.to_string(),
            "RECIPIENT_CAP_EXCEEDED"
        );
    }

    #[test]
    fn only_notice_shortfall_is_a_warning() {
        assert_eq!(ComplianceCode::NoticeShortfall.severity(), Severity::Warning);
        assert_eq!(ComplianceCode::MissingReason.severity(), Severity::Violation);
    }

    #[test]
    fn check_carries_code_only_on_failure() {
        assert_eq!(Check::from_bool(true, ComplianceCode::MissingReason).code, None);
        assert_eq!(
            Check::from_bool(false, ComplianceCode::MissingReason).code,
            Some(ComplianceCode::MissingReason)
        );
    }
}
