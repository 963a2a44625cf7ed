/// Errors that can occur while evaluating compliance rules.
///
/// Expected rule failures are never errors; they are reported as
/// [`crate::Finding`]s. These variants cover misconfiguration and rule bugs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComplianceError {
    /// The policy configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// A rule could not evaluate its input.
    #[error("rule error in '{rule}': {message}")]
    RuleError { rule: String, message: String },
}

impl ComplianceError {
    /// Create a rule error with a name and message.
    pub fn rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleError {
            rule: rule.into(),
            message: message.into(),
        }
    }
}
