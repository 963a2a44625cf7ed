use thiserror::Error;

/// Errors produced by type construction and parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hour quantity: {0}")]
    InvalidHours(String),

    #[error("invalid credit month: {0}")]
    InvalidMonth(String),

    #[error("invalid representative id: {0}")]
    InvalidRepresentativeId(String),
}
