use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use dcl_ledger::LedgerError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("invalid value: {0}")]
    Type(#[from] dcl_types::TypeError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Type(_) => StatusCode::BAD_REQUEST,
            Self::Ledger(e) => match e {
                LedgerError::RepresentativeNotFound(_)
                | LedgerError::UsageNotFound(_)
                | LedgerError::CessionNotFound(_)
                | LedgerError::PeriodNotOpen { .. } => StatusCode::NOT_FOUND,
                LedgerError::Conflict(_)
                | LedgerError::InvalidTransition { .. }
                | LedgerError::DuplicateRecord(_) => StatusCode::CONFLICT,
                LedgerError::InvalidRepresentative(_) | LedgerError::BeyondHorizon { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                LedgerError::InvariantViolation(_)
                | LedgerError::Compliance(_)
                | LedgerError::Config(_)
                | LedgerError::Storage(_)
                | LedgerError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) | Self::Type(_) => "bad_request",
            Self::Ledger(LedgerError::Conflict(_)) => "conflict",
            Self::Ledger(
                LedgerError::RepresentativeNotFound(_)
                | LedgerError::UsageNotFound(_)
                | LedgerError::CessionNotFound(_)
                | LedgerError::PeriodNotOpen { .. },
            ) => "not_found",
            Self::Ledger(LedgerError::InvalidTransition { .. }) => "invalid_transition",
            Self::Ledger(LedgerError::InvalidRepresentative(_)) => "invalid_representative",
            Self::Ledger(LedgerError::DuplicateRecord(_)) => "duplicate_record",
            Self::Ledger(LedgerError::BeyondHorizon { .. }) => "beyond_horizon",
            Self::Ledger(LedgerError::Storage(_)) | Self::Io(_) => "storage",
            _ => "internal",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
            retryable: matches!(&self, Self::Ledger(e) if e.is_retryable()),
        };
        (status, Json(body)).into_response()
    }
}
