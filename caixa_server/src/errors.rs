use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use caixa_engine::ReconciliationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    ReconciliationError(#[from] ReconciliationError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ReconciliationError(e) => match e {
                // A store failure must surface as unavailable, never as a zeroed summary.
                ReconciliationError::DatabaseError(_) => StatusCode::SERVICE_UNAVAILABLE,
                ReconciliationError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                ReconciliationError::LedgerEntryNotFound(_) => StatusCode::NOT_FOUND,
                ReconciliationError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
                ReconciliationError::PaymentMismatch { .. } => StatusCode::BAD_REQUEST,
                ReconciliationError::AmountNotPositive(_) => StatusCode::BAD_REQUEST,
                ReconciliationError::InvalidDateRange => StatusCode::BAD_REQUEST,
                ReconciliationError::FutureClosingDate(_) => StatusCode::BAD_REQUEST,
                ReconciliationError::LockTimeout => StatusCode::CONFLICT,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}
