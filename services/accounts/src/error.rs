//! Error type for the accounts service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{credentials::CredentialError, mailer::MailerError};

/// Custom error type for the accounts service
#[derive(Error, Debug)]
pub enum AccountError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// Unknown email, wrong password or unusable session token
    #[error("Invalid credentials")]
    Authentication,

    /// Wrong current password on a password change
    #[error("Password is incorrect")]
    IncorrectPassword,

    /// Authenticated but not allowed
    #[error("Not authorized to access this route")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("Duplicate field value entered")]
    DuplicateEmail,

    /// Reset token unknown or expired
    #[error("Invalid token")]
    Token,

    #[error("Email could not be sent")]
    Delivery(#[source] MailerError),

    #[error("Problem with file upload")]
    Upload(#[source] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[source] DatabaseError),
}

impl From<DatabaseError> for AccountError {
    fn from(err: DatabaseError) -> Self {
        match err {
            // Email is the only unique column besides the primary key
            DatabaseError::UniqueViolation(_) => AccountError::DuplicateEmail,
            other => AccountError::Database(other),
        }
    }
}

impl From<CredentialError> for AccountError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::InvalidSessionToken(_) => AccountError::Authentication,
            other => AccountError::Internal(other.to_string()),
        }
    }
}

impl AccountError {
    pub fn status(&self) -> StatusCode {
        match self {
            AccountError::Validation(_) | AccountError::DuplicateEmail | AccountError::Token => {
                StatusCode::BAD_REQUEST
            }
            AccountError::Authentication | AccountError::IncorrectPassword => {
                StatusCode::UNAUTHORIZED
            }
            AccountError::Forbidden => StatusCode::FORBIDDEN,
            AccountError::NotFound(_) => StatusCode::NOT_FOUND,
            AccountError::Delivery(_)
            | AccountError::Upload(_)
            | AccountError::Internal(_)
            | AccountError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AccountError::Internal(_) | AccountError::Database(_) => {
                error!("{}", self);
                "Internal server error".to_string()
            }
            AccountError::Delivery(source) => {
                error!("Email delivery failed: {}", source);
                self.to_string()
            }
            AccountError::Upload(source) => {
                error!("File upload failed: {}", source);
                self.to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for account service results
pub type AccountResult<T> = Result<T, AccountError>;
