//! Error handling
//!
//! Every fallible operation in this crate returns `Error`. Handlers return it
//! directly, and actix renders it through the `ResponseError` implementation,
//! so each variant carries its own HTTP status and client-facing message.


use std::collections::BTreeMap;
use std::env::VarError;
use std::io;
use std::result;

use actix_web::{HttpResponse, ResponseError};
use actix_web::error::BlockingError;
use actix_web::http::{Method, StatusCode};
use diesel::r2d2;
use log::error;
use serde_json::json;
use tokio::time::error::Elapsed;


/// Field name to message mapping produced by a failed validation pass
pub type ValidationErrors = BTreeMap<String, String>;


/// Error type used throughout sitecam
#[derive(Debug, Display, From)]
pub enum Error {

    /// Request body or parameters could not be understood
    #[display(fmt = "{}", _0)]
    #[from(ignore)]
    BadRequest(String),

    /// One or more fields failed validation
    #[display(fmt = "failed validation: {:?}", _0)]
    Validation(ValidationErrors),

    /// Requested record does not exist
    #[display(fmt = "the requested resource could not be found")]
    #[from(ignore)]
    NotFound,

    /// Route exists, but not for this method
    #[display(fmt = "the {} method is not supported for this resource", _0)]
    MethodNotAllowed(Method),

    /// Stored version no longer matches the version the caller read
    #[display(fmt = "unable to update the record due to an edit conflict, please try again")]
    #[from(ignore)]
    EditConflict,

    #[display(fmt = "database error: {}", _0)]
    #[from(ignore)]
    Database(diesel::result::Error),

    #[display(fmt = "connection pool error: {}", _0)]
    Pool(r2d2::PoolError),

    #[display(fmt = "migration error: {}", _0)]
    Migration(Box<dyn std::error::Error + Send + Sync>),

    #[display(fmt = "blocking task failed: {}", _0)]
    Blocking(BlockingError),

    #[display(fmt = "database operation timed out")]
    Timeout(Elapsed),

    #[display(fmt = "I/O error: {}", _0)]
    Io(io::Error),

    #[display(fmt = "JSON error: {}", _0)]
    Json(serde_json::Error),

    #[display(fmt = "environment error: {}", _0)]
    Var(VarError),
}

impl std::error::Error for Error {}

/// Missing rows are reported as `NotFound`; everything else is a storage fault
impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => Error::NotFound,
            err => Error::Database(err),
        }
    }
}

impl ResponseError for Error {

    fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest(_)       => StatusCode::BAD_REQUEST,
            Error::Validation(_)       => StatusCode::UNPROCESSABLE_ENTITY,
            Error::NotFound            => StatusCode::NOT_FOUND,
            Error::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Error::EditConflict        => StatusCode::CONFLICT,
            _                          => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {

        let status = self.status_code();
        let body = match self {
            Error::Validation(errors) => json!({ "error": errors }),
            _ if status.is_server_error() => {
                error!("{}", self);
                json!({ "error": SERVER_ERROR_MESSAGE })
            },
            _ => json!({ "error": self.to_string() }),
        };

        HttpResponse::build(status)
            .json(body)
    }
}


/// Message returned to clients in place of internal fault details
pub const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";


/// Result type used throughout sitecam
pub type Result<T> = result::Result<T, Error>;


#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn missing_rows_become_not_found() {
        let err: Error = diesel::result::Error::NotFound.into();
        assert!(matches!(err, Error::NotFound));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn other_database_errors_are_server_faults() {
        let err: Error = diesel::result::Error::RollbackTransaction.into();
        assert!(matches!(err, Error::Database(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn client_errors_map_to_their_statuses() {
        assert_eq!(Error::BadRequest("nope".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::Validation(ValidationErrors::new()).status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(Error::EditConflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(Error::MethodNotAllowed(Method::PUT).status_code(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn method_not_allowed_names_the_method() {
        let err = Error::MethodNotAllowed(Method::PUT);
        assert_eq!(err.to_string(), "the PUT method is not supported for this resource");
    }
}
