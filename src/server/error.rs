//! HTTP errors and error normalization

use hyper::StatusCode;
use serde::{Serialize, Serializer};
use std::io;
use thiserror::Error;

/// An error carrying the status code and message sent to the client.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("code={}, message={}", .code.as_u16(), .message)]
pub struct HttpError {
    #[serde(serialize_with = "serialize_status")]
    code: StatusCode,
    #[serde(rename = "msg")]
    message: String,
}

fn serialize_status<S: Serializer>(code: &StatusCode, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u16(code.as_u16())
}

impl HttpError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "403 Forbidden")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "404 page not found")
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error")
    }

    /// Classify an I/O failure: missing file, permission, anything else.
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::not_found(),
            io::ErrorKind::PermissionDenied => Self::forbidden(),
            _ => Self::internal(),
        }
    }

    /// Normalize whatever a handler returned.
    ///
    /// An `HttpError` anywhere in the chain is kept as is, an `io::Error` is
    /// classified, everything else becomes a 500.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(http) = cause.downcast_ref::<HttpError>() {
                return http.clone();
            }
            if let Some(io) = cause.downcast_ref::<io::Error>() {
                return Self::from_io(io);
            }
        }
        Self::internal()
    }
}

impl From<io::Error> for HttpError {
    fn from(err: io::Error) -> Self {
        Self::from_io(&err)
    }
}
