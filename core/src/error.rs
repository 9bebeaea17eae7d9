// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use http::StatusCode;
use std::fmt;
use thiserror::Error;

/// The error type for appsign operations.
#[derive(Error, Debug)]
#[error("{message}{}", format_context(.context))]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<anyhow::Error>,
    context: Vec<String>,
    status: Option<StatusCode>,
}

/// The kind of error that occurred.
///
/// Every kind names the stage of the pipeline that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Configuration error (missing endpoint or region, invalid values).
    ConfigInvalid,

    /// No credential source yielded a usable credential.
    CredentialUnavailable,

    /// The request body could not be read for hashing.
    BodyRead,

    /// Request cannot be built or signed.
    RequestInvalid,

    /// Network, TLS, timeout or cancellation failure during dispatch.
    Transport,

    /// The endpoint answered with a status outside `[200, 300)`.
    HttpStatus,

    /// Unexpected errors (malformed documents, parse failures, etc.)
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            context: Vec::new(),
            status: None,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Add a line of context, rendered after the message.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the context lines attached to this error.
    pub fn context(&self) -> &[String] {
        &self.context
    }

    /// The HTTP status carried by an [`ErrorKind::HttpStatus`] error.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// The reason phrase of the carried HTTP status, like `Forbidden`.
    pub fn reason(&self) -> Option<&'static str> {
        self.status.and_then(|s| s.canonical_reason())
    }
}

// Convenience constructors
impl Error {
    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create a credential unavailable error
    pub fn credential_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialUnavailable, message)
    }

    /// Create a body read error
    pub fn body_read(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BodyRead, message)
    }

    /// Create a request invalid error
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestInvalid, message)
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Create an http status error for a non-2xx response.
    pub fn http_status(status: StatusCode) -> Self {
        let mut err = Self::new(
            ErrorKind::HttpStatus,
            format!(
                "unexpected http status: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ),
        );
        err.status = Some(status);
        err
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

fn format_context(context: &[String]) -> String {
    if context.is_empty() {
        return String::new();
    }

    format!(" ({})", context.join(", "))
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::CredentialUnavailable => write!(f, "credential unavailable"),
            ErrorKind::BodyRead => write!(f, "body read failed"),
            ErrorKind::RequestInvalid => write!(f, "invalid request"),
            ErrorKind::Transport => write!(f, "transport failed"),
            ErrorKind::HttpStatus => write!(f, "unexpected http status"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

// Common From implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::ToStrError> for Error {
    fn from(err: http::header::ToStrError) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUriParts> for Error {
    fn from(err: http::uri::InvalidUriParts) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_error() {
        let err = Error::http_status(StatusCode::FORBIDDEN);

        assert_eq!(err.kind(), ErrorKind::HttpStatus);
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert_eq!(err.reason(), Some("Forbidden"));
        assert_eq!(err.to_string(), "unexpected http status: 403 Forbidden");
    }

    #[test]
    fn test_error_context() {
        let err = Error::config_invalid("endpoint is missing")
            .with_context("env: APPSYNC_GRAPHQL_ENDPOINT")
            .with_context("hint: export the endpoint url");

        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert!(err.status().is_none());
        assert_eq!(
            err.to_string(),
            "endpoint is missing (env: APPSYNC_GRAPHQL_ENDPOINT, hint: export the endpoint url)"
        );
    }

    #[test]
    fn test_error_source() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "stream closed");
        let err = Error::body_read("failed to read request body").with_source(io);

        assert_eq!(err.kind(), ErrorKind::BodyRead);
        let source = std::error::Error::source(&err).expect("source must be set");
        assert_eq!(source.to_string(), "stream closed");
    }
}
