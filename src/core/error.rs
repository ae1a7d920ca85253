//! Purpose: Single error model shared by hooks, pipeline, CLI, and HTTP sidecar.
//! Exports: `Error`, `ErrorKind`, `to_exit_code`.
//! Role: Structured error with kind, message, hint, route, and source chain.
//! Invariants: Every transcoding failure (decode, encode, type mismatch, unsupported
//! version) maps to HTTP 500; only `Usage` and `NotFound` map to 4xx.
//! Invariants: Exit-code mapping is stable once published.

use axum::http::StatusCode;
use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    NotFound,
    /// Malformed or mistyped JSON on input.
    Decode,
    /// Serialization of an internally built value failed.
    Encode,
    /// A hook received a container of the wrong shape (route/hook wiring bug).
    TypeMismatch,
    /// A version tag matched none of the known forks.
    UnsupportedVersion,
    Io,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    route: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            route: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn http_status(&self) -> StatusCode {
        match self.kind {
            ErrorKind::Usage => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal
            | ErrorKind::Decode
            | ErrorKind::Encode
            | ErrorKind::TypeMismatch
            | ErrorKind::UnsupportedVersion
            | ErrorKind::Io => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(route) = &self.route {
            write!(f, " (route: {route})")?;
        }
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Decode => 4,
        ErrorKind::Encode => 5,
        ErrorKind::TypeMismatch => 6,
        ErrorKind::UnsupportedVersion => 7,
        ErrorKind::Io => 8,
    }
}
