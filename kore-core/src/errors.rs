//! # Errors
//!
//! Two layers:
//! - [`TenancyError`]: what the tenancy machinery itself rejects. These are
//!   integrity errors; none of them is ever retried or swallowed.
//! - [`KoreError`]: a Feathers-style structured error (kind, status code,
//!   class name, optional data) that can ride inside `anyhow::Error` up to
//!   a transport, which decides how to serialize it.

use std::fmt;

use anyhow::Error as AnyError;
use serde_json::{json, Value};
use thiserror::Error;

use crate::audit::OperationKind;
use crate::tenant::TenantId;

pub type TenancyResult<T> = std::result::Result<T, TenancyError>;

#[derive(Error, Debug)]
pub enum TenancyError {
    #[error("no active tenant for {operation} on {entity}")]
    NoActiveTenant {
        operation: OperationKind,
        entity: String,
    },

    #[error("tenant mismatch on {entity}: context is {expected}, record carries {found}")]
    TenantMismatch {
        entity: String,
        expected: TenantId,
        found: TenantId,
    },

    #[error("field `{field}` of {entity} is immutable")]
    ImmutableField { entity: String, field: String },

    #[error("tenant context already set to {current} (requested {requested})")]
    ContextAlreadySet {
        current: TenantId,
        requested: TenantId,
    },

    #[error("a scope bypass is already active (reason: {active_reason})")]
    NestedBypass { active_reason: String },

    #[error("scope bypass requires a non-empty {field}")]
    InvalidBypass { field: &'static str },

    #[error("{entity} record carries no tenant id and no tenant is active")]
    MissingTenantId { entity: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("{entity} update rejected: {source}")]
    InvalidUpdate { entity: String, source: AnyError },

    #[error("{entity}: store does not support {what}")]
    Unsupported { entity: String, what: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] AnyError),
}

impl TenancyError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            TenancyError::NoActiveTenant { .. } => "no-active-tenant",
            TenancyError::TenantMismatch { .. } => "tenant-mismatch",
            TenancyError::ImmutableField { .. } => "immutable-field",
            TenancyError::ContextAlreadySet { .. } => "context-already-set",
            TenancyError::NestedBypass { .. } => "nested-bypass",
            TenancyError::InvalidBypass { .. } => "invalid-bypass",
            TenancyError::MissingTenantId { .. } => "missing-tenant-id",
            TenancyError::NotFound { .. } => "not-found",
            TenancyError::InvalidUpdate { .. } => "invalid-update",
            TenancyError::Unsupported { .. } => "unsupported",
            TenancyError::Serialization(_) => "serialization",
            TenancyError::Store(_) => "store",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TenancyError::NoActiveTenant { .. } => ErrorKind::NotAuthenticated,
            TenancyError::TenantMismatch { .. } => ErrorKind::Forbidden,
            TenancyError::ImmutableField { .. } => ErrorKind::Unprocessable,
            TenancyError::InvalidBypass { .. } => ErrorKind::BadRequest,
            TenancyError::NotFound { .. } => ErrorKind::NotFound,
            TenancyError::InvalidUpdate { .. } => ErrorKind::Unprocessable,
            TenancyError::ContextAlreadySet { .. }
            | TenancyError::NestedBypass { .. }
            | TenancyError::MissingTenantId { .. }
            | TenancyError::Unsupported { .. }
            | TenancyError::Serialization(_)
            | TenancyError::Store(_) => ErrorKind::GeneralError,
        }
    }
}

/// Feathers-style error classes used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    NotAuthenticated,
    Forbidden,
    NotFound,
    Conflict,
    Unprocessable,
    GeneralError,
}

impl ErrorKind {
    /// `(status, name, className)`
    fn wire(&self) -> (u16, &'static str, &'static str) {
        match self {
            ErrorKind::BadRequest => (400, "BadRequest", "bad-request"),
            ErrorKind::NotAuthenticated => (401, "NotAuthenticated", "not-authenticated"),
            ErrorKind::Forbidden => (403, "Forbidden", "forbidden"),
            ErrorKind::NotFound => (404, "NotFound", "not-found"),
            ErrorKind::Conflict => (409, "Conflict", "conflict"),
            ErrorKind::Unprocessable => (422, "Unprocessable", "unprocessable"),
            ErrorKind::GeneralError => (500, "GeneralError", "general-error"),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.wire().0
    }

    pub fn name(&self) -> &'static str {
        self.wire().1
    }

    pub fn class_name(&self) -> &'static str {
        self.wire().2
    }
}

/// A structured KORE error that can live inside `anyhow::Error`.
#[derive(Debug)]
pub struct KoreError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<Value>,
    pub errors: Option<Value>,
    pub source: Option<AnyError>,
}

impl KoreError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            errors: None,
            source: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_errors(mut self, errors: Value) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    /// Convert into `anyhow::Error` so it flows through handlers and jobs.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Find a `KoreError` anywhere in an `anyhow::Error` chain.
    pub fn from_anyhow(err: &AnyError) -> Option<&KoreError> {
        err.chain().find_map(|e| e.downcast_ref::<KoreError>())
    }

    /// Turn any error into a KoreError:
    /// - a wrapped `KoreError` is kept as is
    /// - a wrapped `TenancyError` is mapped by its kind
    /// - anything else becomes a GeneralError
    pub fn normalize(err: AnyError) -> KoreError {
        let err = match err.downcast::<KoreError>() {
            Ok(kore) => return kore,
            Err(other) => other,
        };
        match err.downcast::<TenancyError>() {
            Ok(tenancy) => KoreError::from(tenancy),
            Err(other) => {
                KoreError::new(ErrorKind::GeneralError, other.to_string()).with_source(other)
            }
        }
    }

    /// Copy without the inner `source`, safe to hand to clients.
    pub fn sanitize_for_client(&self) -> KoreError {
        let mut safe = KoreError::new(self.kind, self.message.clone());
        safe.data = self.data.clone();
        safe.errors = self.errors.clone();
        safe
    }

    /// `{name, message, code, className, data?, errors?}`
    pub fn to_json(&self) -> Value {
        let (code, name, class_name) = self.kind.wire();
        let mut body = json!({
            "name": name,
            "message": self.message,
            "code": code,
            "className": class_name,
        });
        for (key, value) in [("data", &self.data), ("errors", &self.errors)] {
            if let Some(value) = value {
                body[key] = value.clone();
            }
        }
        body
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, msg)
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unprocessable, msg)
    }

    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
}

impl From<TenancyError> for KoreError {
    fn from(err: TenancyError) -> Self {
        // Stores and update checks report their own structured errors
        // (e.g. duplicate id -> 409, validation -> 422).
        let err = match err {
            TenancyError::Store(inner) => match inner.downcast::<KoreError>() {
                Ok(kore) => return kore,
                Err(inner) => TenancyError::Store(inner),
            },
            TenancyError::InvalidUpdate { entity, source } => match source.downcast::<KoreError>() {
                Ok(kore) => return kore,
                Err(source) => TenancyError::InvalidUpdate { entity, source },
            },
            other => other,
        };
        let kind = err.kind();
        let code = err.code();
        KoreError::new(kind, err.to_string())
            .with_data(json!({ "tenancy": code }))
            .with_source(AnyError::new(err))
    }
}

impl fmt::Display for KoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for KoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}
