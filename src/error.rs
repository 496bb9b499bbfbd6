//! Error types and error handling strategy for completion results.
//!
//! Error handling follows these principles:
//!
//! - Errors are explicit and typed (no stringly-typed errors)
//! - Contract misuse is reported at the call that breaks the contract
//! - Failures of the underlying work are captured and deferred to retrieval
//! - Failures of the notification callback are never conflated with
//!   failures of the underlying work
//!
//! # Error Categories
//!
//! - **Misuse**: `InvalidArgument`, `TypeMismatch`, `AlreadyCompleted`,
//!   `AlreadyRetrieved`. Programmer errors, never retried.
//! - **Operation**: `OperationFailure`, the captured [`Failure`] of the work.
//! - **Callback**: `FatalCallbackFailure`, raised by the notification callback.

use core::fmt;
use std::sync::Arc;

use serde::Serialize;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    // === Misuse ===
    /// Retrieval was given no completion handle.
    InvalidArgument,
    /// Retrieval was given a handle of a different concrete kind.
    TypeMismatch,
    /// Retrieval was invoked a second time.
    AlreadyRetrieved,
    /// Completion was invoked a second time.
    AlreadyCompleted,

    // === Operation ===
    /// The underlying work failed; the failure was captured at completion.
    OperationFailure,

    // === Callback ===
    /// The notification callback failed while completion was running.
    FatalCallbackFailure,
}

impl ErrorKind {
    /// Returns the error category for this kind.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidArgument
            | Self::TypeMismatch
            | Self::AlreadyRetrieved
            | Self::AlreadyCompleted => ErrorCategory::Misuse,
            Self::OperationFailure => ErrorCategory::Operation,
            Self::FatalCallbackFailure => ErrorCategory::Callback,
        }
    }

    /// Returns true if this kind reports a broken usage contract.
    #[must_use]
    pub const fn is_misuse(&self) -> bool {
        matches!(self.category(), ErrorCategory::Misuse)
    }

    /// Returns true if this kind belongs to the invalid-argument family.
    ///
    /// A handle of the wrong concrete kind is an invalid argument too, just
    /// a more specific one.
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument | Self::TypeMismatch)
    }
}

/// High-level classification of error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCategory {
    /// The caller broke the completion/retrieval contract.
    Misuse,
    /// The represented work failed.
    Operation,
    /// The notification callback failed.
    Callback,
}

type BoxedFailure = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// A failure captured from the underlying work.
///
/// Cloning a `Failure` shares the same underlying error, so identity survives
/// the trip from the producer to the consumer (see [`Failure::ptr_eq`]).
#[derive(Clone)]
pub struct Failure {
    inner: BoxedFailure,
}

impl Failure {
    /// Wraps an error as a captured failure.
    #[must_use]
    pub fn new(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(error),
        }
    }

    /// Wraps an already shared error without re-allocating it.
    #[must_use]
    pub fn from_arc(inner: BoxedFailure) -> Self {
        Self { inner }
    }

    /// Creates a failure carrying only a message.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(MessageFailure(message.into()))
    }

    /// Returns the underlying error.
    #[must_use]
    pub fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.inner.as_ref()
    }

    /// Attempts to view the underlying error as a concrete type.
    #[must_use]
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// Returns true if both failures share the same underlying error.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<E> From<E> for Failure
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Failure").field(&self.inner).finish()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct MessageFailure(String);

/// The notification callback panicked during completion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("notification callback panicked: {message}")]
pub struct CallbackPanicked {
    /// The panic message, if it was a string.
    pub message: String,
}

/// The main error type for completion operations.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Failure>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Returns true if this error reports a broken usage contract.
    #[must_use]
    pub const fn is_misuse(&self) -> bool {
        self.kind.is_misuse()
    }

    /// Returns true if this error carries a failure of the underlying work.
    #[must_use]
    pub const fn is_operation_failure(&self) -> bool {
        matches!(self.kind, ErrorKind::OperationFailure)
    }

    /// Returns true if this error was raised by the notification callback.
    #[must_use]
    pub const fn is_callback_failure(&self) -> bool {
        matches!(self.kind, ErrorKind::FatalCallbackFailure)
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<Failure>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the captured failure of the underlying work.
    ///
    /// Only `OperationFailure` errors carry one; the returned value shares
    /// identity with the failure passed to [`CompletionResult::fail`].
    ///
    /// [`CompletionResult::fail`]: crate::CompletionResult::fail
    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        if self.is_operation_failure() {
            self.source.as_ref()
        } else {
            None
        }
    }

    /// Consumes the error, returning the captured failure if there is one.
    #[must_use]
    pub fn into_failure(self) -> Option<Failure> {
        if self.is_operation_failure() {
            self.source
        } else {
            None
        }
    }

    /// No handle was given to retrieval.
    #[must_use]
    pub fn invalid_argument(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument).with_message(detail)
    }

    /// The handle given to retrieval is of another concrete kind.
    #[must_use]
    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        Self::new(ErrorKind::TypeMismatch)
            .with_message(format!("expected {expected} handle, got {actual}"))
    }

    /// Completion was attempted twice.
    #[must_use]
    pub fn already_completed() -> Self {
        Self::new(ErrorKind::AlreadyCompleted).with_message("completion result already completed")
    }

    /// Retrieval was attempted twice.
    #[must_use]
    pub fn already_retrieved() -> Self {
        Self::new(ErrorKind::AlreadyRetrieved).with_message("completion result already retrieved")
    }

    /// Surfaces a captured failure of the underlying work.
    #[must_use]
    pub fn operation_failure(failure: Failure) -> Self {
        Self::new(ErrorKind::OperationFailure)
            .with_message(failure.to_string())
            .with_source(failure)
    }

    /// Escalates a failure raised by the notification callback.
    #[must_use]
    pub fn callback_failure(cause: impl Into<Failure>) -> Self {
        Self::new(ErrorKind::FatalCallbackFailure)
            .with_message("notification callback failed")
            .with_source(cause)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|f| f.as_error() as _)
    }
}

/// A specialized Result type for completion operations.
pub type Result<T> = core::result::Result<T, Error>;
