//! A result whose value is known when it is created.

use super::callback::Callback;
use super::result::{CompletionResult, Phase, Status};
use super::state::AsyncState;
use super::{retrieve, AnyCompletion};
use crate::config::CompletionConfig;
use crate::error::Result;
use crate::sync::WaitHandle;

/// A completion result carrying a value that is ready at construction.
///
/// The constructor completes the result synchronously before returning, so
/// no other thread can have observed it pending.
///
/// ```
/// use completion::ImmediateValueResult;
///
/// let result = ImmediateValueResult::with_value(42);
/// assert!(result.completed_synchronously());
/// assert_eq!(result.retrieve().unwrap(), 42);
/// ```
#[derive(Debug)]
pub struct ImmediateValueResult<T> {
    inner: CompletionResult<T>,
}

impl<T> ImmediateValueResult<T> {
    /// Creates a result completed with `value`, firing `callback` before
    /// returning.
    ///
    /// # Errors
    ///
    /// `FatalCallbackFailure` if the callback fails under the default
    /// (escalate) policy.
    pub fn new(value: T, callback: Option<Callback<T>>, state: AsyncState) -> Result<Self> {
        Self::from_parts(value, CompletionResult::new(callback, state))
    }

    /// Like [`new`](Self::new), with explicit configuration.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_config(
        value: T,
        callback: Option<Callback<T>>,
        state: AsyncState,
        config: CompletionConfig,
    ) -> Result<Self> {
        Self::from_parts(value, CompletionResult::with_config(callback, state, config))
    }

    /// Creates a result completed with `value`, with no callback and no
    /// state.
    #[must_use]
    pub fn with_value(value: T) -> Self {
        match Self::new(value, None, AsyncState::none()) {
            Ok(result) => result,
            Err(err) => unreachable!("fresh result without callback failed to complete: {err}"),
        }
    }

    pub(super) fn from_parts(value: T, inner: CompletionResult<T>) -> Result<Self> {
        inner.complete(true, value)?;
        Ok(Self { inner })
    }

    /// Returns the value.
    ///
    /// # Errors
    ///
    /// - `AlreadyRetrieved` on any call after the first.
    /// - `FatalCallbackFailure` if the callback failed under the capture
    ///   policy.
    pub fn retrieve(&self) -> Result<T> {
        self.inner.retrieve()
    }

    /// Retrieves the value from a handle that must hold an
    /// `ImmediateValueResult`.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `handle` is `None`.
    /// - `TypeMismatch` if `handle` holds another kind of result.
    /// - Anything [`retrieve`](Self::retrieve) returns.
    pub fn retrieve_from(handle: Option<&AnyCompletion<T>>) -> Result<T> {
        retrieve::<Self, T>(handle)
    }

    /// Returns the underlying completion result.
    #[must_use]
    pub const fn as_completion(&self) -> &CompletionResult<T> {
        &self.inner
    }

    /// Returns the opaque state supplied at construction.
    #[doc(alias = "context")]
    #[must_use]
    pub fn state(&self) -> &AsyncState {
        self.inner.state()
    }

    /// Always true: construction completes the result.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.inner.is_completed()
    }

    /// Always true: construction completes the result synchronously.
    #[must_use]
    pub fn completed_synchronously(&self) -> bool {
        self.inner.completed_synchronously()
    }

    /// Returns the shared blocking handle (always signaled).
    #[must_use]
    pub fn wait_handle(&self) -> &WaitHandle {
        self.inner.wait_handle()
    }

    /// Returns the current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.inner.phase()
    }

    /// Returns a diagnostics snapshot.
    #[must_use]
    pub fn status(&self) -> Status {
        self.inner.status()
    }
}
