//! One-shot completion results.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       COMPLETE ONCE / RETRIEVE ONCE              │
//! │                                                                  │
//! │   Producer                                 Consumer              │
//! │     │                                         │                  │
//! │     │── complete(sync, v) ──┐                 │                  │
//! │     │── fail(sync, e) ──────┼──► callback     ├── retrieve() ─► v │
//! │     │                       │    (once)       ├── .await ─────► v │
//! │     │                       └────────────────►│    or Err(e)      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`CompletionResult`]: the state machine, completed by a producer that
//!   finishes synchronously or on another thread.
//! - [`ImmediateValueResult`]: a result already completed with a value.
//! - [`AnyCompletion`] and [`retrieve`]: retrieval from a handle of either
//!   kind, checking which kind it holds.

mod callback;
mod immediate;
mod result;
mod retrieve;
mod state;

use std::sync::Arc;

pub use callback::{Callback, CallbackResult};
pub use immediate::ImmediateValueResult;
pub use result::{CompletionBuilder, CompletionResult, Phase, Status};
pub use retrieve::Retrieve;
pub use state::AsyncState;

use crate::error::{Error, Result};

/// A completion handle of either concrete kind.
///
/// Consumers that keep handles of both kinds side by side hold them as
/// `AnyCompletion` and retrieve with [`retrieve`], naming the kind they
/// expect.
#[derive(Debug)]
pub enum AnyCompletion<T> {
    /// A result completed by a producer.
    Deferred(Arc<CompletionResult<T>>),
    /// A result completed at construction.
    Immediate(Arc<ImmediateValueResult<T>>),
}

impl<T> AnyCompletion<T> {
    /// Returns the name of the held kind.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Deferred(_) => <CompletionResult<T> as Retrievable<T>>::KIND,
            Self::Immediate(_) => <ImmediateValueResult<T> as Retrievable<T>>::KIND,
        }
    }

    /// Returns the underlying completion result.
    #[must_use]
    pub fn as_completion(&self) -> &CompletionResult<T> {
        match self {
            Self::Deferred(result) => result.as_ref(),
            Self::Immediate(result) => result.as_completion(),
        }
    }

    /// Returns true once completion has occurred.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.as_completion().is_completed()
    }

    /// Returns the opaque state supplied at construction.
    #[must_use]
    pub fn state(&self) -> &AsyncState {
        self.as_completion().state()
    }
}

impl<T> Clone for AnyCompletion<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Deferred(result) => Self::Deferred(Arc::clone(result)),
            Self::Immediate(result) => Self::Immediate(Arc::clone(result)),
        }
    }
}

impl<T> From<Arc<CompletionResult<T>>> for AnyCompletion<T> {
    fn from(result: Arc<CompletionResult<T>>) -> Self {
        Self::Deferred(result)
    }
}

impl<T> From<Arc<ImmediateValueResult<T>>> for AnyCompletion<T> {
    fn from(result: Arc<ImmediateValueResult<T>>) -> Self {
        Self::Immediate(result)
    }
}

mod sealed {
    pub trait Sealed {}

    impl<T> Sealed for super::CompletionResult<T> {}
    impl<T> Sealed for super::ImmediateValueResult<T> {}
}

/// A concrete result kind that [`retrieve`] can select from an
/// [`AnyCompletion`].
pub trait Retrievable<T>: sealed::Sealed {
    /// Name of the kind, used in `TypeMismatch` errors.
    const KIND: &'static str;

    /// Returns the held result if `handle` holds this kind.
    fn select(handle: &AnyCompletion<T>) -> Option<&Self>;

    /// Retrieves the outcome.
    fn retrieve_outcome(&self) -> Result<T>;
}

impl<T> Retrievable<T> for CompletionResult<T> {
    const KIND: &'static str = "CompletionResult";

    fn select(handle: &AnyCompletion<T>) -> Option<&Self> {
        match handle {
            AnyCompletion::Deferred(result) => Some(result.as_ref()),
            AnyCompletion::Immediate(_) => None,
        }
    }

    fn retrieve_outcome(&self) -> Result<T> {
        self.retrieve()
    }
}

impl<T> Retrievable<T> for ImmediateValueResult<T> {
    const KIND: &'static str = "ImmediateValueResult";

    fn select(handle: &AnyCompletion<T>) -> Option<&Self> {
        match handle {
            AnyCompletion::Immediate(result) => Some(result.as_ref()),
            AnyCompletion::Deferred(_) => None,
        }
    }

    fn retrieve_outcome(&self) -> Result<T> {
        self.retrieve()
    }
}

/// Retrieves the outcome from a handle expected to hold an `R`.
///
/// # Errors
///
/// - `InvalidArgument` if `handle` is `None`.
/// - `TypeMismatch` if `handle` holds another kind.
/// - Anything the kind's own retrieval returns (`AlreadyRetrieved`,
///   `OperationFailure`, ...).
///
/// ```
/// use std::sync::Arc;
/// use completion::{retrieve, AnyCompletion, CompletionResult, ErrorKind, ImmediateValueResult};
///
/// let handle = AnyCompletion::from(Arc::new(ImmediateValueResult::with_value(3)));
/// let err = retrieve::<CompletionResult<i32>, _>(Some(&handle)).unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::TypeMismatch);
/// assert_eq!(retrieve::<ImmediateValueResult<i32>, _>(Some(&handle)).unwrap(), 3);
/// ```
pub fn retrieve<R, T>(handle: Option<&AnyCompletion<T>>) -> Result<T>
where
    R: Retrievable<T>,
{
    let Some(handle) = handle else {
        tracing::debug!(expected = R::KIND, "retrieve called without a handle");
        return Err(Error::invalid_argument("no completion handle given to retrieve"));
    };
    let Some(result) = R::select(handle) else {
        tracing::debug!(
            expected = R::KIND,
            actual = handle.kind_name(),
            "retrieve called with the wrong kind of handle"
        );
        return Err(Error::type_mismatch(R::KIND, handle.kind_name()));
    };
    result.retrieve_outcome()
}
