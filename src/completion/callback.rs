//! Single-use notification callback.
//!
//! The callback is a continuation attached at construction. It runs at most
//! once, right after the completion transition, on the thread that completed
//! the result. Whatever it raises (an `Err` or a panic) becomes a
//! `FatalCallbackFailure`, never an `OperationFailure`.

use std::panic::{catch_unwind, AssertUnwindSafe};

use parking_lot::Mutex;

use super::CompletionResult;
use crate::error::{CallbackPanicked, Error, Failure};

/// What a notification callback returns.
pub type CallbackResult = std::result::Result<(), Failure>;

/// A notification callback, invoked with the completed result.
pub type Callback<T> = Box<dyn FnOnce(&CompletionResult<T>) -> CallbackResult + Send + 'static>;

/// Holds the callback until it fires.
pub(super) struct Notification<T> {
    slot: Mutex<Option<Callback<T>>>,
}

impl<T> Notification<T> {
    pub(super) fn new(callback: Option<Callback<T>>) -> Self {
        Self {
            slot: Mutex::new(callback),
        }
    }

    /// Returns true while a callback is waiting to fire.
    pub(super) fn is_armed(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Runs the callback, if any, with panic isolation.
    pub(super) fn fire(&self, result: &CompletionResult<T>) -> Result<(), Error> {
        let Some(callback) = self.slot.lock().take() else {
            return Ok(());
        };

        match catch_unwind(AssertUnwindSafe(|| callback(result))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(failure)) => Err(Error::callback_failure(failure)),
            Err(payload) => Err(Error::callback_failure(CallbackPanicked {
                message: extract_panic_message(&payload),
            })),
        }
    }
}

/// Extract a human-readable message from a panic payload.
fn extract_panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_from_str_and_string() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(extract_panic_message(&payload), "static");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(extract_panic_message(&payload), "owned");

        let payload: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(extract_panic_message(&payload), "unknown panic");
    }
}
