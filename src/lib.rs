//! Completion: a one-shot result for work that finishes now or later.
//!
//! # Overview
//!
//! A [`CompletionResult`] stands for the eventual outcome of some work. The
//! work may finish before the call that started it returns (synchronous
//! completion) or later on another thread (asynchronous completion). The
//! producer completes it exactly once, with a value or a [`Failure`]; the
//! consumer retrieves it exactly once, parking the thread or awaiting a
//! future until the outcome is there.
//!
//! # Core Guarantees
//!
//! - **Complete once**: a second completion fails with `AlreadyCompleted`
//! - **Retrieve once**: a second retrieval fails with `AlreadyRetrieved`
//! - **One blocking handle**: created lazily, at most once, shared by all
//! - **Deferred failures**: a failure of the work surfaces at retrieval, intact
//! - **Callback once**: the notification callback runs exactly once, and its
//!   own failure is never mistaken for a failure of the work
//!
//! # Module Structure
//!
//! - [`completion`]: [`CompletionResult`], [`ImmediateValueResult`], retrieval
//! - [`sync`]: the signal-once [`WaitHandle`]
//! - [`config`]: callback failure policy
//! - [`error`]: Error types
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//! use completion::CompletionResult;
//!
//! let result = Arc::new(CompletionResult::<u32>::pending());
//! let producer = {
//!     let result = Arc::clone(&result);
//!     thread::spawn(move || result.complete(false, 42))
//! };
//!
//! assert_eq!(result.retrieve().unwrap(), 42);
//! assert!(!result.completed_synchronously());
//! producer.join().unwrap().unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod completion;
pub mod config;
pub mod error;
pub mod sync;

#[cfg(test)]
mod test_utils;

pub use completion::{
    retrieve, AnyCompletion, AsyncState, Callback, CallbackResult, CompletionBuilder,
    CompletionResult, ImmediateValueResult, Phase, Retrievable, Retrieve, Status,
};
pub use config::{CallbackFailurePolicy, CompletionConfig, ConfigError};
pub use error::{CallbackPanicked, Error, ErrorCategory, ErrorKind, Failure, Result};
pub use sync::WaitHandle;
