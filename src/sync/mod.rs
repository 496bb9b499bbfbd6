//! Blocking synchronization used by completion results.
//!
//! # Primitives
//!
//! - [`WaitHandle`]: Signal-once (manual-reset) blocking handle

mod wait_handle;

pub use wait_handle::WaitHandle;
