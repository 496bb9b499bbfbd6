//! The completion state machine.
//!
//! ```text
//!   Created ──complete/fail──► Completed ──retrieve──► Retrieved
//!      │                                                   ▲
//!      └──retrieve (parks)──► Waiting ──complete/fail──────┘
//! ```
//!
//! Every transition is one-way and guarded: a second completion fails with
//! `AlreadyCompleted`, a second retrieval with `AlreadyRetrieved`.
//!
//! # Synchronous completion
//!
//! Completing with `synchronously = true` publishes the outcome without the
//! exclusive lock. The producer must not share the result with another thread
//! until the call that completed it has returned, so no waiter can exist yet.
//! [`ImmediateValueResult`] satisfies this by completing inside its own
//! constructor.
//!
//! # Capturing callback failures
//!
//! Under [`CallbackFailurePolicy::Capture`] the outcome is published to
//! retrievers only after the notification callback has returned, so a
//! parked retriever always sees what the callback left behind. The callback
//! itself may still retrieve from inside its own invocation.
//!
//! [`ImmediateValueResult`]: super::ImmediateValueResult

use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::thread::{self, ThreadId};
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;
use serde::Serialize;

use super::callback::{Callback, CallbackResult, Notification};
use super::retrieve::Retrieve;
use super::state::AsyncState;
use super::ImmediateValueResult;
use crate::config::{CallbackFailurePolicy, CompletionConfig};
use crate::error::{Error, Failure, Result};
use crate::sync::WaitHandle;

/// The stored outcome.
enum Slot<T> {
    Empty,
    Ready(T),
    Failed(Failure),
    CallbackFailed(Error),
    Taken,
}

/// State guarded by the exclusive lock.
struct Waiters {
    /// Waker of a pending [`Retrieve`] future.
    waker: Option<Waker>,
}

/// Lifecycle phase of a completion result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    /// Neither completed nor retrieved.
    Created,
    /// Retrieval is parked (or awaiting) until completion.
    Waiting,
    /// Completed, outcome not yet retrieved.
    Completed,
    /// Completed and retrieved.
    Retrieved,
}

/// Point-in-time snapshot of a completion result, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Status {
    /// Current lifecycle phase.
    pub phase: Phase,
    /// How completion happened, once it has.
    pub completed_synchronously: Option<bool>,
    /// Whether the blocking handle has been materialized.
    pub has_wait_handle: bool,
    /// Whether a notification callback is still waiting to fire.
    pub callback_pending: bool,
}

/// The eventual outcome of work that finishes synchronously or on another
/// thread.
///
/// The producer calls [`complete`](Self::complete) or [`fail`](Self::fail)
/// exactly once; the consumer calls [`retrieve`](Self::retrieve) (or
/// [`retrieve_async`](Self::retrieve_async)) exactly once. Inspection
/// accessors never block and may be called from any thread.
pub struct CompletionResult<T> {
    notification: Notification<T>,
    state: AsyncState,
    config: CompletionConfig,
    /// Set by the first completion attempt; later attempts fail.
    claimed: AtomicBool,
    completed: AtomicBool,
    /// Set once retrievers other than the callback may take the outcome.
    published: AtomicBool,
    completed_synchronously: AtomicBool,
    retrieved: AtomicBool,
    outcome: Mutex<Slot<T>>,
    /// Thread running a callback whose outcome is not yet published.
    notifier: Mutex<Option<ThreadId>>,
    wait_handle: OnceLock<WaitHandle>,
    /// The exclusive lock: serializes handle creation, asynchronous
    /// completion, and waker registration.
    waiters: Mutex<Waiters>,
}

impl<T> CompletionResult<T> {
    /// Creates a pending result with an optional callback and opaque state.
    #[must_use]
    pub fn new(callback: Option<Callback<T>>, state: AsyncState) -> Self {
        Self::with_config(callback, state, CompletionConfig::default())
    }

    /// Creates a pending result with no callback and no state.
    #[must_use]
    pub fn pending() -> Self {
        Self::new(None, AsyncState::none())
    }

    /// Creates a pending result with explicit configuration.
    #[must_use]
    pub fn with_config(
        callback: Option<Callback<T>>,
        state: AsyncState,
        config: CompletionConfig,
    ) -> Self {
        tracing::trace!(
            has_callback = callback.is_some(),
            has_state = !state.is_none(),
            policy = %config.policy(),
            "completion result created"
        );
        Self {
            notification: Notification::new(callback),
            state,
            config,
            claimed: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            published: AtomicBool::new(false),
            completed_synchronously: AtomicBool::new(false),
            retrieved: AtomicBool::new(false),
            outcome: Mutex::new(Slot::Empty),
            notifier: Mutex::new(None),
            wait_handle: OnceLock::new(),
            waiters: Mutex::new(Waiters { waker: None }),
        }
    }

    /// Returns a builder for a completion result.
    #[must_use]
    pub fn builder() -> CompletionBuilder<T> {
        CompletionBuilder::new()
    }

    /// Returns the opaque state supplied at construction.
    #[doc(alias = "context")]
    #[must_use]
    pub fn state(&self) -> &AsyncState {
        &self.state
    }

    /// Returns the configuration this result was built with.
    #[must_use]
    pub const fn config(&self) -> &CompletionConfig {
        &self.config
    }

    /// Returns true once completion has occurred.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Returns true if completion happened before the initiating call
    /// returned.
    ///
    /// Only meaningful once [`is_completed`](Self::is_completed) is true.
    #[must_use]
    pub fn completed_synchronously(&self) -> bool {
        self.completed_synchronously.load(Ordering::Acquire)
    }

    /// Returns true once retrieval has been claimed.
    #[must_use]
    pub fn is_retrieved(&self) -> bool {
        self.retrieved.load(Ordering::Acquire)
    }

    /// Returns the shared blocking handle, creating it on first access.
    ///
    /// Concurrent first accesses create exactly one handle. A handle created
    /// after the outcome was published starts out signaled.
    #[must_use]
    pub fn wait_handle(&self) -> &WaitHandle {
        if let Some(handle) = self.wait_handle.get() {
            return handle;
        }

        let _guard = self.waiters.lock();
        self.wait_handle.get_or_init(|| {
            let signaled = self.published.load(Ordering::Acquire);
            tracing::trace!(signaled, "completion wait handle created");
            WaitHandle::new(signaled)
        })
    }

    /// Returns the current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        match (self.is_completed(), self.is_retrieved()) {
            (false, false) => Phase::Created,
            (false, true) => Phase::Waiting,
            (true, false) => Phase::Completed,
            (true, true) => Phase::Retrieved,
        }
    }

    /// Returns a diagnostics snapshot.
    #[must_use]
    pub fn status(&self) -> Status {
        let phase = self.phase();
        Status {
            phase,
            completed_synchronously: matches!(phase, Phase::Completed | Phase::Retrieved)
                .then(|| self.completed_synchronously()),
            has_wait_handle: self.wait_handle.get().is_some(),
            callback_pending: self.notification.is_armed(),
        }
    }

    /// Completes the result with a value.
    ///
    /// `synchronously` states whether the work finished before the call that
    /// started it returned. Pass `true` only while no other thread can see
    /// this result.
    ///
    /// # Errors
    ///
    /// - `AlreadyCompleted` if the result was already completed.
    /// - `FatalCallbackFailure` if the notification callback failed and the
    ///   policy is [`CallbackFailurePolicy::Escalate`], or the failure could
    ///   not be captured (see [`fail`](Self::fail)). The completion itself has
    ///   still happened.
    pub fn complete(&self, synchronously: bool, value: T) -> Result<()> {
        self.settle(synchronously, Slot::Ready(value))
    }

    /// Completes the result with a failure of the underlying work.
    ///
    /// Retrieval will surface `failure` as `OperationFailure` instead of a
    /// value. A failing callback never replaces it: under
    /// [`CallbackFailurePolicy::Capture`] the callback's failure goes to the
    /// caller of `fail` instead.
    ///
    /// # Errors
    ///
    /// Same as [`complete`](Self::complete).
    pub fn fail(&self, synchronously: bool, failure: impl Into<Failure>) -> Result<()> {
        self.settle(synchronously, Slot::Failed(failure.into()))
    }

    fn settle(&self, synchronously: bool, outcome: Slot<T>) -> Result<()> {
        if self.claimed.swap(true, Ordering::AcqRel) {
            tracing::debug!(synchronously, "completion rejected: already completed");
            return Err(Error::already_completed());
        }

        let failed = matches!(outcome, Slot::Failed(_));
        *self.outcome.lock() = outcome;
        self.completed_synchronously
            .store(synchronously, Ordering::Release);

        let staged = matches!(self.config.policy(), CallbackFailurePolicy::Capture)
            && self.notification.is_armed();
        if !staged {
            self.publish(synchronously);
            tracing::debug!(synchronously, failed, "completion result completed");
            return self.notify();
        }

        self.completed.store(true, Ordering::Release);
        tracing::debug!(synchronously, failed, "completion result completed, publish staged");
        *self.notifier.lock() = Some(thread::current().id());
        let notified = self.notify();
        *self.notifier.lock() = None;
        self.publish(synchronously);
        notified
    }

    /// Makes the outcome retrievable and releases parked retrievers.
    fn publish(&self, synchronously: bool) {
        if synchronously {
            self.completed.store(true, Ordering::Release);
            self.published.store(true, Ordering::Release);
            // Only the callback can have created the handle by now.
            if let Some(handle) = self.wait_handle.get() {
                handle.set();
            }
            return;
        }

        let mut waiters = self.waiters.lock();
        self.completed.store(true, Ordering::Release);
        self.published.store(true, Ordering::Release);
        if let Some(handle) = self.wait_handle.get() {
            handle.set();
        }
        let waker = waiters.waker.take();
        drop(waiters);
        if let Some(waker) = waker {
            waker.wake();
        }
        tracing::trace!("completion outcome published");
    }

    fn notify(&self) -> Result<()> {
        let Err(err) = self.notification.fire(self) else {
            return Ok(());
        };

        tracing::warn!(
            error = %err,
            policy = %self.config.policy(),
            "completion callback failed"
        );

        match self.config.policy() {
            CallbackFailurePolicy::Escalate => Err(err),
            CallbackFailurePolicy::Capture => {
                let mut outcome = self.outcome.lock();
                if matches!(*outcome, Slot::Ready(_)) {
                    *outcome = Slot::CallbackFailed(err);
                    return Ok(());
                }
                // A failure of the work stays authoritative, and a taken
                // outcome has nobody left to carry the error.
                drop(outcome);
                Err(err)
            }
        }
    }

    /// Retrieves the outcome, parking the calling thread until completion.
    ///
    /// # Errors
    ///
    /// - `AlreadyRetrieved` on any call after the first.
    /// - `OperationFailure` carrying the exact [`Failure`] passed to
    ///   [`fail`](Self::fail).
    /// - `FatalCallbackFailure` if the callback failed under
    ///   [`CallbackFailurePolicy::Capture`].
    pub fn retrieve(&self) -> Result<T> {
        self.claim_retrieval()?;

        if !self.is_retrievable() {
            tracing::trace!("retrieve waiting for completion");
            self.wait_handle().wait();
        }

        self.finish_retrieval()
    }

    /// Claims retrieval and returns a future resolving to the outcome.
    ///
    /// Dropping the future before it resolves forfeits the outcome. If the
    /// outcome is already published at that point it is dropped and the wait
    /// handle released; otherwise both stay until the result itself is
    /// dropped.
    ///
    /// # Errors
    ///
    /// `AlreadyRetrieved` if retrieval was already claimed.
    pub fn retrieve_async(&self) -> Result<Retrieve<'_, T>> {
        self.claim_retrieval()?;
        Ok(Retrieve::new(self))
    }

    /// True once this thread may take the outcome without waiting.
    fn is_retrievable(&self) -> bool {
        self.published.load(Ordering::Acquire)
            || *self.notifier.lock() == Some(thread::current().id())
    }

    fn claim_retrieval(&self) -> Result<()> {
        if self.retrieved.swap(true, Ordering::AcqRel) {
            tracing::debug!("retrieval rejected: already retrieved");
            return Err(Error::already_retrieved());
        }
        Ok(())
    }

    /// Polls for completion on behalf of a [`Retrieve`] future.
    pub(super) fn poll_retrieve(&self, cx: &mut Context<'_>) -> Poll<Result<T>> {
        if !self.is_retrievable() {
            let mut waiters = self.waiters.lock();
            if !self.published.load(Ordering::Acquire) {
                waiters.waker = Some(cx.waker().clone());
                return Poll::Pending;
            }
        }
        Poll::Ready(self.finish_retrieval())
    }

    /// Cleans up after a [`Retrieve`] future dropped before it resolved.
    pub(super) fn abandon_retrieval(&self) {
        self.waiters.lock().waker = None;
        if self.is_retrievable() {
            let outcome = self.finish_retrieval();
            tracing::debug!(
                forfeited_ok = outcome.is_ok(),
                "pending retrieval dropped, outcome discarded"
            );
        }
    }

    fn finish_retrieval(&self) -> Result<T> {
        if let Some(handle) = self.wait_handle.get() {
            handle.close();
            tracing::trace!("completion wait handle released");
        }

        let outcome = mem::replace(&mut *self.outcome.lock(), Slot::Taken);
        match outcome {
            Slot::Ready(value) => {
                tracing::debug!("completion result retrieved");
                Ok(value)
            }
            Slot::Failed(failure) => {
                tracing::debug!(failure = %failure, "completion result retrieved with failure");
                Err(Error::operation_failure(failure))
            }
            Slot::CallbackFailed(err) => Err(err),
            Slot::Empty | Slot::Taken => {
                unreachable!("completion outcome missing after completion")
            }
        }
    }
}

impl CompletionResult<()> {
    /// Completes a value-less result.
    ///
    /// # Errors
    ///
    /// Same as [`complete`](Self::complete).
    pub fn finish(&self, synchronously: bool) -> Result<()> {
        self.complete(synchronously, ())
    }
}

impl<T> Default for CompletionResult<T> {
    fn default() -> Self {
        Self::pending()
    }
}

impl<T> fmt::Debug for CompletionResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionResult")
            .field("state", &self.state)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Move-based builder for [`CompletionResult`] and [`ImmediateValueResult`].
///
/// ```
/// use completion::{CallbackFailurePolicy, CompletionResult};
///
/// let result = CompletionResult::<u32>::builder()
///     .state("job-17")
///     .callback(|r| {
///         assert!(r.is_completed());
///         Ok(())
///     })
///     .callback_failure_policy(CallbackFailurePolicy::Capture)
///     .build();
///
/// result.complete(true, 7).unwrap();
/// assert_eq!(result.retrieve().unwrap(), 7);
/// ```
#[must_use]
pub struct CompletionBuilder<T> {
    callback: Option<Callback<T>>,
    state: AsyncState,
    config: CompletionConfig,
}

impl<T> CompletionBuilder<T> {
    /// Creates a builder with no callback, no state, and default config.
    pub fn new() -> Self {
        Self {
            callback: None,
            state: AsyncState::none(),
            config: CompletionConfig::default(),
        }
    }

    /// Sets the notification callback.
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&CompletionResult<T>) -> CallbackResult + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Sets the opaque state.
    pub fn state<S: std::any::Any + Send + Sync>(mut self, state: S) -> Self {
        self.state = AsyncState::new(state);
        self
    }

    /// Sets already wrapped opaque state.
    pub fn async_state(mut self, state: AsyncState) -> Self {
        self.state = state;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: CompletionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the callback failure policy.
    pub fn callback_failure_policy(mut self, policy: CallbackFailurePolicy) -> Self {
        self.config = self.config.callback_failure_policy(policy);
        self
    }

    /// Builds a pending result.
    pub fn build(self) -> CompletionResult<T> {
        CompletionResult::with_config(self.callback, self.state, self.config)
    }

    /// Builds a result that is already completed with `value`.
    ///
    /// # Errors
    ///
    /// `FatalCallbackFailure` if the callback fails under the escalate
    /// policy.
    pub fn build_immediate(self, value: T) -> Result<ImmediateValueResult<T>> {
        ImmediateValueResult::from_parts(value, self.build())
    }
}

impl<T> Default for CompletionBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
