//! Awaitable retrieval.
//!
//! [`Retrieve`] is what [`CompletionResult::retrieve_async`] hands back: the
//! same single retrieval as the blocking call, but the consumer awaits
//! instead of parking a thread. Retrieval is claimed when the future is
//! created, so a second `retrieve_async` fails immediately rather than on
//! first poll.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::CompletionResult;
use crate::error::Result;

/// Future returned by [`CompletionResult::retrieve_async`].
#[must_use = "futures do nothing unless polled"]
#[derive(Debug)]
pub struct Retrieve<'a, T> {
    result: Option<&'a CompletionResult<T>>,
}

impl<'a, T> Retrieve<'a, T> {
    pub(super) const fn new(result: &'a CompletionResult<T>) -> Self {
        Self {
            result: Some(result),
        }
    }
}

impl<T> Future for Retrieve<'_, T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let result = self
            .result
            .expect("Retrieve polled after it resolved");
        match result.poll_retrieve(cx) {
            Poll::Ready(outcome) => {
                self.result = None;
                Poll::Ready(outcome)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for Retrieve<'_, T> {
    fn drop(&mut self) {
        if let Some(result) = self.result {
            result.abandon_retrieval();
        }
    }
}
