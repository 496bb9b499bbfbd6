//! Opaque caller state carried by a completion result.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque state supplied at construction and handed back verbatim.
///
/// The state is shared, never copied: [`AsyncState::as_arc`] returns the very
/// allocation the producer passed in.
#[derive(Clone, Default)]
pub struct AsyncState(Option<Arc<dyn Any + Send + Sync>>);

impl AsyncState {
    /// No state.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// Wraps a value as state.
    #[must_use]
    pub fn new<S: Any + Send + Sync>(state: S) -> Self {
        Self(Some(Arc::new(state)))
    }

    /// Wraps already shared state.
    #[must_use]
    pub fn from_arc(state: Arc<dyn Any + Send + Sync>) -> Self {
        Self(Some(state))
    }

    /// Returns true if no state was supplied.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Returns the shared state, if any.
    #[must_use]
    pub fn as_arc(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        self.0.as_ref()
    }

    /// Returns the state as `S` if it is one.
    #[must_use]
    pub fn downcast_ref<S: Any>(&self) -> Option<&S> {
        self.0.as_deref().and_then(|state| state.downcast_ref::<S>())
    }
}

impl fmt::Debug for AsyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(_) => f.write_str("AsyncState(Some(..))"),
            None => f.write_str("AsyncState(None)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_has_nothing() {
        let state = AsyncState::none();
        assert!(state.is_none());
        assert!(state.downcast_ref::<u32>().is_none());
        assert_eq!(format!("{state:?}"), "AsyncState(None)");
    }

    #[test]
    fn typed_access() {
        let state = AsyncState::new(String::from("request-7"));
        assert_eq!(state.downcast_ref::<String>().map(String::as_str), Some("request-7"));
        assert!(state.downcast_ref::<u32>().is_none());
    }

    #[test]
    fn shared_state_is_verbatim() {
        let shared: Arc<dyn Any + Send + Sync> = Arc::new(5_u64);
        let state = AsyncState::from_arc(Arc::clone(&shared));
        let back = state.as_arc().expect("state present");
        assert!(Arc::ptr_eq(back, &shared));
    }
}
