//! Configuration for completion results.
//!
//! No configuration is required: [`CompletionConfig::default`] gives the
//! behavior most producers want. The only knob decides what happens when the
//! notification callback fails while completion is running.
//!
//! ```
//! use completion::{CallbackFailurePolicy, CompletionConfig};
//!
//! let config = CompletionConfig::new()
//!     .callback_failure_policy(CallbackFailurePolicy::Capture);
//! assert_eq!(config.policy(), CallbackFailurePolicy::Capture);
//! ```

use std::str::FromStr;

use serde::Serialize;

/// Environment variable read by [`CompletionConfig::from_env`].
pub const CALLBACK_POLICY_ENV: &str = "COMPLETION_CALLBACK_POLICY";

/// What to do when the notification callback fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum CallbackFailurePolicy {
    /// Return `FatalCallbackFailure` to whoever called `complete`/`fail`.
    ///
    /// The completion itself has already happened; retrieval still yields
    /// the outcome of the work.
    #[default]
    Escalate,
    /// Keep the callback failure and surface it from retrieval as
    /// `FatalCallbackFailure`, in place of the value.
    ///
    /// Retrievers are held back until the callback returns. A failure of the
    /// work is never replaced; if the outcome is one, or the callback already
    /// retrieved it, the callback failure is escalated as with `Escalate`.
    Capture,
}

impl CallbackFailurePolicy {
    /// Returns the lowercase name used in the environment.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Escalate => "escalate",
            Self::Capture => "capture",
        }
    }
}

impl std::fmt::Display for CallbackFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CallbackFailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "escalate" => Ok(Self::Escalate),
            "capture" => Ok(Self::Capture),
            other => Err(ConfigError::InvalidPolicy(other.to_string())),
        }
    }
}

/// Errors produced while loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The callback policy value is not recognized.
    #[error("invalid callback failure policy {0:?} (expected \"escalate\" or \"capture\")")]
    InvalidPolicy(String),
}

/// Configuration shared by every completion result built with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CompletionConfig {
    policy: CallbackFailurePolicy,
}

impl CompletionConfig {
    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            policy: CallbackFailurePolicy::Escalate,
        }
    }

    /// Sets the callback failure policy.
    #[must_use]
    pub const fn callback_failure_policy(mut self, policy: CallbackFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the callback failure policy.
    #[must_use]
    pub const fn policy(&self) -> CallbackFailurePolicy {
        self.policy
    }

    /// Loads configuration from `COMPLETION_CALLBACK_POLICY`.
    ///
    /// An unset variable yields the default configuration.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::new();
        if let Some(raw) = lookup(CALLBACK_POLICY_ENV) {
            config.policy = raw.parse()?;
        }
        tracing::debug!(policy = %config.policy, "loaded completion config");
        Ok(config)
    }
}
