//! Plain client settings, loadable from configuration files.

use std::time::Duration;

/// What to do when the directory itself cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DirectoryPolicy {
    /// Serve the fallback, as for any other infrastructure failure.
    #[default]
    Tolerate,
    /// Surface [`LookupError::DirectoryUnavailable`](crate::LookupError::DirectoryUnavailable) to the caller.
    Require,
}

/// Which endpoint selector the client uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SelectorPolicy {
    #[default]
    FirstAvailable,
    RoundRobin,
}

/// Settings for a [`ResilientClient`](crate::ResilientClient).
///
/// Durations are in milliseconds so the struct maps directly onto flat
/// configuration formats. Apply with
/// [`ClientBuilder::settings`](crate::ClientBuilder::settings).
///
/// ```rust
/// use resilient_lookup::{ClientSettings, DirectoryPolicy};
///
/// let settings = ClientSettings {
///     failure_threshold: 3,
///     directory_policy: DirectoryPolicy::Require,
///     services: vec!["reservationservice".into()],
///     ..ClientSettings::default()
/// };
/// assert_eq!(settings.default_timeout_ms, 1_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClientSettings {
    /// Consecutive countable failures that open a breaker.
    pub failure_threshold: usize,
    /// How long an open breaker waits before admitting a trial.
    pub reset_timeout_ms: u64,
    /// Deadline used by the convenience operations.
    pub default_timeout_ms: u64,
    pub directory_policy: DirectoryPolicy,
    pub selector: SelectorPolicy,
    /// Services to create breakers for.
    pub services: Vec<String>,
}

impl ClientSettings {
    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 1,
            reset_timeout_ms: 5_000,
            default_timeout_ms: 1_000,
            directory_policy: DirectoryPolicy::Tolerate,
            selector: SelectorPolicy::FirstAvailable,
            services: Vec::new(),
        }
    }
}
