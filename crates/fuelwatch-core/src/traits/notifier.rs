// # Notifier Trait
//
// Defines the interface for announcing availability changes.
//
// ## Implementations
//
// - Tracing-only: `notify::LogNotifier`
// - External program per signal: `notify::CommandNotifier`

use async_trait::async_trait;
use std::fmt;

/// What a poll cycle announces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// The fuel became (or is still, more freshly) available somewhere
    Positive,
    /// The fuel became unavailable somewhere
    Negative,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Positive => f.write_str("positive"),
            Signal::Negative => f.write_str("negative"),
        }
    }
}

/// Trait for notifier implementations
///
/// Receives at most one signal per cycle and carries no payload beyond it.
/// Failures are logged by the engine and never fail the cycle.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Announce a signal
    async fn notify(&self, signal: Signal) -> Result<(), crate::Error>;

    /// Name of this notifier, for logs
    fn notifier_name(&self) -> &'static str;
}

/// Helper trait for constructing notifiers from configuration
pub trait NotifierFactory: Send + Sync {
    /// Create a Notifier instance from configuration
    fn create(
        &self,
        config: &crate::config::NotifierConfig,
    ) -> Result<Box<dyn Notifier>, crate::Error>;
}
