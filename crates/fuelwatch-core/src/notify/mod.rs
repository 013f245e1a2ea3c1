//! Built-in notifiers
//!
//! - [`LogNotifier`]: writes the signal to the tracing log
//! - [`CommandNotifier`]: spawns an external program per signal, e.g. an
//!   audio player with a WAV file
//!
//! The command notifier never waits for the program to finish. A poll cycle
//! is not held up by a slow sound, and a crashing player only produces a
//! warning.

use async_trait::async_trait;
use std::process::Stdio;
use tracing::{debug, info};

use crate::config::NotifierConfig;
use crate::error::{Error, Result};
use crate::traits::{Notifier, NotifierFactory, Signal};

/// Notifier that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, signal: Signal) -> Result<()> {
        info!("Signal: {}", signal);
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "log"
    }
}

/// Notifier that spawns a program per signal
///
/// Each command is a program followed by its arguments. An empty command
/// means that signal is silent.
#[derive(Debug, Clone, Default)]
pub struct CommandNotifier {
    positive: Vec<String>,
    negative: Vec<String>,
}

impl CommandNotifier {
    /// Create a command notifier
    pub fn new(positive: Vec<String>, negative: Vec<String>) -> Self {
        Self { positive, negative }
    }

    /// Command run for `signal`
    pub fn command_for(&self, signal: Signal) -> &[String] {
        match signal {
            Signal::Positive => &self.positive,
            Signal::Negative => &self.negative,
        }
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn notify(&self, signal: Signal) -> Result<()> {
        let Some((program, args)) = self.command_for(signal).split_first() else {
            debug!("No command configured for {} signal", signal);
            return Ok(());
        };

        let child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
            .map_err(|e| Error::notifier(format!("Failed to spawn '{}': {}", program, e)))?;

        debug!(
            "Spawned '{}' (pid {:?}) for {} signal",
            program,
            child.id(),
            signal
        );
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "command"
    }
}

/// Factory for [`LogNotifier`]
pub struct LogNotifierFactory;

impl NotifierFactory for LogNotifierFactory {
    fn create(&self, _config: &NotifierConfig) -> Result<Box<dyn Notifier>> {
        Ok(Box::new(LogNotifier))
    }
}

/// Factory for [`CommandNotifier`]
pub struct CommandNotifierFactory;

impl NotifierFactory for CommandNotifierFactory {
    fn create(&self, config: &NotifierConfig) -> Result<Box<dyn Notifier>> {
        match config {
            NotifierConfig::Command { positive, negative } => Ok(Box::new(CommandNotifier::new(
                positive.clone(),
                negative.clone(),
            ))),
            other => Err(Error::config(format!(
                "Command notifier factory cannot build a '{}' notifier",
                other.type_name()
            ))),
        }
    }
}
