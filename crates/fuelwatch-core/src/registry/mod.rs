//! Plugin-based component registry
//!
//! The registry maps feed source and notifier type names to factories, so
//! the daemon builds components from configuration without hardcoded
//! if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fuelwatch_core::registry::Registry;
//! use fuelwatch_core::config::{FeedConfig, NotifierConfig};
//!
//! let registry = Registry::with_builtin_notifiers();
//!
//! // In fuelwatch-feed-economie
//! fuelwatch_feed_economie::register(&registry);
//!
//! let feed = registry.create_feed(&FeedConfig::default())?;
//! let notifier = registry.create_notifier(&NotifierConfig::Log)?;
//! ```

use crate::config::{FeedConfig, NotifierConfig};
use crate::error::{Error, Result};
use crate::notify::{CommandNotifierFactory, LogNotifierFactory};
use crate::traits::{FeedSource, FeedSourceFactory, Notifier, NotifierFactory};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Registry of feed source and notifier factories
///
/// ## Thread Safety
///
/// Interior mutability with RwLock: registration takes `&self`, concurrent
/// lookups share the read lock.
#[derive(Default)]
pub struct Registry {
    /// Registered feed source factories
    feeds: RwLock<HashMap<String, Box<dyn FeedSourceFactory>>>,

    /// Registered notifier factories
    notifiers: RwLock<HashMap<String, Box<dyn NotifierFactory>>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the `log` and `command` notifiers registered
    pub fn with_builtin_notifiers() -> Self {
        let registry = Self::new();
        registry.register_notifier("log", Box::new(LogNotifierFactory));
        registry.register_notifier("command", Box::new(CommandNotifierFactory));
        registry
    }

    /// Register a feed source factory
    ///
    /// # Parameters
    ///
    /// - `name`: Feed type name (e.g., "economie")
    /// - `factory`: Factory object for creating feed source instances
    pub fn register_feed(&self, name: impl Into<String>, factory: Box<dyn FeedSourceFactory>) {
        write(&self.feeds).insert(name.into(), factory);
    }

    /// Register a notifier factory
    pub fn register_notifier(&self, name: impl Into<String>, factory: Box<dyn NotifierFactory>) {
        write(&self.notifiers).insert(name.into(), factory);
    }

    /// Create a feed source from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn FeedSource>)`: Created feed source
    /// - `Err(Error)`: If the feed type is not registered or creation fails
    pub fn create_feed(&self, config: &FeedConfig) -> Result<Box<dyn FeedSource>> {
        let feed_type = config.type_name();
        let feeds = read(&self.feeds);

        let factory = feeds
            .get(feed_type)
            .ok_or_else(|| Error::config(format!("Unknown feed type: {}", feed_type)))?;

        factory.create(config)
    }

    /// Create a notifier from configuration
    pub fn create_notifier(&self, config: &NotifierConfig) -> Result<Box<dyn Notifier>> {
        let notifier_type = config.type_name();
        let notifiers = read(&self.notifiers);

        let factory = notifiers
            .get(notifier_type)
            .ok_or_else(|| Error::config(format!("Unknown notifier type: {}", notifier_type)))?;

        factory.create(config)
    }

    /// List all registered feed types
    pub fn list_feeds(&self) -> Vec<String> {
        read(&self.feeds).keys().cloned().collect()
    }

    /// List all registered notifier types
    pub fn list_notifiers(&self) -> Vec<String> {
        read(&self.notifiers).keys().cloned().collect()
    }

    /// Check if a feed type is registered
    pub fn has_feed(&self, name: &str) -> bool {
        read(&self.feeds).contains_key(name)
    }

    /// Check if a notifier type is registered
    pub fn has_notifier(&self, name: &str) -> bool {
        read(&self.notifiers).contains_key(name)
    }
}
