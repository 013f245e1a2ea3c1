// # Change Log Implementations
//
// This module provides implementations of the ChangeLog trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileChangeLog;
pub use memory::MemoryChangeLog;
