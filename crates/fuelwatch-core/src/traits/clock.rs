// # Clock Trait
//
// Wall-clock seam for the engine. Absence transitions and confidence
// classification both need "now"; tests substitute a fixed clock.

use chrono::NaiveDateTime;

/// Source of the current local time
pub trait Clock: Send + Sync {
    /// Current local wall-clock time
    fn now(&self) -> NaiveDateTime;
}

/// The system's local clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}
