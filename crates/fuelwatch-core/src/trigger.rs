//! Per-cycle notification decision

use crate::reconcile::CycleSummary;
use crate::traits::Signal;

/// Pick the one signal a cycle announces, if any
///
/// Positive wins over negative when both kinds of change occurred.
pub fn select_signal(summary: &CycleSummary) -> Option<Signal> {
    if summary.any_available {
        Some(Signal::Positive)
    } else if summary.any_unavailable {
        Some(Signal::Negative)
    } else {
        None
    }
}
