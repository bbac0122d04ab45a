//! Short-lived suppression of repeated target builds.

use crate::build::TargetRef;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Default time a target stays suppressed after it starts building.
pub const DEFAULT_SUPPRESSION_WINDOW: Duration = Duration::from_millis(800);

/// Per-target suppression entries with self-expiring deadlines.
#[derive(Debug)]
pub struct SuppressionWindow {
    window: Duration,
    entries: Mutex<HashMap<TargetRef, Instant>>,
}

impl SuppressionWindow {
    /// Create a window of the given length.
    pub fn new(window: Duration) -> Self {
        Self { window, entries: Mutex::new(HashMap::new()) }
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Try to claim a target for building.
    ///
    /// Returns `false` while a previous claim is live. A successful claim
    /// starts a new window.
    pub fn try_claim(&self, target: TargetRef) -> bool {
        self.try_claim_at(target, Instant::now())
    }

    fn try_claim_at(&self, target: TargetRef, now: Instant) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, expiry| *expiry > now);
        if entries.contains_key(&target) {
            return false;
        }
        entries.insert(target, now + self.window);
        true
    }

    /// Whether a target is currently suppressed.
    pub fn is_live(&self, target: TargetRef) -> bool {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(&target).is_some_and(|expiry| *expiry > Instant::now())
    }
}

impl Default for SuppressionWindow {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPRESSION_WINDOW)
    }
}
