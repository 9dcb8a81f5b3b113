//! Search input debouncing.

use std::time::Duration;

use crate::config::DEFAULT_SEARCH_DEBOUNCE;
use crate::refresh::RequestTracker;

/// Lets a value through only once input has been quiet for `quiet`.
///
/// Each call to [`settle`](Debouncer::settle) supersedes the calls before
/// it; of a burst of keystrokes only the last one yields its value.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    tracker: RequestTracker,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEBOUNCE)
    }
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            tracker: RequestTracker::new(),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Wait out the quiet period; `None` if newer input arrived meanwhile.
    pub async fn settle<T>(&self, value: T) -> Option<T> {
        let ticket = self.tracker.issue();
        if !self.quiet.is_zero() {
            tokio::time::sleep(self.quiet).await;
        }
        self.tracker.is_current(ticket).then_some(value)
    }
}
