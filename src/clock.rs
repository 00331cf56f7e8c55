//! Injectable time source.
//!
//! Date-range defaulting in the fetch path depends on "today", so the clock
//! is passed in explicitly rather than read ambiently. Production code uses
//! [`SystemClock`]; tests substitute a fixed clock to pin the resolved window.

use chrono::{DateTime, NaiveDate, Utc};

// ---

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    // ---
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar date in UTC.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    // ---
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
