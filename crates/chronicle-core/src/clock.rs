//! Time source for stamping raised events.
//!
//! Aggregates never read the wall clock themselves; the caller passes a
//! [`Clock`] into every operation that raises events so that `occurred_at`
//! can be pinned in tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Supplies `occurred_at` for newly raised events.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
