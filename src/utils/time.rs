// src/utils/time.rs
//! Clock abstraction for sample timestamps and calibration expiry

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Time provider trait for dependency injection and testing
pub trait TimeProvider: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;

    /// Current time as epoch milliseconds
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// System time provider using actual system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Mock time provider for deterministic testing
#[derive(Debug)]
pub struct MockTimeProvider {
    current_millis: AtomicI64,
}

impl MockTimeProvider {
    /// Start the mock clock at the given epoch milliseconds
    pub fn new(initial_millis: i64) -> Self {
        Self {
            current_millis: AtomicI64::new(initial_millis),
        }
    }

    /// Move the clock forward
    pub fn advance_by(&self, millis: i64) {
        self.current_millis.fetch_add(millis, Ordering::Relaxed);
    }

    /// Jump the clock to an absolute time
    pub fn set_time(&self, millis: i64) {
        self.current_millis.store(millis, Ordering::Relaxed);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        millis_to_datetime(self.current_millis.load(Ordering::Relaxed))
    }

    fn now_millis(&self) -> i64 {
        self.current_millis.load(Ordering::Relaxed)
    }
}

/// Shared clock, so a test can keep a handle to a mock it injected
impl<T: TimeProvider + ?Sized> TimeProvider for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn now_millis(&self) -> i64 {
        (**self).now_millis()
    }
}

/// Convert epoch milliseconds to a UTC timestamp, saturating to the epoch when out of range
pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
