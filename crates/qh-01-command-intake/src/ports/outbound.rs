//! Outbound (Driven) ports for command intake.

use chrono::{DateTime, Utc};

/// Time source for expiry checks.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current UTC instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// Mock time source for testing.
#[cfg(test)]
pub struct MockTimeSource {
    millis: std::sync::atomic::AtomicI64,
}

#[cfg(test)]
impl MockTimeSource {
    pub fn new(initial: DateTime<Utc>) -> Self {
        Self {
            millis: std::sync::atomic::AtomicI64::new(initial.timestamp_millis()),
        }
    }

    pub fn at_secs(secs: i64) -> Self {
        Self {
            millis: std::sync::atomic::AtomicI64::new(secs * 1000),
        }
    }

    pub fn advance_millis(&self, ms: i64) {
        self.millis
            .fetch_add(ms, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl TimeSource for MockTimeSource {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(std::sync::atomic::Ordering::SeqCst))
            .unwrap_or_default()
    }
}
