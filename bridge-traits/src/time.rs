//! Time source abstraction.
//!
//! The sleep timer and favorites timestamps read wall-clock time through this
//! trait so tests can drive deadlines deterministically.

use crate::platform::PlatformSendSync;

/// Wall-clock time source.
pub trait Clock: PlatformSendSync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// System clock backed by `std::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_past_2020() {
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }
}
