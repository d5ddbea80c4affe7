//! Time and count aliases shared by the hit counters.
//!
//! Counters are driven by caller-supplied timestamps in whole seconds. Any
//! monotonic source works: Unix seconds, seconds since process start, or a
//! logical clock in tests.

use std::time::{SystemTime, UNIX_EPOCH};

/// Alias for the timestamp type accepted by the hit counters, in seconds.
///
/// Signed so that callers can use offsets from an arbitrary origin. Bucket
/// placement uses Euclidean remainder, so negative timestamps land in valid
/// buckets too.
pub type Tick = i64;

/// Alias for the hit count type returned by the hit counters.
pub type Count = u64;

/// Returns the current wall-clock time as whole seconds since the Unix epoch.
///
/// A clock set before 1970 yields `0`.
pub fn unix_seconds() -> Tick {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as Tick)
        .unwrap_or(0)
}
