//! Retry backoff

use std::time::Duration;

/// Capped exponential backoff: `base * 2^(attempt - 1)`, at most `max`
///
/// `attempt` is 1-based. Attempt 0 yields no delay.
pub fn exponential(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(max).min(max)
}
