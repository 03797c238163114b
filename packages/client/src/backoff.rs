//! Reconnect backoff as a pure function of the failure count.

use std::time::Duration;

/// Delay before the first reconnect attempt.
pub const RECONNECT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on the reconnect delay.
pub const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(30);

/// A session that stays open at least this long resets the failure count.
pub const STABLE_CONNECTION_PERIOD: Duration = Duration::from_secs(30);

/// Delay before the next reconnect attempt, given how many consecutive
/// failures have occurred so far (1 for the first). Doubles per failure up
/// to [`RECONNECT_MAX_DELAY`].
pub fn delay_for_attempt(consecutive_failures: u32) -> Duration {
    let exponent = consecutive_failures.saturating_sub(1).min(31);
    RECONNECT_BASE_DELAY
        .saturating_mul(2u32.saturating_pow(exponent))
        .min(RECONNECT_MAX_DELAY)
}
