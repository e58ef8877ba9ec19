//! Backoff policy for the Delivery Engine's `RETRY_WAIT` state (§4.H):
//! exponential with a cap and jitter, minimum 50 ms, maximum 30 s.
//!
//! Generalized from this codebase's existing `ExponentialBackoffPolicy`
//! (base delay doubled per attempt, capped) by dropping its coupling to
//! `tonic::Status` and adding jitter, which the delivery contract requires
//! but the gRPC-era policy never implemented.

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub const MIN_DELAY: Duration = Duration::from_millis(50);
    pub const MAX_DELAY: Duration = Duration::from_secs(30);

    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base: base.max(Self::MIN_DELAY), max: max.min(Self::MAX_DELAY) }
    }

    pub fn delivery_default() -> Self {
        Self::new(Self::MIN_DELAY, Self::MAX_DELAY)
    }

    /// Full-jitter exponential backoff: `random(base, min(max, base * 2^attempt))`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.base.as_millis().saturating_mul(1u128 << attempt.min(20));
        let cap = exp.min(self.max.as_millis());
        let base_ms = self.base.as_millis() as u64;
        let cap_ms = cap as u64;
        let jittered = if cap_ms <= base_ms { base_ms } else { rand::thread_rng().gen_range(base_ms..=cap_ms) };
        Duration::from_millis(jittered)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::delivery_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_never_below_floor_or_above_ceiling() {
        let backoff = Backoff::delivery_default();
        for attempt in 0..15 {
            let delay = backoff.delay_for_attempt(attempt);
            assert!(delay >= Backoff::MIN_DELAY);
            assert!(delay <= Backoff::MAX_DELAY);
        }
    }

    #[test]
    fn delay_grows_with_attempt_on_average() {
        let backoff = Backoff::delivery_default();
        let early: u128 = (0..5).map(|a| backoff.delay_for_attempt(a).as_millis()).sum();
        let later: u128 = (10..15).map(|a| backoff.delay_for_attempt(a).as_millis()).sum();
        assert!(later >= early);
    }
}
