//! Time source abstraction providing the timing primitives required by the
//! transmit arbiter (inter-frame spacing, resync breaks, lock timeout) and by
//! liveness tracking.
use embassy_time::{Duration, Instant};
use futures_util::Future;

/// Clock trait abstraction; `now` must be monotonic.
pub trait LinkClock {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Asynchronously wait for `duration`.
    fn delay(&self, duration: Duration) -> impl Future<Output = ()> + '_;
}
