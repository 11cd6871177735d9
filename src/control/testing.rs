use embedded_time::{clock, fraction::Fraction, Clock, Instant};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Microsecond clock that only moves when told to.
#[derive(Clone, Debug, Default)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub fn set(&self, micros: u64) {
        self.0.store(micros, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    type T = u64;

    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

    fn try_now(&self) -> Result<Instant<Self>, clock::Error> {
        Ok(Instant::new(self.0.load(Ordering::SeqCst)))
    }
}
