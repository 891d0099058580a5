use std::any::Any;
use std::time::Instant;

use super::{Accumulator, Category, Component};

fn monotonic_secs(epoch: Instant) -> f64 {
    epoch.elapsed().as_secs_f64()
}

/// Wall-clock duration of the bracketed region, in seconds.
///
/// This is the component behind [`timer`][crate::timer] and the default
/// when a scoped measurement does not name an explicit component set.
#[derive(Debug, Clone)]
pub struct WallClock {
    epoch: Instant,
    acc: Accumulator,
}

impl Default for WallClock {
    fn default() -> Self {
        WallClock {
            epoch: Instant::now(),
            acc: Accumulator::default(),
        }
    }
}

impl Component for WallClock {
    fn start(&mut self) {
        self.acc.start(monotonic_secs(self.epoch));
    }

    fn stop(&mut self) {
        self.acc.stop(monotonic_secs(self.epoch));
    }

    fn record(&self) -> f64 {
        self.acc.value
    }

    fn accum(&self) -> f64 {
        self.acc.accum
    }

    fn min(&self) -> f64 {
        self.acc.min
    }

    fn max(&self) -> f64 {
        self.acc.max
    }

    fn laps(&self) -> u64 {
        self.acc.laps
    }

    fn stddev(&self) -> f64 {
        self.acc.stddev()
    }

    fn is_running(&self) -> bool {
        self.acc.is_running()
    }

    fn unit(&self) -> &'static str {
        "sec"
    }

    fn category(&self) -> Category {
        Category::Timing
    }

    fn merge(&mut self, other: &dyn Component) {
        match other.as_any().downcast_ref::<WallClock>() {
            Some(other) => self.acc.merge(&other.acc),
            None => log::warn!("WallClock::merge: component type mismatch, ignoring"),
        }
    }

    fn minus(&mut self, other: &dyn Component) {
        match other.as_any().downcast_ref::<WallClock>() {
            Some(other) => self.acc.minus(&other.acc),
            None => log::warn!("WallClock::minus: component type mismatch, ignoring"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn zeroed_like(&self) -> Box<dyn Component> {
        Box::new(WallClock::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_positive_duration() {
        let mut w = WallClock::default();
        w.start();
        std::thread::sleep(std::time::Duration::from_millis(5));
        w.stop();
        assert!(w.record() > 0.0);
        assert_eq!(w.laps(), 1);
    }
}
