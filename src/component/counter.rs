use std::any::Any;
use std::sync::Arc;

use super::{Accumulator, Category, Component};

/// A user-pluggable counter component, reading an arbitrary monotonically
/// increasing value (a hardware counter, a PAPI event, a CUDA kernel
/// counter) through a caller-supplied sampling function.
///
/// This is the built-in stand-in for the "Component capability" backends
/// the design treats as external collaborators (PAPI, CUDA): rather than
/// embedding those SDKs, the core exposes the same [`Component`] trait and
/// a `Counter` that any such backend can be wrapped in without touching
/// core code.
#[derive(Clone)]
pub struct Counter {
    name: &'static str,
    unit: &'static str,
    sample: Arc<dyn Fn() -> f64 + Send + Sync>,
    acc: Accumulator,
}

impl Counter {
    pub fn new(
        name: &'static str,
        unit: &'static str,
        sample: impl Fn() -> f64 + Send + Sync + 'static,
    ) -> Self {
        Counter {
            name,
            unit,
            sample: Arc::new(sample),
            acc: Accumulator::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Counter")
            .field("name", &self.name)
            .field("unit", &self.unit)
            .field("acc", &self.acc)
            .finish()
    }
}

impl Component for Counter {
    fn start(&mut self) {
        let now = (self.sample)();
        self.acc.start(now);
    }

    fn stop(&mut self) {
        let now = (self.sample)();
        self.acc.stop(now);
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
        self.unit
    }

    fn category(&self) -> Category {
        Category::Other
    }

    fn merge(&mut self, other: &dyn Component) {
        match other.as_any().downcast_ref::<Counter>() {
            Some(other) if other.name == self.name => self.acc.merge(&other.acc),
            Some(other) => log::warn!(
                "Counter::merge: name mismatch (`{}` vs `{}`), ignoring",
                self.name,
                other.name
            ),
            None => log::warn!("Counter::merge: component type mismatch, ignoring"),
        }
    }

    fn minus(&mut self, other: &dyn Component) {
        match other.as_any().downcast_ref::<Counter>() {
            Some(other) if other.name == self.name => self.acc.minus(&other.acc),
            Some(other) => log::warn!(
                "Counter::minus: name mismatch (`{}` vs `{}`), ignoring",
                self.name,
                other.name
            ),
            None => log::warn!("Counter::minus: component type mismatch, ignoring"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn zeroed_like(&self) -> Box<dyn Component> {
        Box::new(Counter {
            name: self.name,
            unit: self.unit,
            sample: Arc::clone(&self.sample),
            acc: Accumulator::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn samples_via_closure() {
        let value = Arc::new(AtomicU64::new(0));
        let read = Arc::clone(&value);
        let mut counter = Counter::new("events", "count", move || read.load(Ordering::Relaxed) as f64);

        counter.start();
        value.store(42, Ordering::Relaxed);
        counter.stop();

        assert_eq!(counter.record(), 42.0);
    }
}
