use std::any::Any;

use super::{Accumulator, Category, Component};

fn thread_cpu_secs() -> f64 {
    // CLOCK_THREAD_CPUTIME_ID reads CPU time consumed by the calling
    // thread, matching the design's per-thread ownership of a CallGraph
    // store -- no locking or cross-thread reads are involved.
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid out-pointer for `clock_gettime`; the call
    // cannot fail for a fixed, always-supported clock id.
    unsafe {
        libc::clock_gettime(libc::CLOCK_THREAD_CPUTIME_ID, &mut ts);
    }
    ts.tv_sec as f64 + ts.tv_nsec as f64 / 1.0e9
}

/// CPU time consumed by the current thread during the bracketed region, in
/// seconds.
#[derive(Debug, Clone, Default)]
pub struct CpuTime {
    acc: Accumulator,
}

impl Component for CpuTime {
    fn start(&mut self) {
        self.acc.start(thread_cpu_secs());
    }

    fn stop(&mut self) {
        self.acc.stop(thread_cpu_secs());
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
        match other.as_any().downcast_ref::<CpuTime>() {
            Some(other) => self.acc.merge(&other.acc),
            None => log::warn!("CpuTime::merge: component type mismatch, ignoring"),
        }
    }

    fn minus(&mut self, other: &dyn Component) {
        match other.as_any().downcast_ref::<CpuTime>() {
            Some(other) => self.acc.minus(&other.acc),
            None => log::warn!("CpuTime::minus: component type mismatch, ignoring"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn zeroed_like(&self) -> Box<dyn Component> {
        Box::new(CpuTime::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_non_negative_duration() {
        let mut c = CpuTime::default();
        c.start();
        std::hint::black_box((0..1_000_000u64).sum::<u64>());
        c.stop();
        assert!(c.record() >= 0.0);
        assert_eq!(c.laps(), 1);
    }
}
