use std::any::Any;
use std::mem::MaybeUninit;

use super::{Accumulator, Category, Component};

fn peak_rss_kb() -> f64 {
    let mut usage = MaybeUninit::<libc::rusage>::uninit();
    // SAFETY: `usage` is a valid out-pointer for `getrusage`; `RUSAGE_THREAD`
    // is supported on Linux since 2.6.26.
    let rc = unsafe { libc::getrusage(libc::RUSAGE_THREAD, usage.as_mut_ptr()) };
    if rc != 0 {
        log::debug!("PeakRss: getrusage failed, reporting 0");
        return 0.0;
    }
    // SAFETY: `getrusage` returned 0, so `usage` is initialized.
    let usage = unsafe { usage.assume_init() };
    // `ru_maxrss` is already in KB on Linux.
    usage.ru_maxrss as f64
}

/// Peak resident-set-size delta observed while the region was open, in KB.
///
/// `getrusage` reports the high-water mark since process start, not a
/// per-interval delta, so `stop` records `max(0, current - baseline)`: the
/// growth attributable to this interval specifically.
#[derive(Debug, Clone, Default)]
pub struct PeakRss {
    acc: Accumulator,
}

impl Component for PeakRss {
    fn start(&mut self) {
        self.acc.start(peak_rss_kb());
    }

    fn stop(&mut self) {
        let mut now = peak_rss_kb();
        if let Some(baseline) = self.acc.baseline {
            if now < baseline {
                now = baseline;
            }
        }
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
        "KB"
    }

    fn category(&self) -> Category {
        Category::Memory
    }

    fn merge(&mut self, other: &dyn Component) {
        match other.as_any().downcast_ref::<PeakRss>() {
            Some(other) => self.acc.merge(&other.acc),
            None => log::warn!("PeakRss::merge: component type mismatch, ignoring"),
        }
    }

    fn minus(&mut self, other: &dyn Component) {
        match other.as_any().downcast_ref::<PeakRss>() {
            Some(other) => self.acc.minus(&other.acc),
            None => log::warn!("PeakRss::minus: component type mismatch, ignoring"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn zeroed_like(&self) -> Box<dyn Component> {
        Box::new(PeakRss::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_falling_rss_sample_clamps_to_zero_everywhere_not_just_record() {
        let mut acc = Accumulator::default();
        acc.start(1000.0);
        let mut now = 400.0; // rusage dropped below baseline between samples
        if let Some(baseline) = acc.baseline {
            if now < baseline {
                now = baseline;
            }
        }
        acc.stop(now);

        assert_eq!(acc.value, 0.0);
        assert_eq!(acc.accum, 0.0, "a clamped-before-stop delta must not leave a negative trace in accum");
        assert_eq!(acc.sum_sq, 0.0, "nor in sum_sq, which would otherwise skew stddev");
    }
}
