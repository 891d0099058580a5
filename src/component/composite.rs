use std::any::Any;

use super::{Category, Component};

/// A fixed set of components measured together over the same region
/// (`measure(label [, scope] [, component_set])`).
///
/// `start`/`stop` are forwarded to every member; the aggregate accessors
/// (`record`, `accum`, `min`, `max`, `laps`, `unit`, `category`) report the
/// first ("primary") member, matching the common case of one dominant
/// measurement (usually wall time) plus secondary ones read out via
/// [`Composite::members`].
pub struct Composite {
    members: Vec<Box<dyn Component>>,
}

impl Composite {
    pub fn new(members: Vec<Box<dyn Component>>) -> Self {
        assert!(!members.is_empty(), "a component set must have at least one member");
        Composite { members }
    }

    pub fn members(&self) -> &[Box<dyn Component>] {
        &self.members
    }
}

impl std::fmt::Debug for Composite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composite")
            .field("members", &self.members.len())
            .finish()
    }
}

impl Component for Composite {
    fn start(&mut self) {
        for m in &mut self.members {
            m.start();
        }
    }

    fn stop(&mut self) {
        for m in &mut self.members {
            m.stop();
        }
    }

    fn record(&self) -> f64 {
        self.members[0].record()
    }

    fn accum(&self) -> f64 {
        self.members[0].accum()
    }

    fn min(&self) -> f64 {
        self.members[0].min()
    }

    fn max(&self) -> f64 {
        self.members[0].max()
    }

    fn laps(&self) -> u64 {
        self.members[0].laps()
    }

    fn stddev(&self) -> f64 {
        self.members[0].stddev()
    }

    fn is_running(&self) -> bool {
        self.members[0].is_running()
    }

    fn unit(&self) -> &'static str {
        self.members[0].unit()
    }

    fn category(&self) -> Category {
        self.members[0].category()
    }

    fn merge(&mut self, other: &dyn Component) {
        match other.as_any().downcast_ref::<Composite>() {
            Some(other) if other.members.len() == self.members.len() => {
                for (mine, theirs) in self.members.iter_mut().zip(other.members.iter()) {
                    mine.merge(theirs.as_ref());
                }
            }
            Some(_) => log::warn!("Composite::merge: member count mismatch, ignoring"),
            None => log::warn!("Composite::merge: component type mismatch, ignoring"),
        }
    }

    fn minus(&mut self, other: &dyn Component) {
        match other.as_any().downcast_ref::<Composite>() {
            Some(other) if other.members.len() == self.members.len() => {
                for (mine, theirs) in self.members.iter_mut().zip(other.members.iter()) {
                    mine.minus(theirs.as_ref());
                }
            }
            Some(_) => log::warn!("Composite::minus: member count mismatch, ignoring"),
            None => log::warn!("Composite::minus: component type mismatch, ignoring"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn zeroed_like(&self) -> Box<dyn Component> {
        Box::new(Composite {
            members: self.members.iter().map(|m| m.zeroed_like()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{CpuTime, WallClock};

    #[test]
    fn start_stop_fan_out_to_every_member() {
        let mut composite = Composite::new(vec![
            Box::new(WallClock::default()),
            Box::new(CpuTime::default()),
        ]);
        composite.start();
        std::thread::sleep(std::time::Duration::from_millis(2));
        composite.stop();
        assert_eq!(composite.members()[0].laps(), 1);
        assert_eq!(composite.members()[1].laps(), 1);
    }
}
