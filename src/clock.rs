use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;
/// Monotonic seconds source. Injected so timing behaviour is testable.
pub trait Clock {
    fn now_seconds(&self) -> f64;
}
impl<C: Clock + ?Sized> Clock for &C {
    fn now_seconds(&self) -> f64 {
        (**self).now_seconds()
    }
}
/// Seconds since construction, from `Instant`.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}
impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}
impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}
impl Clock for MonotonicClock {
    fn now_seconds(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}
/// Hand-driven clock; clones share the same time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}
impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }
    pub fn set(&self, seconds: f64) {
        self.now.set(seconds);
    }
    pub fn advance(&self, seconds: f64) {
        self.now.set(self.now.get() + seconds);
    }
}
impl Clock for ManualClock {
    fn now_seconds(&self) -> f64 {
        self.now.get()
    }
}
/// Advances by a fixed step every time it is read.
#[derive(Debug)]
pub struct SteppingClock {
    now: Cell<f64>,
    step: f64,
}
impl SteppingClock {
    pub fn new(step: f64) -> Self {
        Self {
            now: Cell::new(0.0),
            step,
        }
    }
}
impl Clock for SteppingClock {
    fn now_seconds(&self) -> f64 {
        let t = self.now.get();
        self.now.set(t + self.step);
        t
    }
}
