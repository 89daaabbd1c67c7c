//! Nullable clock: time only moves when told to.

use std::cell::Cell;

use dirauth_node::Clock;
use dirauth_types::Timestamp;

pub struct NullClock {
    current: Cell<u64>,
}

impl NullClock {
    pub fn new(initial_secs: u64) -> Self {
        Self {
            current: Cell::new(initial_secs),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.current.set(self.current.get() + secs);
    }

    pub fn set(&self, at: Timestamp) {
        self.current.set(at.as_secs());
    }
}

impl Clock for NullClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(self.current.get())
    }
}
