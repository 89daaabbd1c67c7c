//! Nullable serving layer: keeps the latest consensus per flavor.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use dirauth_node::{ConsensusPublisher, NodeError};
use dirauth_types::Flavor;

#[derive(Default)]
pub struct NullPublisher {
    served: RefCell<BTreeMap<Flavor, String>>,
    published: Cell<usize>,
    fail: Cell<bool>,
}

impl NullPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent publish fail.
    pub fn fail_publishing(&self, fail: bool) {
        self.fail.set(fail);
    }

    pub fn served(&self, flavor: Flavor) -> Option<String> {
        self.served.borrow().get(&flavor).cloned()
    }

    /// Successful publishes so far.
    pub fn publish_count(&self) -> usize {
        self.published.get()
    }
}

impl ConsensusPublisher for NullPublisher {
    fn publish(&self, flavor: Flavor, text: &str) -> Result<(), NodeError> {
        if self.fail.get() {
            return Err(NodeError::Publish(format!("{flavor} publishing disabled")));
        }
        self.served.borrow_mut().insert(flavor, text.to_string());
        self.published.set(self.published.get() + 1);
        Ok(())
    }
}
