//! Change observation.
//!
//! Observers are registered per table and called synchronously, in
//! registration order, after a mutation's statements have executed and
//! while the serialization lock is still held. A slow observer therefore
//! delays every other database operation.

use umbra_core::stmt::{Row, Value};

/// A change-observer callback.
pub type Observer = Box<dyn FnMut(&ChangeEvent) + Send>;

/// A mutation that completed against one table.
///
/// Upserts are reported through [`ChangeEvent::Inserted`]; the engine does
/// not distinguish which rows of the payload already existed.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Inserted { table: String, rows: Vec<Row> },
    Updated { table: String, rows: Vec<Row> },
    Deleted { table: String, keys: Vec<Value> },
}

impl ChangeEvent {
    pub fn table(&self) -> &str {
        match self {
            Self::Inserted { table, .. } => table,
            Self::Updated { table, .. } => table,
            Self::Deleted { table, .. } => table,
        }
    }
}

/// Handle for removing a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

pub(crate) struct ObserverRegistry {
    next_id: u64,
    observers: Vec<Registration>,
}

struct Registration {
    id: ObserverId,
    table: String,
    observer: Observer,
}

impl ObserverRegistry {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            observers: Vec::new(),
        }
    }

    pub(crate) fn observe(&mut self, table: impl Into<String>, observer: Observer) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push(Registration {
            id,
            table: table.into(),
            observer,
        });
        id
    }

    pub(crate) fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|registration| registration.id != id);
        self.observers.len() != before
    }

    pub(crate) fn notify(&mut self, event: &ChangeEvent) {
        for registration in &mut self.observers {
            if registration.table == event.table() {
                (registration.observer)(event);
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.observers.clear();
    }
}
