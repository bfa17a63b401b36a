use crate::record::LeaseRecord;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Per-name mutual exclusion. The record for a name lives inside its gate,
/// so it can only be read or written while the gate is held.
pub(crate) type Gate = Arc<Mutex<Option<LeaseRecord>>>;

/// One gate per lease name, created on first use.
///
/// The map's shard locks are held only long enough to look up or insert a
/// gate handle, never while a gate itself is locked, so callers on unrelated
/// names do not wait on each other.
#[derive(Debug, Default)]
pub struct GateRegistry {
    gates: DashMap<String, Gate>,
}

impl GateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the gate for `name`, registering a new one if absent.
    pub(crate) fn gate_for(&self, name: &str) -> Gate {
        if let Some(gate) = self.gates.get(name) {
            return Arc::clone(gate.value());
        }

        Arc::clone(self.gates.entry(name.to_string()).or_default().value())
    }

    /// Returns the gate for `name` only if one was ever registered.
    pub(crate) fn existing(&self, name: &str) -> Option<Gate> {
        self.gates.get(name).map(|gate| Arc::clone(gate.value()))
    }

    pub(crate) fn snapshot(&self) -> Vec<Gate> {
        self.gates.iter().map(|e| Arc::clone(e.value())).collect()
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// Drops gates that hold no record and that nobody else references.
    /// Returns how many were removed.
    ///
    /// A referenced gate may be about to receive a record, so it stays. An
    /// unreferenced one cannot be handed out while `retain` holds its shard.
    pub fn compact(&self) -> usize {
        let mut removed = 0;
        self.gates.retain(|_, gate| {
            if Arc::strong_count(gate) > 1 {
                return true;
            }

            let keep = match gate.try_lock() {
                Some(slot) => slot.is_some(),
                None => true,
            };

            if !keep {
                removed += 1;
            }

            keep
        });

        removed
    }
}
