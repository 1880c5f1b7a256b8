use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Table size at which idle slots are swept before a new key is added.
const PRUNE_THRESHOLD: usize = 256;

/// One mutex per key so writes to the same area (or user) serialize while
/// unrelated keys proceed in parallel.
///
/// A slot is idle when the table holds its only reference; idle slots are
/// dropped once the table reaches [`PRUNE_THRESHOLD`] entries, so the table
/// stays bounded by the number of keys in flight.
#[derive(Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn slot(&self, key: &str) -> Arc<Mutex<()>> {
        let mut guard = self.slots.lock().expect("lock table poisoned");
        if let Some(slot) = guard.get(key) {
            return Arc::clone(slot);
        }
        if guard.len() >= PRUNE_THRESHOLD {
            // Callers clone under this lock, so a count of one cannot race upward.
            guard.retain(|_, slot| Arc::strong_count(slot) > 1);
        }
        Arc::clone(
            guard
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}
