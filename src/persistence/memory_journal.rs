//! An in-process, non-durable [`Journal`] implementation. Used by tests and
//! by any deployment that accepts the durability tradeoff of keeping the
//! log in memory only (the `journal` feature's [`super::FileJournal`] is
//! the durable default).

use super::event::PersistedEvent;
use super::journal::{Journal, JournalEntry, JournalError, JournalReadIter};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryJournal {
    entries: Mutex<Vec<(u64, u64, PersistedEvent)>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Journal for MemoryJournal {
    fn append(
        &self,
        sequence: u64,
        timestamp_ns: u64,
        event: &PersistedEvent,
    ) -> Result<(), JournalError> {
        self.entries
            .lock()
            .expect("memory journal mutex poisoned")
            .push((sequence, timestamp_ns, event.clone()));
        Ok(())
    }

    fn read_from(&self, sequence: u64) -> Result<JournalReadIter<'_>, JournalError> {
        let snapshot: Vec<_> = self
            .entries
            .lock()
            .expect("memory journal mutex poisoned")
            .iter()
            .filter(|(seq, _, _)| *seq >= sequence)
            .map(|(seq, ts, event)| {
                Ok(JournalEntry {
                    sequence: *seq,
                    timestamp_ns: *ts,
                    event: event.clone(),
                })
            })
            .collect();
        Ok(Box::new(snapshot.into_iter()))
    }

    fn last_sequence(&self) -> Option<u64> {
        self.entries
            .lock()
            .expect("memory journal mutex poisoned")
            .last()
            .map(|(seq, _, _)| *seq)
    }
}
