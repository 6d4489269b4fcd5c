//! Durability: the event log, snapshots, and crash recovery (§4.5, §6).

pub mod event;
#[cfg(feature = "journal")]
pub mod file_journal;
pub mod journal;
pub mod memory_journal;
pub mod recovery;
pub mod snapshot;
pub mod writer;

pub use event::PersistedEvent;
#[cfg(feature = "journal")]
pub use file_journal::FileJournal;
pub use journal::{Journal, JournalEntry, JournalError};
pub use memory_journal::MemoryJournal;
pub use recovery::{RecoveredEngine, recover};
pub use snapshot::Snapshot;
pub use writer::PersistenceQueue;
