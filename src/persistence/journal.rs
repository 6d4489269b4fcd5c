//! Append-only event journal trait (§4.5 "Event log").
//!
//! A sequence-numbered, CRC-checked, append-write/ordered-read contract
//! that both an in-memory test double and
//! [`crate::persistence::file_journal::FileJournal`] implement. An event
//! is durable only once [`Journal::append`] returns `Ok`.

use super::event::PersistedEvent;
use std::fmt;
use std::path::PathBuf;

/// Size of the fixed-size entry header in bytes:
/// `[4 bytes entry_length][8 bytes sequence][8 bytes timestamp_ns]`.
pub const ENTRY_HEADER_SIZE: usize = 4 + 8 + 8;
/// Size of the CRC32 trailer appended to each entry.
pub const ENTRY_CRC_SIZE: usize = 4;
/// Total per-entry overhead (header + trailer).
pub const ENTRY_OVERHEAD: usize = ENTRY_HEADER_SIZE + ENTRY_CRC_SIZE;

#[derive(Debug)]
#[non_exhaustive]
pub enum JournalError {
    Io {
        message: String,
        path: Option<PathBuf>,
    },
    Serialization(String),
    CorruptEntry {
        sequence: u64,
    },
    SegmentFull,
    /// A snapshot package's recorded format version is not one this build
    /// understands (§4.5/§7: "versioned, checksummed package").
    UnsupportedSnapshotVersion {
        version: u32,
        expected: u32,
    },
    /// A snapshot package's checksum did not match its payload; the
    /// package is untrusted and must not be fed into recovery (§7).
    ChecksumMismatch {
        expected: String,
        actual: String,
    },
}

impl fmt::Display for JournalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JournalError::Io { message, path } => {
                if let Some(p) = path {
                    write!(f, "journal io error at {}: {message}", p.display())
                } else {
                    write!(f, "journal io error: {message}")
                }
            }
            JournalError::Serialization(message) => {
                write!(f, "journal entry serialization failed: {message}")
            }
            JournalError::CorruptEntry { sequence } => {
                write!(f, "journal entry at sequence {sequence} failed CRC check")
            }
            JournalError::SegmentFull => write!(f, "journal segment is full"),
            JournalError::UnsupportedSnapshotVersion { version, expected } => write!(
                f,
                "unsupported snapshot format version {version} (expected {expected})"
            ),
            JournalError::ChecksumMismatch { expected, actual } => write!(
                f,
                "snapshot checksum mismatch: expected {expected}, computed {actual}"
            ),
        }
    }
}

impl std::error::Error for JournalError {}

/// One entry read back from the journal.
#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub sequence: u64,
    pub timestamp_ns: u64,
    pub event: PersistedEvent,
}

pub type JournalReadIter<'a> = Box<dyn Iterator<Item = Result<JournalEntry, JournalError>> + 'a>;

/// An append-only, ordered, durable event log for one symbol.
///
/// Implementations must guarantee write-ahead semantics: `append` only
/// returns `Ok` once the event is durable. The intended usage is
/// single-writer (the persistence worker) with concurrent readers
/// (recovery replay, diagnostics).
pub trait Journal: Send + Sync {
    fn append(&self, sequence: u64, timestamp_ns: u64, event: &PersistedEvent)
    -> Result<(), JournalError>;

    /// Append a batch in one durable transaction (§4.5 "Batched writer").
    /// The default implementation appends one at a time; a real backing
    /// store can override this to flush once per batch instead of once per
    /// entry.
    fn append_batch(
        &self,
        entries: &[(u64, u64, PersistedEvent)],
    ) -> Result<(), JournalError> {
        for (sequence, ts, event) in entries {
            self.append(*sequence, *ts, event)?;
        }
        Ok(())
    }

    /// Read events from `sequence` (inclusive) to the end of the log, in
    /// order.
    fn read_from(&self, sequence: u64) -> Result<JournalReadIter<'_>, JournalError>;

    /// The sequence number of the last entry written, if any.
    fn last_sequence(&self) -> Option<u64>;
}
