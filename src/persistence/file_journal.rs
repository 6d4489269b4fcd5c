//! Memory-mapped file journal (§4.5 "Event log"), the durable default
//! behind the `journal` feature. Entries are appended to a growing set of
//! fixed-capacity, memory-mapped segment files:
//!
//! ```text
//! [4 bytes entry_length][8 bytes sequence][8 bytes timestamp_ns]
//! [N bytes JSON payload][4 bytes CRC32]
//! ```
//!
//! `entry_length` covers everything after itself (16 + N + 4). The CRC32
//! covers sequence ‖ timestamp_ns ‖ payload, not `entry_length` itself.
//! Segments are named `segment-{start_sequence:020}.journal` and rotated
//! when a new entry no longer fits.

use super::event::PersistedEvent;
use super::journal::{Journal, JournalEntry, JournalError, JournalReadIter};
use memmap2::MmapMut;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const DEFAULT_SEGMENT_SIZE: usize = 64 * 1024 * 1024;

struct Segment {
    mmap: MmapMut,
    write_pos: usize,
    capacity: usize,
    path: PathBuf,
}

impl Segment {
    fn create(path: &Path, capacity: usize) -> Result<Self, JournalError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| io_err(e, path))?;
        file.set_len(capacity as u64).map_err(|e| io_err(e, path))?;
        // SAFETY: this process exclusively owns the journal directory and
        // never truncates a segment out from under an active mapping.
        let mmap = unsafe { MmapMut::map_mut(&file).map_err(|e| io_err(e, path))? };
        Ok(Segment {
            mmap,
            write_pos: 0,
            capacity,
            path: path.to_path_buf(),
        })
    }

    fn open_existing(path: &Path) -> Result<Self, JournalError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| io_err(e, path))?;
        let capacity = file.metadata().map_err(|e| io_err(e, path))?.len() as usize;
        let mmap = unsafe { MmapMut::map_mut(&file).map_err(|e| io_err(e, path))? };
        let write_pos = scan_write_position(&mmap, capacity);
        Ok(Segment {
            mmap,
            write_pos,
            capacity,
            path: path.to_path_buf(),
        })
    }

    fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.write_pos)
    }

    fn write_entry(&mut self, bytes: &[u8]) -> Result<(), JournalError> {
        let end = self.write_pos + bytes.len();
        if end > self.capacity {
            return Err(JournalError::SegmentFull);
        }
        self.mmap[self.write_pos..end].copy_from_slice(bytes);
        self.mmap
            .flush_range(self.write_pos, bytes.len())
            .map_err(|e| io_err(e, &self.path))?;
        self.write_pos = end;
        Ok(())
    }
}

fn io_err(e: std::io::Error, path: &Path) -> JournalError {
    JournalError::Io {
        message: e.to_string(),
        path: Some(path.to_path_buf()),
    }
}

/// Scan a segment from the start, returning the offset just past the last
/// structurally valid entry (a zeroed `entry_length` or corrupt CRC marks
/// the end of written data).
fn scan_write_position(mmap: &MmapMut, capacity: usize) -> usize {
    let mut pos = 0usize;
    while pos + 4 <= capacity {
        let len_bytes: [u8; 4] = mmap[pos..pos + 4].try_into().unwrap();
        let entry_len = u32::from_le_bytes(len_bytes) as usize;
        if entry_len == 0 {
            break;
        }
        let end = pos + 4 + entry_len;
        if end > capacity {
            break;
        }
        if !verify_crc(&mmap[pos + 4..end]) {
            break;
        }
        pos = end;
    }
    pos
}

fn verify_crc(body_and_crc: &[u8]) -> bool {
    if body_and_crc.len() < 4 {
        return false;
    }
    let split = body_and_crc.len() - 4;
    let expected = u32::from_le_bytes(body_and_crc[split..].try_into().unwrap());
    crc32fast::hash(&body_and_crc[..split]) == expected
}

fn encode_entry(sequence: u64, timestamp_ns: u64, event: &PersistedEvent) -> Result<Vec<u8>, JournalError> {
    let payload = serde_json::to_vec(event).map_err(|e| JournalError::Serialization(e.to_string()))?;
    // `entry_len` (the length prefix) covers everything written after
    // itself: sequence ‖ timestamp_ns ‖ payload ‖ crc, so a reader can skip
    // straight to the next entry without re-deriving the CRC trailer size.
    let entry_len = 8 + 8 + payload.len() + 4;
    let mut buf = Vec::with_capacity(4 + entry_len);
    buf.extend_from_slice(&(entry_len as u32).to_le_bytes());
    let crc_start = buf.len();
    buf.extend_from_slice(&sequence.to_le_bytes());
    buf.extend_from_slice(&timestamp_ns.to_le_bytes());
    buf.extend_from_slice(&payload);
    let crc = crc32fast::hash(&buf[crc_start..]);
    buf.extend_from_slice(&crc.to_le_bytes());
    Ok(buf)
}

fn decode_entry(raw: &[u8], sequence: u64) -> Result<JournalEntry, JournalError> {
    if !verify_crc(raw) {
        return Err(JournalError::CorruptEntry { sequence });
    }
    let timestamp_ns = u64::from_le_bytes(raw[8..16].try_into().unwrap());
    let payload = &raw[16..raw.len() - 4];
    let event: PersistedEvent =
        serde_json::from_slice(payload).map_err(|e| JournalError::Serialization(e.to_string()))?;
    Ok(JournalEntry {
        sequence,
        timestamp_ns,
        event,
    })
}

/// A durable, memory-mapped append-only journal for one symbol.
pub struct FileJournal {
    dir: PathBuf,
    segment_size: usize,
    active: Mutex<Segment>,
    last_sequence: Mutex<Option<u64>>,
}

impl FileJournal {
    /// Open (or create) a journal rooted at `dir`, using the default
    /// segment size.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, JournalError> {
        Self::open_with_segment_size(dir, DEFAULT_SEGMENT_SIZE)
    }

    pub fn open_with_segment_size(
        dir: impl Into<PathBuf>,
        segment_size: usize,
    ) -> Result<Self, JournalError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| io_err(e, &dir))?;

        let mut segments = Self::list_segments(&dir)?;
        let (segment, last_sequence) = if let Some(path) = segments.pop() {
            let segment = Segment::open_existing(&path)?;
            let last_sequence = Self::last_sequence_in(&segment)?;
            (segment, last_sequence)
        } else {
            let path = dir.join(segment_name(0));
            (Segment::create(&path, segment_size)?, None)
        };

        Ok(FileJournal {
            dir,
            segment_size,
            active: Mutex::new(segment),
            last_sequence: Mutex::new(last_sequence),
        })
    }

    fn list_segments(dir: &Path) -> Result<Vec<PathBuf>, JournalError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| io_err(e, dir))? {
            let entry = entry.map_err(|e| io_err(e, dir))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("journal") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn last_sequence_in(segment: &Segment) -> Result<Option<u64>, JournalError> {
        let mut last = None;
        let mut pos = 0usize;
        while pos < segment.write_pos {
            let len_bytes: [u8; 4] = segment.mmap[pos..pos + 4].try_into().unwrap();
            let entry_len = u32::from_le_bytes(len_bytes) as usize;
            let body = &segment.mmap[pos + 4..pos + 4 + entry_len];
            let seq = u64::from_le_bytes(body[0..8].try_into().unwrap());
            last = Some(seq);
            pos += 4 + entry_len;
        }
        Ok(last)
    }

    fn rotate(&self, active: &mut Segment, next_sequence: u64) -> Result<(), JournalError> {
        let path = self.dir.join(segment_name(next_sequence));
        *active = Segment::create(&path, self.segment_size)?;
        Ok(())
    }
}

fn segment_name(start_sequence: u64) -> String {
    format!("segment-{start_sequence:020}.journal")
}

impl Journal for FileJournal {
    fn append(
        &self,
        sequence: u64,
        timestamp_ns: u64,
        event: &PersistedEvent,
    ) -> Result<(), JournalError> {
        let encoded = encode_entry(sequence, timestamp_ns, event)?;
        let mut active = self.active.lock().expect("journal mutex poisoned");
        if encoded.len() > active.remaining() {
            self.rotate(&mut active, sequence)?;
        }
        active.write_entry(&encoded)?;
        *self.last_sequence.lock().expect("journal mutex poisoned") = Some(sequence);
        Ok(())
    }

    fn append_batch(
        &self,
        entries: &[(u64, u64, PersistedEvent)],
    ) -> Result<(), JournalError> {
        let mut active = self.active.lock().expect("journal mutex poisoned");
        for (sequence, ts, event) in entries {
            let encoded = encode_entry(*sequence, *ts, event)?;
            if encoded.len() > active.remaining() {
                self.rotate(&mut active, *sequence)?;
            }
            active.write_entry(&encoded)?;
        }
        if let Some((sequence, _, _)) = entries.last() {
            *self.last_sequence.lock().expect("journal mutex poisoned") = Some(*sequence);
        }
        Ok(())
    }

    fn read_from(&self, sequence: u64) -> Result<JournalReadIter<'_>, JournalError> {
        let segments = Self::list_segments(&self.dir)?;
        let mut out = Vec::new();
        for path in segments {
            let segment = Segment::open_existing(&path)?;
            let mut pos = 0usize;
            while pos < segment.write_pos {
                let len_bytes: [u8; 4] = segment.mmap[pos..pos + 4].try_into().unwrap();
                let entry_len = u32::from_le_bytes(len_bytes) as usize;
                let body = &segment.mmap[pos + 4..pos + 4 + entry_len];
                let seq = u64::from_le_bytes(body[0..8].try_into().unwrap());
                pos += 4 + entry_len;
                if seq >= sequence {
                    out.push(decode_entry(body, seq));
                }
            }
        }
        Ok(Box::new(out.into_iter()))
    }

    fn last_sequence(&self) -> Option<u64> {
        *self.last_sequence.lock().expect("journal mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Decimal;
    use crate::order::{Order, OrderType, Side};

    fn sample_event(ts: u64) -> PersistedEvent {
        PersistedEvent::OrderAdmitted(Order::new(
            "BTC-USDT".into(),
            Side::Buy,
            OrderType::Limit,
            Some(Decimal::parse("100").unwrap()),
            Decimal::parse("1").unwrap(),
            ts,
            None,
        ))
    }

    #[test]
    fn append_and_reopen_recovers_entries() {
        let dir = tempfile::tempdir().unwrap();
        {
            let journal = FileJournal::open(dir.path()).unwrap();
            for i in 1..=3u64 {
                journal.append(i, i, &sample_event(i)).unwrap();
            }
            assert_eq!(journal.last_sequence(), Some(3));
        }
        let reopened = FileJournal::open(dir.path()).unwrap();
        assert_eq!(reopened.last_sequence(), Some(3));
        let entries: Vec<_> = reopened
            .read_from(0)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].sequence, 2);
    }

    #[test]
    fn read_from_mid_sequence_skips_earlier_entries() {
        let dir = tempfile::tempdir().unwrap();
        let journal = FileJournal::open(dir.path()).unwrap();
        for i in 1..=5u64 {
            journal.append(i, i, &sample_event(i)).unwrap();
        }
        let entries: Vec<_> = journal
            .read_from(3)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].sequence, 3);
    }
}
