//! Point-in-time dumps of the resting order set (§3 "Snapshot", §4.5
//! "Snapshot cadence", §6 `snapshots` table).

use super::journal::JournalError;
use crate::order::Order;
use crate::orderbook::OrderBook;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Format version of [`SnapshotPackage`]; bumped if the envelope or
/// payload shape ever changes incompatibly (§4.5 "versioned ... package").
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A consistent dump of every resting order for one symbol, plus the
/// event-log sequence number it is current as of (§4.5 "Recovery
/// protocol" step 1).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub symbol: String,
    /// The last event sequence number reflected in this snapshot; replay
    /// resumes from here (exclusive) on recovery.
    pub sequence: u64,
    /// Resting orders, best-first per side, FIFO within a level —
    /// recorded in the exact order [`crate::orderbook::OrderBook::resting_orders`]
    /// returns them in, so a restore re-admits them in the same FIFO
    /// positions (§3 "Snapshots capture the resting set").
    pub orders: Vec<Order>,
    pub created_at_ms: u64,
}

impl Snapshot {
    pub fn take(book: &OrderBook, sequence: u64, created_at_ms: u64) -> Self {
        Snapshot {
            symbol: book.symbol.clone(),
            sequence,
            orders: book.resting_orders(),
            created_at_ms,
        }
    }

    /// Rebuild an [`OrderBook`] from this snapshot, re-admitting every
    /// resting order in its recorded FIFO position (§4.5 step 1).
    pub fn restore(&self) -> OrderBook {
        let book = OrderBook::new(self.symbol.clone());
        for order in &self.orders {
            // `add_resting` cannot fail: ids were unique when captured and
            // a fresh book has no prior state.
            let _ = book.add_resting(order.clone());
        }
        book
    }

    /// Canonical serialization for the `snapshots.blob` column (§6): a
    /// versioned, SHA-256-checksummed package wrapping the payload, so a
    /// package read back from disk can be validated before it is trusted
    /// as recovery input (§4.5 "Snapshots are a versioned, checksummed
    /// package"). `bincode` is available as a denser, optional wire format
    /// for the raw payload behind the `bincode` feature.
    pub fn to_json(&self) -> Result<Vec<u8>, JournalError> {
        SnapshotPackage::wrap(self)?.to_json()
    }

    /// Deserialize a package produced by [`Snapshot::to_json`], rejecting
    /// it if the recorded version is unsupported or the checksum does not
    /// match the payload (§4.5, §7).
    pub fn from_json(bytes: &[u8]) -> Result<Self, JournalError> {
        SnapshotPackage::from_json(bytes)?.into_snapshot()
    }

    #[cfg(feature = "bincode")]
    pub fn to_bincode(&self) -> Result<Vec<u8>, bincode::error::EncodeError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
    }

    #[cfg(feature = "bincode")]
    pub fn from_bincode(bytes: &[u8]) -> Result<Self, bincode::error::DecodeError> {
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map(|(value, _)| value)
    }
}

/// The on-disk envelope around a [`Snapshot`]: a format version plus a
/// hex-encoded SHA-256 checksum of the payload, so a package loaded back
/// from the `snapshots.blob` column can be validated before it is trusted
/// (§4.5 "versioned, checksummed ... package").
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotPackage {
    version: u32,
    snapshot: Snapshot,
    checksum: String,
}

impl SnapshotPackage {
    fn wrap(snapshot: &Snapshot) -> Result<Self, JournalError> {
        let checksum = Self::compute_checksum(snapshot)?;
        Ok(SnapshotPackage {
            version: SNAPSHOT_FORMAT_VERSION,
            snapshot: snapshot.clone(),
            checksum,
        })
    }

    fn to_json(&self) -> Result<Vec<u8>, JournalError> {
        serde_json::to_vec(self).map_err(|e| JournalError::Serialization(e.to_string()))
    }

    fn from_json(bytes: &[u8]) -> Result<Self, JournalError> {
        serde_json::from_slice(bytes).map_err(|e| JournalError::Serialization(e.to_string()))
    }

    /// Validate the recorded version and checksum, returning the payload
    /// only once both check out (§7: a mismatched checksum is untrusted
    /// recovery input, not silently accepted).
    fn into_snapshot(self) -> Result<Snapshot, JournalError> {
        if self.version != SNAPSHOT_FORMAT_VERSION {
            return Err(JournalError::UnsupportedSnapshotVersion {
                version: self.version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }
        let computed = Self::compute_checksum(&self.snapshot)?;
        if computed != self.checksum {
            return Err(JournalError::ChecksumMismatch {
                expected: self.checksum,
                actual: computed,
            });
        }
        Ok(self.snapshot)
    }

    fn compute_checksum(snapshot: &Snapshot) -> Result<String, JournalError> {
        let payload =
            serde_json::to_vec(snapshot).map_err(|e| JournalError::Serialization(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(&payload);
        Ok(format!("{:x}", hasher.finalize()))
    }
}
