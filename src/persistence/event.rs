//! The persisted record types written to the event log (§4.5, §6 "Persisted
//! state layout").

use crate::order::Order;
use crate::trade::Trade;
use serde::{Deserialize, Serialize};

/// One durable record. The event log is the append-only, totally-ordered
/// ground truth between snapshots (§3 "Event log").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PersistedEvent {
    /// An order was admitted (validation already passed). Carries its
    /// state *after* matching, so a terminal order records its final
    /// status in one record rather than two.
    OrderAdmitted(Order),
    /// An explicit cancel was applied.
    OrderCancelled(Order),
    /// A trade was emitted. Always written after the matching mutation
    /// that produced it is complete (§4.5 invariant).
    Trade(Trade),
}

impl PersistedEvent {
    pub fn symbol(&self) -> &str {
        match self {
            PersistedEvent::OrderAdmitted(o) | PersistedEvent::OrderCancelled(o) => &o.symbol,
            PersistedEvent::Trade(t) => &t.symbol,
        }
    }
}
