//! The recovery protocol (§4.5 "Recovery protocol"): load the latest
//! snapshot, then replay the event log tail to reconstruct a book
//! semantically identical (by resting-set + FIFO order) to the one at the
//! moment of the crash.

use super::event::PersistedEvent;
use super::journal::Journal;
use super::snapshot::Snapshot;
use crate::order::Side;
use crate::orderbook::OrderBook;

/// The result of recovering one symbol: the rebuilt book and the next
/// admission sequence number to hand out (one past the highest sequence
/// observed in the snapshot or log).
pub struct RecoveredEngine {
    pub book: OrderBook,
    pub next_sequence: u64,
}

/// Rebuild a symbol's book from an optional snapshot plus its journal
/// tail. With no snapshot, replay starts from the beginning of the log.
pub fn recover(symbol: &str, snapshot: Option<&Snapshot>, journal: &dyn Journal) -> RecoveredEngine {
    let (book, from_sequence, mut next_sequence) = match snapshot {
        Some(s) => (s.restore(), s.sequence.saturating_add(1), s.sequence),
        None => (OrderBook::new(symbol), 0, 0),
    };

    let entries = journal
        .read_from(from_sequence)
        .expect("journal read_from should not fail during recovery");

    for entry in entries {
        let entry = entry.expect("corrupt journal entry during recovery");
        next_sequence = next_sequence.max(entry.sequence);
        apply(&book, &entry.event);
    }

    RecoveredEngine {
        book,
        next_sequence: next_sequence.saturating_add(1),
    }
}

/// Apply one replayed event to `book`, mirroring exactly what the live
/// engine did at submission time (§4.5 step 2).
fn apply(book: &OrderBook, event: &PersistedEvent) {
    match event {
        PersistedEvent::OrderAdmitted(order) => {
            if !order.is_terminal() && order.remaining().is_positive() {
                let _ = book.add_resting(order.clone());
            }
        }
        PersistedEvent::OrderCancelled(order) => {
            book.cancel(order.order_id);
        }
        PersistedEvent::Trade(trade) => {
            // The maker rests on the side opposite the trade's aggressor.
            let maker_side = match trade.aggressor_side {
                Side::Buy => Side::Sell,
                Side::Sell => Side::Buy,
            };
            book.apply_maker_fill(maker_side, trade.price, trade.quantity);
        }
    }
}
