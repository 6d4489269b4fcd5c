//! NATS JetStream egress transport (§1 "a transport-neutral egress"; this
//! module is one concrete binding of it).
//!
//! [`NatsEgressPublisher`] subscribes to a [`BroadcastAggregator`] the same
//! way any other subscriber does, then republishes each batched
//! [`EgressMessage`] to JetStream under `{prefix}.{symbol}` and the
//! aggregate `{prefix}.all` subject. Publishing runs on a detached task so a
//! slow or unreachable NATS server never backs up the broadcast loop;
//! transient publish failures are retried with exponential backoff before
//! being counted as permanent.
//!
//! # Feature gate
//!
//! Only compiled with the `nats` feature enabled.

use crate::ingress::{EgressMessage, SubscribeRequest};
use crate::market_data::broadcast::BroadcastAggregator;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, trace, warn};

/// Default maximum number of retry attempts for transient NATS publish failures.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay in milliseconds for exponential backoff between retries.
const BASE_RETRY_DELAY_MS: u64 = 10;

/// Republishes broadcast batches to NATS JetStream.
pub struct NatsEgressPublisher {
    jetstream: async_nats::jetstream::Context,
    subject_prefix: String,
    publish_count: AtomicU64,
    error_count: AtomicU64,
    max_retries: u32,
}

impl NatsEgressPublisher {
    #[must_use]
    pub fn new(jetstream: async_nats::jetstream::Context, subject_prefix: String) -> Arc<Self> {
        Arc::new(NatsEgressPublisher {
            jetstream,
            subject_prefix,
            publish_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    #[must_use = "builders do nothing unless consumed"]
    pub fn with_max_retries(self: Arc<Self>, max_retries: u32) -> Arc<Self> {
        Arc::new(NatsEgressPublisher {
            max_retries,
            ..Arc::unwrap_or_clone(self)
        })
    }

    #[must_use]
    pub fn publish_count(&self) -> u64 {
        self.publish_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Register as a subscriber on `aggregator` for every symbol in
    /// `symbols` and spawn the task that forwards each flushed batch to
    /// JetStream. Mirrors a regular subscriber: a channel the aggregator's
    /// `flush` sends into, read here in a loop.
    pub fn spawn(self: &Arc<Self>, aggregator: &Arc<BroadcastAggregator>, symbols: Vec<String>) {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<Vec<EgressMessage>>(1024);
        aggregator.subscribe(
            SubscribeRequest {
                symbols,
                trades: true,
                market_data: true,
            },
            tx,
            |_| None,
        );

        let this = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(batch) = rx.recv().await {
                for message in batch {
                    this.publish_one(&message).await;
                }
            }
        });
    }

    fn symbol_of(message: &EgressMessage) -> Option<&str> {
        match message {
            EgressMessage::Trade(t) => Some(t.symbol.as_str()),
            EgressMessage::MarketData(m) => Some(m.symbol.as_str()),
            EgressMessage::OrderResponse(_) => None,
        }
    }

    async fn publish_one(self: &Arc<Self>, message: &EgressMessage) {
        let Some(symbol) = Self::symbol_of(message) else {
            return;
        };
        let payload = match serde_json::to_vec(message) {
            Ok(bytes) => bytes::Bytes::from(bytes),
            Err(e) => {
                self.error_count.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, "failed to serialize egress message for NATS");
                return;
            }
        };

        let symbol_subject = format!("{}.{}", self.subject_prefix, symbol);
        let all_subject = format!("{}.all", self.subject_prefix);

        let symbol_ok = self.publish_with_retry(&symbol_subject, payload.clone()).await;
        let all_ok = self.publish_with_retry(&all_subject, payload).await;

        if symbol_ok && all_ok {
            self.publish_count.fetch_add(1, Ordering::Relaxed);
            trace!(symbol = %symbol_subject, "egress message published to NATS");
        }
    }

    /// Publish a single message to a subject with exponential backoff retry.
    async fn publish_with_retry(self: &Arc<Self>, subject: &str, payload: bytes::Bytes) -> bool {
        let max_attempts = self.max_retries.saturating_add(1);

        for attempt in 0..max_attempts {
            match self.jetstream.publish(subject.to_string(), payload.clone()).await {
                Ok(ack_future) => match ack_future.await {
                    Ok(_) => return true,
                    Err(e) => warn!(
                        attempt = attempt + 1,
                        max = max_attempts,
                        subject,
                        error = %e,
                        "NATS ack failed, retrying"
                    ),
                },
                Err(e) => warn!(
                    attempt = attempt + 1,
                    max = max_attempts,
                    subject,
                    error = %e,
                    "NATS publish failed, retrying"
                ),
            }

            if attempt + 1 < max_attempts {
                let delay_ms = BASE_RETRY_DELAY_MS.saturating_mul(1u64 << attempt);
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            }
        }

        self.error_count.fetch_add(1, Ordering::Relaxed);
        error!(subject, "NATS publish failed after all retries");
        false
    }
}

impl std::fmt::Debug for NatsEgressPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsEgressPublisher")
            .field("subject_prefix", &self.subject_prefix)
            .field("publish_count", &self.publish_count.load(Ordering::Relaxed))
            .field("error_count", &self.error_count.load(Ordering::Relaxed))
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_formatting_matches_symbol_and_aggregate_subjects() {
        let prefix = "exchange.egress";
        let symbol = "BTC-USDT";
        assert_eq!(format!("{prefix}.{symbol}"), "exchange.egress.BTC-USDT");
        assert_eq!(format!("{prefix}.all"), "exchange.egress.all");
    }

    #[test]
    fn exponential_backoff_doubles_each_attempt() {
        for attempt in 0u32..4 {
            let delay = BASE_RETRY_DELAY_MS.saturating_mul(1u64 << attempt);
            assert_eq!(delay, BASE_RETRY_DELAY_MS * 2u64.pow(attempt));
        }
    }

    #[test]
    fn symbol_of_ignores_order_responses() {
        use crate::ingress::OrderResponse;
        use crate::decimal::Decimal;
        let resp = EgressMessage::OrderResponse(OrderResponse {
            success: true,
            order_id: None,
            client_order_id: None,
            status: "filled".into(),
            filled_quantity: Decimal::ZERO,
            remaining_quantity: Decimal::ZERO,
            trades: vec![],
            reason: None,
        });
        assert!(NatsEgressPublisher::symbol_of(&resp).is_none());
    }
}
