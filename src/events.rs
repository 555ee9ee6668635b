use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

/// Events emitted while an import run progresses.
///
/// Consumers (progress broadcasting, the decoupled pricing subsystem) live
/// outside this crate; the pipeline only publishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    VariantCreated(Uuid),
    VariantUpdated(Uuid),
    /// Pricing breakdown for a variant; variant rows themselves keep price 0
    /// because prices are owned by the pricing subsystem.
    VariantPriced {
        variant_id: Uuid,
        price_excluding_vat: Decimal,
        vat_amount: Decimal,
    },
    RowSkipped {
        row: usize,
        reason: String,
    },
    ImportProgress {
        processed: usize,
        total: usize,
    },
    ImportCompleted {
        created_products: u64,
        updated_products: u64,
        created_variants: u64,
        updated_variants: u64,
        skipped_rows: u64,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when no receiver is
    /// listening. Event delivery must never abort an import.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("event dropped: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_delivers_event() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        sender
            .send(Event::ImportProgress {
                processed: 10,
                total: 100,
            })
            .await
            .expect("send should succeed");

        match rx.recv().await {
            Some(Event::ImportProgress { processed, total }) => {
                assert_eq!(processed, 10);
                assert_eq!(total, 100);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        // Must not panic or error out
        sender.send_or_log(Event::RowSkipped {
            row: 3,
            reason: "missing sku".into(),
        })
        .await;
    }
}
