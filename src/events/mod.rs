use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Domain events published after successful service mutations.
///
/// Events are emitted after the enclosing database transaction commits, so a
/// delivery failure never rolls back the mutation it describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Ledger events
    InventoryAdjusted {
        part_id: i64,
        transaction_id: i64,
        kind: String,
        old_quantity: Decimal,
        new_quantity: Decimal,
        reference_type: Option<String>,
        reference_id: Option<i64>,
    },
    TransactionReversed {
        part_id: i64,
        transaction_id: i64,
        restored_quantity: Decimal,
    },

    // Reservation events
    InventoryReserved {
        part_id: i64,
        quantity: Decimal,
        reference_type: String,
        reference_id: i64,
    },
    InventoryReleased {
        part_id: i64,
        quantity: Decimal,
    },

    // Purchasing events
    PurchaseOrderReceived {
        purchase_order_id: i64,
        part_id: i64,
        quantity: Decimal,
    },

    // Planning events
    MrpRunCompleted {
        run_id: Uuid,
        results_written: u64,
        parts_needing_order: u64,
        total_suggested_qty: Decimal,
        calculated_at: DateTime<Utc>,
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_event_delivery() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender
            .send(Event::InventoryReleased {
                part_id: 7,
                quantity: dec!(3),
            })
            .await
            .expect("send failed");

        match rx.recv().await {
            Some(Event::InventoryReleased { part_id, quantity }) => {
                assert_eq!(part_id, 7);
                assert_eq!(quantity, dec!(3));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::PurchaseOrderReceived {
            purchase_order_id: 1,
            part_id: 2,
            quantity: dec!(10),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("PurchaseOrderReceived"));
    }
}
