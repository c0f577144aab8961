use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::OrderState;

/// Domain events emitted by the services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Cart events
    CartLineAdded {
        user_id: Uuid,
        store_product_id: Uuid,
    },
    CartLineRemoved {
        user_id: Uuid,
        store_product_id: Uuid,
    },
    CartCleared {
        user_id: Uuid,
        store_id: Uuid,
    },

    // Invoice events
    InvoiceCreated(Uuid),
    InvoiceStateChanged {
        invoice_id: Uuid,
        old_state: OrderState,
        new_state: OrderState,
    },

    // Factor events
    FactorStateChanged {
        factor_id: Uuid,
        old_state: OrderState,
        new_state: OrderState,
    },
    FactorItemStateChanged {
        factor_item_id: Uuid,
        old_state: OrderState,
        new_state: OrderState,
    },

    // Stock events
    StockDecremented {
        store_product_id: Uuid,
        count: i32,
    },
    StockRestocked {
        store_product_id: Uuid,
        count: i32,
    },
}

/// Cloneable handle for publishing events to the background processor.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, failing if the channel is closed or full.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging delivery failures instead of surfacing them.
    /// Event delivery is best-effort and never fails the originating request.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("Dropping event, channel unavailable: {}", e);
        }
    }
}

/// Drains the event channel, logging each event. Notification fan-out (SMS,
/// push) is owned by an external collaborator.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!("Processing event: {:?}", event);
    }
}
