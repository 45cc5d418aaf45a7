use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::alerts::AlertService;

/// Events emitted by the document mutation pipeline after commit. Delivery
/// is best-effort: a dropped event never rolls back the mutation that
/// produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    DocumentCreated {
        organization_id: Uuid,
        document_id: Uuid,
    },
    DocumentUpdated {
        organization_id: Uuid,
        document_id: Uuid,
    },
    DocumentDeleted {
        organization_id: Uuid,
        document_id: Uuid,
    },
    /// One or more products crossed from above their low-stock threshold to
    /// at-or-below it within a single mutation.
    StockThresholdCrossed {
        organization_id: Uuid,
        product_ids: Vec<Uuid>,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
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

/// Background task consuming the event channel. Threshold crossings are
/// forwarded to the alert notifier; everything else is logged for
/// observability.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, alert_service: Arc<AlertService>) {
    info!("Event processor started");

    while let Some(event) = rx.recv().await {
        match event {
            Event::StockThresholdCrossed {
                organization_id,
                product_ids,
            } => {
                // At-least-once semantics: a concurrent mutation crossing the
                // same threshold may trigger a duplicate notification.
                alert_service
                    .notify_low_stock_if_needed(organization_id, &product_ids)
                    .await;
            }
            Event::DocumentCreated {
                organization_id,
                document_id,
            } => {
                info!(%organization_id, %document_id, "document created");
            }
            Event::DocumentUpdated {
                organization_id,
                document_id,
            } => {
                info!(%organization_id, %document_id, "document updated");
            }
            Event::DocumentDeleted {
                organization_id,
                document_id,
            } => {
                info!(%organization_id, %document_id, "document deleted");
            }
        }
    }

    warn!("Event channel closed; event processor exiting");
}
