// ============================================================================
// Event Handler Interface
// Defines the contract for handling order lifecycle events
// ============================================================================

use chrono::{DateTime, Utc};

use crate::domain::{Address, OrderId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Events emitted by the coordinator. Each carries identifying keys only;
/// observers re-read state for order details.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrderEvent {
    /// A new recurring order was registered
    OrderCreated {
        owner: Address,
        order_id: OrderId,
        timestamp: DateTime<Utc>,
    },

    /// An order was cancelled by its current record owner
    OrderCancelled {
        owner: Address,
        order_id: OrderId,
        timestamp: DateTime<Utc>,
    },

    /// One scheduled slice of an order was settled
    OrderExecuted {
        executor: Address,
        order_id: OrderId,
        timestamp: DateTime<Utc>,
    },
}

/// Event handler trait for processing coordinator events
/// Implementations can handle logging, metrics, notifications, etc.
pub trait EventHandler: Send + Sync {
    /// Handle an order event
    fn on_event(&self, event: OrderEvent);
}

/// No-op event handler for testing
pub struct NoOpEventHandler;

impl EventHandler for NoOpEventHandler {
    fn on_event(&self, _event: OrderEvent) {
        // Do nothing
    }
}

/// Logging event handler
pub struct LoggingEventHandler;

impl EventHandler for LoggingEventHandler {
    fn on_event(&self, event: OrderEvent) {
        tracing::debug!("Coordinator event: {:?}", event);
    }
}

/// Captures events in order of emission, for tests and indexer prototyping
#[derive(Clone, Default)]
pub struct RecordingEventHandler {
    events: std::sync::Arc<parking_lot::Mutex<Vec<OrderEvent>>>,
}

impl RecordingEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events seen so far.
    pub fn events(&self) -> Vec<OrderEvent> {
        self.events.lock().clone()
    }
}

impl EventHandler for RecordingEventHandler {
    fn on_event(&self, event: OrderEvent) {
        self.events.lock().push(event);
    }
}
