//! Order types and state management.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use triarb_core::{now_ms, Exchange, TradeSide};

static ORDER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Order state in the execution lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderState {
    /// Accepted by the venue, not yet filled.
    Submitted,
    /// Completely filled.
    Filled,
    /// Deadline passed while still open; cancellation pending.
    TimedOut,
    /// Cancelled after timing out.
    Canceled,
    /// Rejected, closed without fill, or cancellation failed.
    Failed,
}

impl OrderState {
    /// Check if order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderState::Filled | OrderState::Canceled | OrderState::Failed
        )
    }
}

/// One order placed for a leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Internal order ID.
    pub id: u64,
    pub venue: Exchange,
    pub venue_symbol: String,
    pub side: TradeSide,
    /// Base quantity.
    pub requested_size: f64,
    /// Limit price.
    pub price: f64,
    pub stop_price: Option<f64>,
    /// Venue order ID.
    pub order_id: String,
    pub state: OrderState,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    pub error_message: Option<String>,
}

impl Order {
    /// Record an order the venue has accepted.
    pub fn submitted(
        venue: Exchange,
        venue_symbol: &str,
        side: TradeSide,
        requested_size: f64,
        price: f64,
        stop_price: Option<f64>,
        order_id: String,
    ) -> Self {
        let now = now_ms();
        Self {
            id: ORDER_ID_COUNTER.fetch_add(1, Ordering::SeqCst),
            venue,
            venue_symbol: venue_symbol.to_string(),
            side,
            requested_size,
            price,
            stop_price,
            order_id,
            state: OrderState::Submitted,
            created_at_ms: now,
            updated_at_ms: now,
            error_message: None,
        }
    }

    /// Move to `next`. Transitions out of a terminal state are refused.
    fn transition(&mut self, next: OrderState) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = next;
        self.updated_at_ms = now_ms();
        true
    }

    pub fn fill(&mut self) -> bool {
        self.transition(OrderState::Filled)
    }

    pub fn time_out(&mut self) -> bool {
        self.transition(OrderState::TimedOut)
    }

    pub fn cancel(&mut self) -> bool {
        self.transition(OrderState::Canceled)
    }

    /// Mark as failed.
    pub fn fail(&mut self, reason: &str) -> bool {
        let moved = self.transition(OrderState::Failed);
        if moved {
            self.error_message = Some(reason.to_string());
        }
        moved
    }

    pub fn is_filled(&self) -> bool {
        self.state == OrderState::Filled
    }
}
