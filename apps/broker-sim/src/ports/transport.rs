//! Transport Port (Driven Port)
//!
//! Interface to the session/transport collaborator that encodes and
//! delivers outbound messages. Sends are synchronous and must not
//! block: the engine calls this inside its operation gate, so a real
//! implementation hands the message to a channel or queue.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{ClientOrderId, Execution, OrderId, OrderStatus, SessionId};

/// Transport error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The transport consumer is gone.
    #[error("Transport channel closed")]
    ChannelClosed,

    /// Delivery failed.
    #[error("Transport send failed: {message}")]
    SendFailed {
        /// Error details.
        message: String,
    },
}

/// Which request kind a cancel-reject refuses (FIX tag 434).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    /// An order cancel request.
    Cancel,
    /// An order cancel/replace request.
    Replace,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancel => write!(f, "CANCEL"),
            Self::Replace => write!(f, "REPLACE"),
        }
    }
}

/// Refusal of a cancel or replace request (FIX OrderCancelReject).
///
/// Not an execution: it references the order but reports no fill state.
/// `order_id` is `None` when the request named an unknown order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelReject {
    /// Order id of the refused request's target, when resolved.
    pub order_id: Option<OrderId>,
    /// Client order id of the refused request (tag 11).
    pub client_order_id: ClientOrderId,
    /// Original client order id (tag 41).
    pub orig_client_order_id: Option<ClientOrderId>,
    /// Order status at refusal time (tag 39).
    pub status: OrderStatus,
    /// Which request kind was refused (tag 434).
    pub refused: RequestKind,
}

/// One outbound protocol message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutboundMessage {
    /// An execution report (ack, fill, cancel, bust, correction, ...).
    ExecutionReport(Execution),
    /// A cancel/replace refusal.
    CancelReject(CancelReject),
}

impl OutboundMessage {
    /// One-line summary for the activity log.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::ExecutionReport(execution) => format!(
                "ExecutionReport {} {} {} {}@{} leaves={} cum={} avg={}",
                execution.exec_type(),
                execution.symbol(),
                execution.client_order_id(),
                execution.last_shares(),
                execution.last_px(),
                execution.leaves_qty(),
                execution.cum_qty(),
                execution.avg_px(),
            ),
            Self::CancelReject(reject) => format!(
                "OrderCancelReject {} {} status={}",
                reject.refused,
                reject.client_order_id,
                reject.status,
            ),
        }
    }
}

/// Delivery identity for one outbound send.
///
/// The on-behalf-of fields are populated from settings when enabled;
/// the transport encodes them into the message header (tags 115/116).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryContext {
    /// Target session.
    pub session: SessionId,
    /// OnBehalfOfCompID header value, when configured.
    pub on_behalf_of_comp_id: Option<String>,
    /// OnBehalfOfSubID header value, when configured.
    pub on_behalf_of_sub_id: Option<String>,
}

impl DeliveryContext {
    /// Context with no on-behalf-of identity.
    #[must_use]
    pub const fn plain(session: SessionId) -> Self {
        Self {
            session,
            on_behalf_of_comp_id: None,
            on_behalf_of_sub_id: None,
        }
    }
}

/// Port for handing outbound messages to the transport layer.
pub trait TransportPort: Send + Sync {
    /// Deliver one message.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the message cannot be handed
    /// over. Callers report the failure; the originating state
    /// transition is never rolled back.
    fn send(
        &self,
        message: &OutboundMessage,
        context: &DeliveryContext,
    ) -> Result<(), TransportError>;
}
