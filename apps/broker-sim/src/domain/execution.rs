//! Execution records.
//!
//! One reportable event against an order: acknowledgment, fill, cancel,
//! reject, bust, or correction. Fields are snapshotted from the owning
//! order at emission time and stay immutable afterwards, except for the
//! don't-know-trade flag.

use serde::{Deserialize, Serialize};

use super::exec_type::{ExecTransType, ExecType};
use super::identifiers::{ClientOrderId, ExecutionId, OrderId};
use super::order::Order;
use super::price::Price;
use super::quantity::Quantity;
use super::side::Side;
use super::timestamp::Timestamp;

/// A reportable execution event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    id: ExecutionId,
    ref_id: Option<ExecutionId>,
    order_id: OrderId,
    client_order_id: ClientOrderId,
    symbol: String,
    side: Side,
    ordered_qty: Quantity,
    exec_type: ExecType,
    exec_trans_type: ExecTransType,
    last_shares: Quantity,
    last_px: Price,
    leaves_qty: Quantity,
    cum_qty: Quantity,
    avg_px: Price,
    dk: bool,
    transact_time: Timestamp,
}

impl Execution {
    /// Snapshot a fresh execution report off an order.
    ///
    /// `last_shares`/`last_px` are zero for pure status reports (ack,
    /// cancel, reject, ...) and carry the slice for fills. Leaves, cum,
    /// and average price are read from the order as it stands.
    #[must_use]
    pub fn report(
        order: &Order,
        exec_type: ExecType,
        last_shares: Quantity,
        last_px: Price,
    ) -> Self {
        Self {
            id: ExecutionId::generate(),
            ref_id: None,
            order_id: order.id().clone(),
            client_order_id: order.client_order_id().clone(),
            symbol: order.symbol().to_string(),
            side: order.side(),
            ordered_qty: order.ordered_qty(),
            exec_type,
            exec_trans_type: ExecTransType::New,
            last_shares,
            last_px,
            leaves_qty: order.open_qty(),
            cum_qty: order.executed_qty(),
            avg_px: order.avg_px(),
            dk: false,
            transact_time: Timestamp::now(),
        }
    }

    /// Clone this execution as the bust report that reverses it.
    ///
    /// Keeps the busted fill's type, shares, and price; takes a fresh id,
    /// back-references this execution, switches the transaction type to
    /// [`ExecTransType::Cancel`], and refreshes leaves/cum/avg from the
    /// already-reversed order.
    #[must_use]
    pub fn bust_clone(&self, order: &Order) -> Self {
        Self {
            id: ExecutionId::generate(),
            ref_id: Some(self.id.clone()),
            exec_trans_type: ExecTransType::Cancel,
            leaves_qty: order.open_qty(),
            cum_qty: order.executed_qty(),
            avg_px: order.avg_px(),
            dk: false,
            transact_time: Timestamp::now(),
            ..self.clone()
        }
    }

    /// Clone this execution as the correction that amends it to
    /// `new_qty @ new_px`.
    ///
    /// Fresh id, back-reference, transaction type
    /// [`ExecTransType::Correct`], amended shares/price, and refreshed
    /// leaves/cum/avg from the already-amended order.
    #[must_use]
    pub fn correct_clone(&self, order: &Order, new_qty: Quantity, new_px: Price) -> Self {
        Self {
            id: ExecutionId::generate(),
            ref_id: Some(self.id.clone()),
            exec_trans_type: ExecTransType::Correct,
            last_shares: new_qty,
            last_px: new_px,
            leaves_qty: order.open_qty(),
            cum_qty: order.executed_qty(),
            avg_px: order.avg_px(),
            dk: false,
            transact_time: Timestamp::now(),
            ..self.clone()
        }
    }

    /// Get the execution id (tag 17).
    #[must_use]
    pub const fn id(&self) -> &ExecutionId {
        &self.id
    }

    /// Get the referenced execution id (tag 19), set on busts and
    /// corrections.
    #[must_use]
    pub const fn ref_id(&self) -> Option<&ExecutionId> {
        self.ref_id.as_ref()
    }

    /// Get the owning order's id.
    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// Get the client order id current at emission time.
    #[must_use]
    pub const fn client_order_id(&self) -> &ClientOrderId {
        &self.client_order_id
    }

    /// Get the symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Get the order side.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Get the ordered quantity at emission time.
    #[must_use]
    pub const fn ordered_qty(&self) -> Quantity {
        self.ordered_qty
    }

    /// Get the execution type (tag 150).
    #[must_use]
    pub const fn exec_type(&self) -> ExecType {
        self.exec_type
    }

    /// Get the transaction type (tag 20).
    #[must_use]
    pub const fn exec_trans_type(&self) -> ExecTransType {
        self.exec_trans_type
    }

    /// Get the shares of this event (tag 32).
    #[must_use]
    pub const fn last_shares(&self) -> Quantity {
        self.last_shares
    }

    /// Get the price of this event (tag 31).
    #[must_use]
    pub const fn last_px(&self) -> Price {
        self.last_px
    }

    /// Get the order's open quantity at emission (tag 151).
    #[must_use]
    pub const fn leaves_qty(&self) -> Quantity {
        self.leaves_qty
    }

    /// Get the order's executed quantity at emission (tag 14).
    #[must_use]
    pub const fn cum_qty(&self) -> Quantity {
        self.cum_qty
    }

    /// Get the order's average price at emission (tag 6).
    #[must_use]
    pub const fn avg_px(&self) -> Price {
        self.avg_px
    }

    /// Whether the counterparty marked this execution don't-know-trade.
    #[must_use]
    pub const fn dk(&self) -> bool {
        self.dk
    }

    /// Set the don't-know-trade flag.
    pub fn set_dk(&mut self, dk: bool) {
        self.dk = dk;
    }

    /// Get the emission timestamp.
    #[must_use]
    pub const fn transact_time(&self) -> Timestamp {
        self.transact_time
    }
}
