//! Order aggregate.
//!
//! Owns the quantity bookkeeping and status transitions for one order,
//! following FIX protocol semantics for fills, busts, and corrections.
//! Every mutation preserves `open_qty + executed_qty == ordered_qty`.

use serde::{Deserialize, Serialize};

use super::identifiers::{ClientOrderId, OrderId};
use super::order_status::OrderStatus;
use super::price::Price;
use super::quantity::Quantity;
use super::side::Side;
use super::timestamp::Timestamp;

/// Reference-data pair identifying an instrument (FIX tags 48/22).
///
/// The pair is all-or-nothing: an order either carries both the security
/// id and its source or neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityReference {
    id: String,
    source: String,
}

impl SecurityReference {
    /// Create a reference-data pair.
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
        }
    }

    /// Get the security id (tag 48).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the id source (tag 22).
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Inbound request awaiting action on an order.
///
/// Replaces independent received-cancel/received-replace booleans so the
/// two kinds cannot be pending at once; the latest request wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingRequest {
    /// Nothing awaiting action.
    #[default]
    None,
    /// A cancel request has arrived and has not been actioned.
    Cancel,
    /// A replace request has arrived and has not been actioned.
    Replace,
}

impl PendingRequest {
    /// Whether any request is awaiting action.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Order aggregate root.
///
/// Created with status [`OrderStatus::Unknown`] on receipt of a new-order
/// request and mutated exclusively through the lifecycle engine. Records
/// are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    client_order_id: ClientOrderId,
    orig_client_order_id: Option<ClientOrderId>,
    symbol: String,
    side: Side,
    security: Option<SecurityReference>,
    ordered_qty: Quantity,
    open_qty: Quantity,
    executed_qty: Quantity,
    avg_px: Price,
    status: OrderStatus,
    received_order: bool,
    pending_request: PendingRequest,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Order {
    /// Create an order from an accepted new-order request.
    ///
    /// Starts at status [`OrderStatus::Unknown`] with the full quantity
    /// open and the received-order marker set.
    #[must_use]
    pub fn new(
        client_order_id: ClientOrderId,
        symbol: impl Into<String>,
        side: Side,
        ordered_qty: Quantity,
        security: Option<SecurityReference>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: OrderId::generate(),
            client_order_id,
            orig_client_order_id: None,
            symbol: symbol.into(),
            side,
            security,
            ordered_qty,
            open_qty: ordered_qty,
            executed_qty: Quantity::ZERO,
            avg_px: Price::ZERO,
            status: OrderStatus::Unknown,
            received_order: true,
            pending_request: PendingRequest::None,
            created_at: now,
            updated_at: now,
        }
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Get the order id (tag 37).
    #[must_use]
    pub const fn id(&self) -> &OrderId {
        &self.id
    }

    /// Get the current client order id (tag 11).
    #[must_use]
    pub const fn client_order_id(&self) -> &ClientOrderId {
        &self.client_order_id
    }

    /// Get the original client order id (tag 41), set once the id chain
    /// has rotated through a cancel or replace request.
    #[must_use]
    pub const fn orig_client_order_id(&self) -> Option<&ClientOrderId> {
        self.orig_client_order_id.as_ref()
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

    /// Get the reference-data pair, when present.
    #[must_use]
    pub const fn security(&self) -> Option<&SecurityReference> {
        self.security.as_ref()
    }

    /// Get the ordered quantity. Immutable once accepted.
    #[must_use]
    pub const fn ordered_qty(&self) -> Quantity {
        self.ordered_qty
    }

    /// Get the unfilled remainder.
    #[must_use]
    pub const fn open_qty(&self) -> Quantity {
        self.open_qty
    }

    /// Get the cumulative executed quantity.
    #[must_use]
    pub const fn executed_qty(&self) -> Quantity {
        self.executed_qty
    }

    /// Get the volume-weighted average price of currently attributed fills.
    #[must_use]
    pub const fn avg_px(&self) -> Price {
        self.avg_px
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Whether the new-order request has arrived but not been actioned.
    #[must_use]
    pub const fn received_order(&self) -> bool {
        self.received_order
    }

    /// Get the pending cancel/replace request marker.
    #[must_use]
    pub const fn pending_request(&self) -> PendingRequest {
        self.pending_request
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Get the last mutation timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Check `open_qty + executed_qty == ordered_qty`.
    #[must_use]
    pub fn verify_quantity_invariant(&self) -> bool {
        self.open_qty + self.executed_qty == self.ordered_qty
    }

    // ========================================================================
    // Status transitions
    // ========================================================================

    /// Acknowledge the order: clears the received marker, status `New`.
    pub fn acknowledge(&mut self) {
        self.received_order = false;
        self.status = OrderStatus::New;
        self.touch();
    }

    /// Reject the order: clears the received marker, status `Rejected`.
    pub fn reject(&mut self) {
        self.received_order = false;
        self.status = OrderStatus::Rejected;
        self.touch();
    }

    /// Close the order for the trading day.
    pub fn done_for_day(&mut self) {
        self.status = OrderStatus::DoneForDay;
        self.touch();
    }

    /// Move a received cancel request to `PendingCancel`.
    pub fn pending_cancel(&mut self) {
        self.pending_request = PendingRequest::None;
        self.status = OrderStatus::PendingCancel;
        self.touch();
    }

    /// Cancel the order.
    pub fn cancel(&mut self) {
        self.pending_request = PendingRequest::None;
        self.status = OrderStatus::Canceled;
        self.touch();
    }

    /// Move a received replace request to `PendingReplace`.
    pub fn pending_replace(&mut self) {
        self.pending_request = PendingRequest::None;
        self.status = OrderStatus::PendingReplace;
        self.touch();
    }

    /// Accept a replace request, terminating this record at `Replaced`.
    pub fn replace_accepted(&mut self) {
        self.pending_request = PendingRequest::None;
        self.status = OrderStatus::Replaced;
        self.touch();
    }

    /// Refuse the pending cancel/replace request.
    ///
    /// Clears the pending marker; an order still at
    /// [`OrderStatus::Unknown`] settles at [`OrderStatus::New`].
    pub fn reject_cancel_replace(&mut self) {
        self.pending_request = PendingRequest::None;
        if self.status == OrderStatus::Unknown {
            self.status = OrderStatus::New;
        }
        self.touch();
    }

    /// Record an inbound cancel request and rotate the client id chain.
    pub fn note_cancel_request(&mut self, request_client_id: ClientOrderId) {
        self.rotate_client_ids(request_client_id);
        self.pending_request = PendingRequest::Cancel;
        self.touch();
    }

    /// Record an inbound replace request and rotate the client id chain.
    pub fn note_replace_request(&mut self, request_client_id: ClientOrderId) {
        self.rotate_client_ids(request_client_id);
        self.pending_request = PendingRequest::Replace;
        self.touch();
    }

    fn rotate_client_ids(&mut self, request_client_id: ClientOrderId) {
        let previous = std::mem::replace(&mut self.client_order_id, request_client_id);
        self.orig_client_order_id = Some(previous);
    }

    // ========================================================================
    // Fill arithmetic
    // ========================================================================

    /// Apply a fill of `qty @ px`, clamped to the open quantity.
    ///
    /// Recomputes the volume-weighted average price, rounds it
    /// half-away-from-zero to `precision` decimals, and transitions to
    /// `PartiallyFilled` or `Filled`. Returns the applied quantity, which
    /// is zero when nothing was open to fill.
    pub fn apply_fill(&mut self, qty: Quantity, px: Price, precision: u32) -> Quantity {
        let fill_qty = qty.min(self.open_qty);
        if !fill_qty.is_positive() {
            return Quantity::ZERO;
        }

        let executed = self.executed_qty.amount();
        let new_executed = executed + fill_qty.amount();
        let raw_avg =
            (self.avg_px.amount() * executed + px.amount() * fill_qty.amount()) / new_executed;

        self.avg_px = Price::new(raw_avg).round_to(precision);
        self.executed_qty = Quantity::new(new_executed);
        self.open_qty = self.open_qty - fill_qty;
        self.status = if self.open_qty.is_zero() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self.touch();

        debug_assert!(
            self.verify_quantity_invariant(),
            "fill broke quantity invariant: open={} executed={} ordered={}",
            self.open_qty,
            self.executed_qty,
            self.ordered_qty
        );
        fill_qty
    }

    /// Reverse a previously attributed fill of `qty @ px`.
    ///
    /// A bust of less than the executed quantity removes that fill's
    /// contribution from the average price; a bust of the entire executed
    /// quantity (or more) resets the order to its unfilled state at
    /// status `New`.
    pub fn apply_bust(&mut self, qty: Quantity, px: Price, precision: u32) {
        if qty < self.executed_qty {
            let executed = self.executed_qty.amount();
            let new_executed = executed - qty.amount();
            let raw_avg =
                (self.avg_px.amount() * executed - px.amount() * qty.amount()) / new_executed;

            self.avg_px = Price::new(raw_avg).round_to(precision);
            self.executed_qty = Quantity::new(new_executed);
            self.open_qty = self.ordered_qty - self.executed_qty;
            self.status = OrderStatus::PartiallyFilled;
        } else {
            self.open_qty = self.ordered_qty;
            self.executed_qty = Quantity::ZERO;
            self.avg_px = Price::ZERO;
            self.status = OrderStatus::New;
        }
        self.touch();

        debug_assert!(
            self.verify_quantity_invariant(),
            "bust broke quantity invariant: open={} executed={} ordered={}",
            self.open_qty,
            self.executed_qty,
            self.ordered_qty
        );
    }

    /// Amend a previously attributed fill from `old_qty @ old_px` to
    /// `new_qty @ new_px`.
    ///
    /// The executed quantity becomes `executed - old_qty + new_qty` and
    /// the average price is rebuilt with the old contribution swapped for
    /// the new one. A zero resulting quantity guards the division and
    /// resets the average price to zero.
    pub fn apply_correct(
        &mut self,
        old_qty: Quantity,
        old_px: Price,
        new_qty: Quantity,
        new_px: Price,
        precision: u32,
    ) {
        let executed = self.executed_qty.amount();
        let new_cum = executed - old_qty.amount() + new_qty.amount();

        if new_cum.is_zero() {
            self.avg_px = Price::ZERO;
        } else {
            let raw_avg = (self.avg_px.amount() * executed - old_px.amount() * old_qty.amount()
                + new_px.amount() * new_qty.amount())
                / new_cum;
            self.avg_px = Price::new(raw_avg).round_to(precision);
        }

        self.executed_qty = Quantity::new(new_cum);
        self.open_qty = self.ordered_qty - self.executed_qty;
        self.status = if self.executed_qty < self.ordered_qty {
            OrderStatus::PartiallyFilled
        } else {
            OrderStatus::Filled
        };
        self.touch();

        debug_assert!(
            self.verify_quantity_invariant(),
            "correct broke quantity invariant: open={} executed={} ordered={}",
            self.open_qty,
            self.executed_qty,
            self.ordered_qty
        );
    }

    fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn arb_fill() -> impl Strategy<Value = (Quantity, Price)> {
        (1i64..500, 1i64..100_000).prop_map(|(qty, cents)| {
            (Quantity::from_i64(qty), Price::new(Decimal::new(cents, 2)))
        })
    }

    fn make_order(qty: i64) -> Order {
        let mut order = Order::new(
            ClientOrderId::new("CLIENT-1"),
            "AAPL",
            Side::Buy,
            Quantity::from_i64(qty),
            None,
        );
        order.acknowledge();
        order
    }

    proptest! {
        // open + executed == ordered after every fill, the executed
        // quantity never overshoots, and the average price is zero
        // exactly while nothing is executed.
        #[test]
        fn random_fills_preserve_the_quantity_identity(
            ordered in 1i64..1_000,
            fills in proptest::collection::vec(arb_fill(), 0..20),
        ) {
            let mut order = make_order(ordered);

            for (qty, px) in fills {
                let applied = order.apply_fill(qty, px, 4);

                prop_assert!(order.verify_quantity_invariant());
                prop_assert!(applied <= qty);
                prop_assert!(order.executed_qty() <= order.ordered_qty());
                prop_assert_eq!(
                    order.avg_px() == Price::ZERO,
                    order.executed_qty().is_zero()
                );
                if order.open_qty().is_zero() {
                    prop_assert_eq!(order.status(), OrderStatus::Filled);
                } else if order.executed_qty().is_positive() {
                    prop_assert_eq!(order.status(), OrderStatus::PartiallyFilled);
                }
            }
        }
    }

    proptest! {
        // Busting every applied fill in reverse order lands the order
        // back at its unfilled state.
        #[test]
        fn busting_all_fills_restores_the_unfilled_state(
            ordered in 1i64..1_000,
            fills in proptest::collection::vec(arb_fill(), 1..10),
        ) {
            let mut order = make_order(ordered);

            let mut applied = Vec::new();
            for (qty, px) in fills {
                let slice = order.apply_fill(qty, px, 4);
                if slice.is_positive() {
                    applied.push((slice, px));
                }
            }

            for (qty, px) in applied.into_iter().rev() {
                order.apply_bust(qty, px, 4);
                prop_assert!(order.verify_quantity_invariant());
            }

            prop_assert_eq!(order.executed_qty(), Quantity::ZERO);
            prop_assert_eq!(order.open_qty(), order.ordered_qty());
            prop_assert_eq!(order.avg_px(), Price::ZERO);
            prop_assert_eq!(order.status(), OrderStatus::New);
        }
    }

    proptest! {
        // Correcting the only fill to any in-range quantity keeps the
        // identity and repoints the average at the corrected price.
        #[test]
        fn correcting_the_only_fill_keeps_the_identity(
            ordered in 1i64..1_000,
            (fill_qty, fill_px) in arb_fill(),
            new_px in (1i64..100_000).prop_map(|cents| Price::new(Decimal::new(cents, 2))),
            new_qty_seed in 0i64..1_000,
        ) {
            let mut order = make_order(ordered);
            let applied = order.apply_fill(fill_qty, fill_px, 4);
            prop_assume!(applied.is_positive());

            let new_qty = Quantity::from_i64(new_qty_seed % (ordered + 1));
            order.apply_correct(applied, fill_px, new_qty, new_px, 4);

            prop_assert!(order.verify_quantity_invariant());
            prop_assert_eq!(order.executed_qty(), new_qty);
            if new_qty.is_zero() {
                prop_assert_eq!(order.avg_px(), Price::ZERO);
            } else {
                prop_assert_eq!(order.avg_px(), new_px);
            }
            if new_qty < order.ordered_qty() {
                prop_assert_eq!(order.status(), OrderStatus::PartiallyFilled);
            } else {
                prop_assert_eq!(order.status(), OrderStatus::Filled);
            }
        }
    }
}
