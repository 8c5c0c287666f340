//! Order lifecycle engine.
//!
//! Applies status transitions to orders, records the reportable
//! [`Execution`] for each, hands the report to the transport, and appends
//! to the activity log. Every operation runs behind a single operation
//! gate so a fill and a cancel/replace can never interleave on the same
//! order and execution insertion order matches emission order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::sync::Notify;

use crate::config::Settings;
use crate::domain::{
    DomainError, ExecType, Execution, ExecutionId, Order, OrderId, OrderStatus, PendingRequest,
    Price, Quantity, SessionId,
};
use crate::ports::{CancelReject, DeliveryContext, OutboundMessage, RequestKind, TransportPort};
use crate::registry::{ActivityLog, Direction, ExecutionRegistry, OrderRegistry};

use super::requests::{CancelRequest, NewOrderRequest, ReplaceRequest, RequestError};

/// Lifecycle engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A registry lookup failed.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The inbound request did not validate.
    #[error(transparent)]
    Request(#[from] RequestError),
}

/// Order lifecycle engine.
///
/// Shared between the inbound-request path and the fulfillment worker;
/// all methods take `&self`.
pub struct LifecycleEngine {
    orders: Arc<OrderRegistry>,
    executions: Arc<ExecutionRegistry>,
    activity: Arc<ActivityLog>,
    transport: Arc<dyn TransportPort>,
    settings: Settings,
    session: RwLock<Option<SessionId>>,
    worker_active: AtomicBool,
    fill_wake: Notify,
    op_gate: Mutex<()>,
}

impl LifecycleEngine {
    /// Create an engine over the shared registries and transport.
    #[must_use]
    pub fn new(
        orders: Arc<OrderRegistry>,
        executions: Arc<ExecutionRegistry>,
        activity: Arc<ActivityLog>,
        transport: Arc<dyn TransportPort>,
        settings: Settings,
    ) -> Self {
        Self {
            orders,
            executions,
            activity,
            transport,
            settings,
            session: RwLock::new(None),
            worker_active: AtomicBool::new(false),
            fill_wake: Notify::new(),
            op_gate: Mutex::new(()),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The order registry.
    #[must_use]
    pub const fn orders(&self) -> &Arc<OrderRegistry> {
        &self.orders
    }

    /// The execution registry.
    #[must_use]
    pub const fn executions(&self) -> &Arc<ExecutionRegistry> {
        &self.executions
    }

    /// The activity log.
    #[must_use]
    pub const fn activity(&self) -> &Arc<ActivityLog> {
        &self.activity
    }

    /// The runtime settings handle.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Whether a counterparty session is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session.read().is_some()
    }

    /// Notify parked on by the worker's idle wait.
    #[must_use]
    pub const fn fill_wake(&self) -> &Notify {
        &self.fill_wake
    }

    /// Wake the worker out of its idle wait.
    pub fn wake_worker(&self) {
        self.fill_wake.notify_one();
    }

    /// Mark whether the worker is consuming the fill queue. Set by the
    /// worker on start/exit; routes new orders to the queue.
    pub fn set_worker_active(&self, active: bool) {
        self.worker_active.store(active, Ordering::SeqCst);
    }

    /// Whether the worker is consuming the fill queue.
    #[must_use]
    pub fn worker_active(&self) -> bool {
        self.worker_active.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Record the connected counterparty session.
    pub fn on_connect(&self, session: SessionId) {
        tracing::info!(session = %session, "Session connected");
        *self.session.write() = Some(session);
        self.wake_worker();
    }

    /// Clear the connected session; outbound messages are dropped until
    /// the next connect.
    pub fn on_disconnect(&self) {
        if let Some(session) = self.session.write().take() {
            tracing::info!(session = %session, "Session disconnected");
        }
    }

    // ========================================================================
    // Inbound request handlers
    // ========================================================================

    /// Accept a new order request.
    ///
    /// The record is created at status Unknown. While the worker runs it
    /// is queued for fulfillment and the worker is woken; otherwise it
    /// sits until acted on, or is acknowledged right away when
    /// auto-acknowledge is on.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Malformed`] when the request does not
    /// validate; nothing is recorded in that case.
    pub fn on_new_order(&self, request: NewOrderRequest) -> Result<OrderId, EngineError> {
        request.validate()?;
        self.record_inbound(format!(
            "NewOrderSingle {} {} {} {}",
            request.symbol, request.client_order_id, request.side, request.quantity,
        ));

        let order = Order::new(
            request.client_order_id,
            request.symbol,
            request.side,
            request.quantity,
            request.security,
        );
        let order_id = order.id().clone();

        if self.worker_active() {
            self.orders.add(order, true);
            self.orders.update();
            self.wake_worker();
        } else {
            self.orders.add(order, false);
            self.orders.update();
            if self.settings.auto_acknowledge() {
                self.acknowledge(&order_id)?;
            }
        }

        tracing::debug!(order_id = %order_id, "New order recorded");
        Ok(order_id)
    }

    /// Handle a cancel request.
    ///
    /// The target is resolved by the request's original client order id.
    /// On a hit the order's id chain rotates and the cancel is marked
    /// pending; auto settings then drive pending-cancel and cancel. On a
    /// miss a cancel-reject built from the request is emitted.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Malformed`] when the request does not
    /// validate. An unresolvable target is not an error.
    pub fn on_cancel_request(&self, request: CancelRequest) -> Result<(), EngineError> {
        request.validate()?;
        self.record_inbound(format!(
            "OrderCancelRequest {} {} orig={}",
            request.symbol, request.client_order_id, request.orig_client_order_id,
        ));

        let Some(order) = self.orders.find_by_client_id(&request.orig_client_order_id) else {
            tracing::warn!(
                orig_client_order_id = %request.orig_client_order_id,
                "Cancel request names an unknown order"
            );
            self.emit(OutboundMessage::CancelReject(CancelReject {
                order_id: None,
                client_order_id: request.client_order_id,
                orig_client_order_id: Some(request.orig_client_order_id),
                status: OrderStatus::Rejected,
                refused: RequestKind::Cancel,
            }));
            return Ok(());
        };

        let order_id = order.id().clone();
        self.orders.with_order_mut(&order_id, |order| {
            order.note_cancel_request(request.client_order_id);
        })?;
        self.orders.update();
        tracing::debug!(order_id = %order_id, "Cancel request pending");

        if self.settings.auto_pending_cancel() {
            self.pending_cancel(&order_id)?;
        }
        if self.settings.auto_cancel() {
            self.cancel(&order_id)?;
        }
        Ok(())
    }

    /// Handle a replace request.
    ///
    /// Resolution and id-chain rotation as for cancel; auto settings then
    /// drive pending-replace and replace.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Malformed`] when the request does not
    /// validate. An unresolvable target is not an error.
    pub fn on_replace_request(&self, request: ReplaceRequest) -> Result<(), EngineError> {
        request.validate()?;
        self.record_inbound(format!(
            "OrderCancelReplaceRequest {} {} orig={} qty={}",
            request.symbol,
            request.client_order_id,
            request.orig_client_order_id,
            request.new_quantity,
        ));

        let Some(order) = self.orders.find_by_client_id(&request.orig_client_order_id) else {
            tracing::warn!(
                orig_client_order_id = %request.orig_client_order_id,
                "Replace request names an unknown order"
            );
            self.emit(OutboundMessage::CancelReject(CancelReject {
                order_id: None,
                client_order_id: request.client_order_id,
                orig_client_order_id: Some(request.orig_client_order_id),
                status: OrderStatus::Rejected,
                refused: RequestKind::Replace,
            }));
            return Ok(());
        };

        let order_id = order.id().clone();
        self.orders.with_order_mut(&order_id, |order| {
            order.note_replace_request(request.client_order_id);
        })?;
        self.orders.update();
        tracing::debug!(order_id = %order_id, "Replace request pending");

        if self.settings.auto_pending_replace() {
            self.pending_replace(&order_id)?;
        }
        if self.settings.auto_replace() {
            self.replace(&order_id)?;
        }
        Ok(())
    }

    /// Handle a don't-know-trade message against an execution.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ExecutionNotFound`] when the execution id
    /// does not resolve; the miss is logged.
    pub fn on_dont_know_trade(&self, execution_id: &ExecutionId) -> Result<(), EngineError> {
        self.record_inbound(format!("DontKnowTrade {execution_id}"));

        match self.executions.set_dk(execution_id, true) {
            Ok(()) => {
                self.executions.update();
                tracing::debug!(execution_id = %execution_id, "Execution marked DK");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    execution_id = %execution_id,
                    "DK names an unknown execution"
                );
                Err(e.into())
            }
        }
    }

    // ========================================================================
    // Lifecycle operations
    // ========================================================================

    /// Acknowledge a received order: status New, ack report.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OrderNotFound`] when the order id does not
    /// resolve.
    pub fn acknowledge(&self, order_id: &OrderId) -> Result<(), EngineError> {
        self.transition(order_id, ExecType::New, Order::acknowledge)
    }

    /// Reject a received order outright.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OrderNotFound`] when the order id does not
    /// resolve.
    pub fn reject(&self, order_id: &OrderId) -> Result<(), EngineError> {
        self.transition(order_id, ExecType::Rejected, Order::reject)
    }

    /// Report an order done for the day.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OrderNotFound`] when the order id does not
    /// resolve.
    pub fn done_for_day(&self, order_id: &OrderId) -> Result<(), EngineError> {
        self.transition(order_id, ExecType::DoneForDay, Order::done_for_day)
    }

    /// Report a cancel request pending.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OrderNotFound`] when the order id does not
    /// resolve.
    pub fn pending_cancel(&self, order_id: &OrderId) -> Result<(), EngineError> {
        self.transition(order_id, ExecType::PendingCancel, Order::pending_cancel)
    }

    /// Cancel an order.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OrderNotFound`] when the order id does not
    /// resolve.
    pub fn cancel(&self, order_id: &OrderId) -> Result<(), EngineError> {
        self.transition(order_id, ExecType::Canceled, Order::cancel)
    }

    /// Report a replace request pending.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OrderNotFound`] when the order id does not
    /// resolve.
    pub fn pending_replace(&self, order_id: &OrderId) -> Result<(), EngineError> {
        self.transition(order_id, ExecType::PendingReplace, Order::pending_replace)
    }

    /// Accept a replace request; the order moves to the terminal
    /// Replaced status.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OrderNotFound`] when the order id does not
    /// resolve.
    pub fn replace(&self, order_id: &OrderId) -> Result<(), EngineError> {
        self.transition(order_id, ExecType::Replace, Order::replace_accepted)
    }

    /// Refuse the pending cancel or replace request on an order.
    ///
    /// Clears the pending marker (an Unknown order defaults to New) and
    /// emits a cancel-reject message; no execution is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OrderNotFound`] when the order id does not
    /// resolve.
    pub fn reject_cancel_replace(&self, order_id: &OrderId) -> Result<(), EngineError> {
        let _op = self.op_gate.lock();

        let (order, refused) = self.orders.with_order_mut(order_id, |order| {
            let refused = match order.pending_request() {
                PendingRequest::Replace => RequestKind::Replace,
                PendingRequest::Cancel | PendingRequest::None => RequestKind::Cancel,
            };
            order.reject_cancel_replace();
            (order.clone(), refused)
        })?;

        self.emit(OutboundMessage::CancelReject(CancelReject {
            order_id: Some(order.id().clone()),
            client_order_id: order.client_order_id().clone(),
            orig_client_order_id: order.orig_client_order_id().cloned(),
            status: order.status(),
            refused,
        }));
        self.orders.update();
        tracing::info!(order_id = %order_id, refused = %refused, "Cancel/replace request refused");
        Ok(())
    }

    /// Fill an order with `qty` shares at `px`.
    ///
    /// Over-fills clamp to the open quantity; a fill against an order
    /// with nothing open applies nothing and emits nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OrderNotFound`] when the order id does not
    /// resolve.
    pub fn fill(&self, order_id: &OrderId, qty: Quantity, px: Price) -> Result<(), EngineError> {
        let _op = self.op_gate.lock();

        let precision = self.settings.price_precision();
        let (order, applied) = self.orders.with_order_mut(order_id, |order| {
            let applied = order.apply_fill(qty, px, precision);
            (order.clone(), applied)
        })?;

        if applied.is_zero() {
            tracing::debug!(order_id = %order_id, "Fill skipped, nothing open");
            return Ok(());
        }

        let exec_type = if order.status() == OrderStatus::Filled {
            ExecType::Fill
        } else {
            ExecType::PartialFill
        };
        let report = Execution::report(&order, exec_type, applied, px);
        self.executions.add(report.clone());
        self.emit(OutboundMessage::ExecutionReport(report));
        self.orders.update();
        self.executions.update();
        tracing::info!(
            order_id = %order_id,
            shares = %applied,
            price = %px,
            status = %order.status(),
            "Fill applied"
        );
        Ok(())
    }

    /// Bust (reverse) a prior fill identified by its execution id.
    ///
    /// The order's quantities unwind by the busted execution's
    /// `last_shares @ last_px`; the reported execution is a clone of the
    /// busted one with transaction type Cancel.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ExecutionNotFound`] when the execution id
    /// does not resolve, [`DomainError::OrderNotFound`] when its order
    /// is gone.
    pub fn bust(&self, execution_id: &ExecutionId) -> Result<(), EngineError> {
        let _op = self.op_gate.lock();

        let source = match self.executions.lookup(execution_id) {
            Ok(execution) => execution,
            Err(e) => {
                tracing::warn!(
                    execution_id = %execution_id,
                    "Bust names an unknown execution"
                );
                return Err(e.into());
            }
        };

        let precision = self.settings.price_precision();
        let order_id = source.order_id().clone();
        let order = self.orders.with_order_mut(&order_id, |order| {
            order.apply_bust(source.last_shares(), source.last_px(), precision);
            order.clone()
        })?;

        let busted = source.bust_clone(&order);
        self.executions.add(busted.clone());
        self.emit(OutboundMessage::ExecutionReport(busted));
        self.orders.update();
        self.executions.update();
        tracing::info!(
            execution_id = %execution_id,
            order_id = %order_id,
            status = %order.status(),
            "Execution busted"
        );
        Ok(())
    }

    /// Correct (amend) a prior fill to `new_qty` shares at `new_px`.
    ///
    /// The reported execution is a clone of the source with transaction
    /// type Correct and the amended shares/price.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ExecutionNotFound`] when the execution id
    /// does not resolve, [`DomainError::OrderNotFound`] when its order
    /// is gone.
    pub fn correct(
        &self,
        execution_id: &ExecutionId,
        new_qty: Quantity,
        new_px: Price,
    ) -> Result<(), EngineError> {
        let _op = self.op_gate.lock();

        let source = match self.executions.lookup(execution_id) {
            Ok(execution) => execution,
            Err(e) => {
                tracing::warn!(
                    execution_id = %execution_id,
                    "Correct names an unknown execution"
                );
                return Err(e.into());
            }
        };

        let precision = self.settings.price_precision();
        let order_id = source.order_id().clone();
        let order = self.orders.with_order_mut(&order_id, |order| {
            order.apply_correct(
                source.last_shares(),
                source.last_px(),
                new_qty,
                new_px,
                precision,
            );
            order.clone()
        })?;

        let corrected = source.correct_clone(&order, new_qty, new_px);
        self.executions.add(corrected.clone());
        self.emit(OutboundMessage::ExecutionReport(corrected));
        self.orders.update();
        self.executions.update();
        tracing::info!(
            execution_id = %execution_id,
            order_id = %order_id,
            shares = %new_qty,
            price = %new_px,
            "Execution corrected"
        );
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Apply a plain status transition and report it with zero shares.
    fn transition(
        &self,
        order_id: &OrderId,
        exec_type: ExecType,
        apply: impl FnOnce(&mut Order),
    ) -> Result<(), EngineError> {
        let _op = self.op_gate.lock();

        let order = self.orders.with_order_mut(order_id, |order| {
            apply(order);
            order.clone()
        })?;

        let report = Execution::report(&order, exec_type, Quantity::ZERO, Price::ZERO);
        self.executions.add(report.clone());
        self.emit(OutboundMessage::ExecutionReport(report));
        self.orders.update();
        self.executions.update();
        tracing::debug!(
            order_id = %order_id,
            exec_type = %exec_type,
            status = %order.status(),
            "Lifecycle transition applied"
        );
        Ok(())
    }

    /// Hand a message to the transport and append it to the activity
    /// trail. With no session connected the message is dropped; the
    /// state transition behind it stands either way.
    fn emit(&self, message: OutboundMessage) {
        let session = self.session.read().clone();
        let Some(session) = session else {
            tracing::warn!(
                message = %message.summary(),
                "No session connected, dropping outbound message"
            );
            return;
        };

        let context = DeliveryContext {
            session: session.clone(),
            on_behalf_of_comp_id: self.settings.on_behalf_of_comp_id(),
            on_behalf_of_sub_id: self.settings.on_behalf_of_sub_id(),
        };
        if let Err(e) = self.transport.send(&message, &context) {
            tracing::error!(
                error = %e,
                message = %message.summary(),
                "Outbound delivery failed"
            );
        }
        self.activity.append(
            Direction::Outbound,
            &session,
            message.summary(),
            self.settings.log_capacity(),
        );
    }

    /// Append an inbound message to the activity trail.
    fn record_inbound(&self, summary: String) {
        if let Some(session) = self.session.read().clone() {
            self.activity
                .append(Direction::Inbound, &session, summary, self.settings.log_capacity());
        }
    }
}
