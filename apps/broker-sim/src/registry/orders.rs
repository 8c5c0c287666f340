//! Order registry.
//!
//! Owns every order record for the process lifetime, keyed by order id,
//! plus the FIFO queue of orders awaiting fulfillment-worker attention.
//! All mutation happens under one write lock so the inbound path and the
//! worker never race on the same record.

use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::domain::{ClientOrderId, DomainError, Order, OrderId};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct OrderState {
    orders: HashMap<OrderId, Order>,
    insertion: Vec<OrderId>,
    fill_queue: VecDeque<OrderId>,
}

/// Registry of all orders plus the fill queue.
#[derive(Debug)]
pub struct OrderRegistry {
    state: RwLock<OrderState>,
    changes: broadcast::Sender<()>,
}

impl OrderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(OrderState::default()),
            changes,
        }
    }

    /// Insert or replace a record by id; optionally queue it for the
    /// fulfillment worker.
    pub fn add(&self, order: Order, enqueue_for_fill: bool) {
        let mut state = self.state.write();
        let id = order.id().clone();
        if state.orders.insert(id.clone(), order).is_none() {
            state.insertion.push(id.clone());
        }
        if enqueue_for_fill {
            state.fill_queue.push_back(id);
        }
    }

    /// Clone the record under `id`.
    #[must_use]
    pub fn get(&self, id: &OrderId) -> Option<Order> {
        self.state.read().orders.get(id).cloned()
    }

    /// Find the order whose current client order id matches, used to
    /// resolve cancel/replace requests against the id chain.
    #[must_use]
    pub fn find_by_client_id(&self, client_order_id: &ClientOrderId) -> Option<Order> {
        let state = self.state.read();
        state
            .insertion
            .iter()
            .filter_map(|id| state.orders.get(id))
            .find(|order| order.client_order_id() == client_order_id)
            .cloned()
    }

    /// Run a mutation against the record under `id` inside the write
    /// lock, so a lifecycle read-modify-write is one critical section.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::OrderNotFound`] when no record exists.
    pub fn with_order_mut<T>(
        &self,
        id: &OrderId,
        mutate: impl FnOnce(&mut Order) -> T,
    ) -> Result<T, DomainError> {
        let mut state = self.state.write();
        state
            .orders
            .get_mut(id)
            .map(mutate)
            .ok_or_else(|| DomainError::OrderNotFound {
                order_id: id.to_string(),
            })
    }

    /// Whether any order is queued for the worker.
    #[must_use]
    pub fn has_fillable(&self) -> bool {
        !self.state.read().fill_queue.is_empty()
    }

    /// Pop the next queued order. Destructive; returns a clone of the
    /// record as it stands at pop time.
    #[must_use]
    pub fn take_next(&self) -> Option<Order> {
        let mut state = self.state.write();
        while let Some(id) = state.fill_queue.pop_front() {
            if let Some(order) = state.orders.get(&id) {
                return Some(order.clone());
            }
        }
        None
    }

    /// Number of registered orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().orders.len()
    }

    /// Whether the registry holds no orders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().orders.is_empty()
    }

    /// Clone all records in insertion order, for presentation.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Order> {
        let state = self.state.read();
        state
            .insertion
            .iter()
            .filter_map(|id| state.orders.get(id))
            .cloned()
            .collect()
    }

    /// Fire the change-notification hook. Never alters registry
    /// contents; safe to call any number of times.
    pub fn update(&self) {
        let _ = self.changes.send(());
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }
}

impl Default for OrderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Quantity, Side};

    fn make_order(client_id: &str) -> Order {
        Order::new(
            ClientOrderId::new(client_id),
            "AAPL",
            Side::Buy,
            Quantity::from_i64(100),
            None,
        )
    }

    #[test]
    fn add_and_get() {
        let registry = OrderRegistry::new();
        let order = make_order("CLIENT-1");
        let id = order.id().clone();

        registry.add(order, false);

        assert_eq!(registry.len(), 1);
        assert!(registry.get(&id).is_some());
        assert!(!registry.has_fillable());
    }

    #[test]
    fn add_replaces_existing_record() {
        let registry = OrderRegistry::new();
        let mut order = make_order("CLIENT-1");
        let id = order.id().clone();
        registry.add(order.clone(), false);

        order.acknowledge();
        registry.add(order, false);

        assert_eq!(registry.len(), 1);
        let stored = registry.get(&id).unwrap();
        assert!(!stored.received_order());
    }

    #[test]
    fn fill_queue_is_fifo() {
        let registry = OrderRegistry::new();
        let first = make_order("CLIENT-1");
        let second = make_order("CLIENT-2");
        registry.add(first.clone(), true);
        registry.add(second.clone(), true);

        assert!(registry.has_fillable());
        assert_eq!(registry.take_next().unwrap().id(), first.id());
        assert_eq!(registry.take_next().unwrap().id(), second.id());
        assert!(registry.take_next().is_none());
        assert!(!registry.has_fillable());
    }

    #[test]
    fn take_next_on_empty_queue() {
        let registry = OrderRegistry::new();
        assert!(registry.take_next().is_none());
    }

    #[test]
    fn with_order_mut_mutates_in_place() {
        let registry = OrderRegistry::new();
        let order = make_order("CLIENT-1");
        let id = order.id().clone();
        registry.add(order, false);

        registry
            .with_order_mut(&id, Order::acknowledge)
            .unwrap();

        assert!(!registry.get(&id).unwrap().received_order());
    }

    #[test]
    fn with_order_mut_misses_unknown_id() {
        let registry = OrderRegistry::new();
        let missing = OrderId::generate();

        let result = registry.with_order_mut(&missing, Order::acknowledge);

        assert!(matches!(result, Err(DomainError::OrderNotFound { .. })));
    }

    #[test]
    fn find_by_client_id_matches_current_chain_id() {
        let registry = OrderRegistry::new();
        let order = make_order("CLIENT-1");
        let id = order.id().clone();
        registry.add(order, false);

        assert!(registry
            .find_by_client_id(&ClientOrderId::new("CLIENT-1"))
            .is_some());

        registry
            .with_order_mut(&id, |o| o.note_cancel_request(ClientOrderId::new("CLIENT-2")))
            .unwrap();

        assert!(registry
            .find_by_client_id(&ClientOrderId::new("CLIENT-1"))
            .is_none());
        assert!(registry
            .find_by_client_id(&ClientOrderId::new("CLIENT-2"))
            .is_some());
    }

    #[test]
    fn snapshot_preserves_insertion_order() {
        let registry = OrderRegistry::new();
        let first = make_order("CLIENT-1");
        let second = make_order("CLIENT-2");
        registry.add(first.clone(), false);
        registry.add(second.clone(), false);

        let snapshot = registry.snapshot();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].id(), first.id());
        assert_eq!(snapshot[1].id(), second.id());
    }

    #[test]
    fn update_notifies_without_changing_contents() {
        let registry = OrderRegistry::new();
        registry.add(make_order("CLIENT-1"), true);
        let mut rx = registry.subscribe();

        registry.update();
        registry.update();

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
        assert_eq!(registry.len(), 1);
        assert!(registry.has_fillable());
    }
}
