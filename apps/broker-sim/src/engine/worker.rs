//! Fulfillment worker.
//!
//! A long-lived background task that drains the order registry's fill
//! queue: each popped order is acknowledged, priced once, and worked to
//! completion in configurable slices with a pacing delay between them.
//! Reconfiguration is eventually consistent; shutdown is cooperative via
//! a cancellation token and interrupts any in-flight sleep.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::domain::{Order, OrderId, Quantity};
use crate::feed::synthetic_price;
use crate::ports::PriceFeedPort;

use super::lifecycle::{EngineError, LifecycleEngine};

/// Poll interval while the session is down or the queue is empty.
const IDLE_POLL: Duration = Duration::from_secs(5);

/// Worker lifecycle errors.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// `start` was called while the worker is running.
    #[error("fulfillment worker is already running")]
    AlreadyRunning,
}

/// Worker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Not running; the fill queue is left alone.
    Stopped = 0,
    /// Draining the fill queue.
    Running = 1,
}

impl From<u8> for WorkerState {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Running,
            _ => Self::Stopped,
        }
    }
}

/// Events broadcast by the worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// The worker started draining the queue.
    Started,
    /// An order was worked to completion.
    OrderWorked {
        /// The worked order.
        order_id: OrderId,
    },
    /// An engine fault ended the run.
    Faulted {
        /// The fault, rendered.
        message: String,
    },
    /// The worker exited.
    Stopped,
}

/// Background order-fulfillment worker.
pub struct FillWorker {
    engine: Arc<LifecycleEngine>,
    delay_ms: Arc<AtomicU64>,
    partials: Arc<AtomicU32>,
    state: Arc<AtomicU8>,
    shutdown: Mutex<Option<CancellationToken>>,
    handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
    events: broadcast::Sender<WorkerEvent>,
}

impl FillWorker {
    /// Create a stopped worker over the engine.
    #[must_use]
    pub fn new(engine: Arc<LifecycleEngine>) -> Self {
        let (events, _) = broadcast::channel(64);

        Self {
            engine,
            delay_ms: Arc::new(AtomicU64::new(1000)),
            partials: Arc::new(AtomicU32::new(1)),
            state: Arc::new(AtomicU8::new(WorkerState::Stopped as u8)),
            shutdown: Mutex::new(None),
            handle: Mutex::new(None),
            events,
        }
    }

    /// Start draining the fill queue.
    ///
    /// `delay` paces the slices, `partials` is the slice count per order,
    /// `price_source` resolves the per-order fill price (synthetic
    /// fallback on any feed failure).
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::AlreadyRunning`] when the worker is
    /// already draining.
    pub fn start(
        &self,
        delay: Duration,
        partials: u32,
        price_source: Arc<dyn PriceFeedPort>,
    ) -> Result<(), WorkerError> {
        let mut handle_slot = self.handle.lock();
        if self.state() == WorkerState::Running {
            return Err(WorkerError::AlreadyRunning);
        }

        self.set_delay(delay);
        self.set_partials(partials);

        let shutdown = CancellationToken::new();
        *self.shutdown.lock() = Some(shutdown.clone());
        self.state
            .store(WorkerState::Running as u8, Ordering::SeqCst);
        self.engine.set_worker_active(true);
        let _ = self.events.send(WorkerEvent::Started);
        tracing::info!(
            delay_ms = self.delay_ms.load(Ordering::SeqCst),
            partials = self.partials.load(Ordering::SeqCst),
            "Fulfillment worker started"
        );

        *handle_slot = Some(tokio::spawn(run_loop(
            Arc::clone(&self.engine),
            price_source,
            Arc::clone(&self.delay_ms),
            Arc::clone(&self.partials),
            Arc::clone(&self.state),
            shutdown,
            self.events.clone(),
        )));
        Ok(())
    }

    /// Stop the worker: cancel, wake any in-flight sleep, and join.
    ///
    /// Safe to call on a stopped worker. After return no further
    /// registry mutation happens on the worker's behalf.
    pub async fn stop(&self) {
        let token = self.shutdown.lock().take();
        let handle = self.handle.lock().take();

        let Some(token) = token else {
            return;
        };
        token.cancel();
        self.engine.wake_worker();

        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            tracing::error!(error = %e, "Fulfillment worker join failed");
        }
        tracing::info!("Fulfillment worker stopped");
    }

    /// Update the pacing delay; observed at the next slice boundary.
    pub fn set_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Update the slice count; observed at the next order.
    pub fn set_partials(&self, partials: u32) {
        self.partials.store(partials.max(1), Ordering::SeqCst);
    }

    /// Current pacing delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.load(Ordering::SeqCst))
    }

    /// Current slice count.
    #[must_use]
    pub fn partials(&self) -> u32 {
        self.partials.load(Ordering::SeqCst)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> WorkerState {
        WorkerState::from(self.state.load(Ordering::SeqCst))
    }

    /// Whether the worker is draining the queue.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == WorkerState::Running
    }

    /// Subscribe to worker events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.events.subscribe()
    }
}

/// The worker's run loop. Exits on cancellation or on an engine fault;
/// either way the epilogue lands the worker in Stopped.
async fn run_loop(
    engine: Arc<LifecycleEngine>,
    price_source: Arc<dyn PriceFeedPort>,
    delay_ms: Arc<AtomicU64>,
    partials: Arc<AtomicU32>,
    state: Arc<AtomicU8>,
    shutdown: CancellationToken,
    events: broadcast::Sender<WorkerEvent>,
) {
    loop {
        if shutdown.is_cancelled() {
            break;
        }

        if !engine.is_connected() || !engine.orders().has_fillable() {
            tokio::select! {
                () = shutdown.cancelled() => break,
                () = engine.fill_wake().notified() => {}
                () = tokio::time::sleep(IDLE_POLL) => {}
            }
            continue;
        }

        let Some(order) = engine.orders().take_next() else {
            continue;
        };

        if let Err(e) = work_order(&engine, &price_source, &delay_ms, &partials, &shutdown, &order)
            .await
        {
            tracing::error!(error = %e, order_id = %order.id(), "Fulfillment worker fault");
            let _ = events.send(WorkerEvent::Faulted {
                message: e.to_string(),
            });
            break;
        }
        let _ = events.send(WorkerEvent::OrderWorked {
            order_id: order.id().clone(),
        });
    }

    state.store(WorkerState::Stopped as u8, Ordering::SeqCst);
    engine.set_worker_active(false);
    let _ = events.send(WorkerEvent::Stopped);
}

/// Acknowledge one popped order and work it to completion in slices.
///
/// The price is resolved once per order; every iteration sleeps the
/// pacing delay, including iterations after the order completed early,
/// so total pacing stays deterministic.
async fn work_order(
    engine: &LifecycleEngine,
    price_source: &Arc<dyn PriceFeedPort>,
    delay_ms: &AtomicU64,
    partials: &AtomicU32,
    shutdown: &CancellationToken,
    order: &Order,
) -> Result<(), EngineError> {
    let order_id = order.id();
    engine.acknowledge(order_id)?;

    let partials = partials.load(Ordering::SeqCst).max(1);
    let precision = engine.settings().price_precision();
    let slice = slice_quantity(order.ordered_qty(), partials);

    let px = match price_source.last_price(order.symbol()).await {
        Ok(px) => px,
        Err(e) => {
            tracing::debug!(
                symbol = order.symbol(),
                error = %e,
                "Reference price unavailable, using synthetic price"
            );
            synthetic_price(precision)
        }
    };

    for iteration in 1..=partials {
        let open = engine
            .orders()
            .get(order_id)
            .map_or(Quantity::ZERO, |current| current.open_qty());
        if open.is_positive() {
            let last = iteration == partials || slice >= open;
            let qty = if last { open } else { slice };
            engine.fill(order_id, qty, px)?;
        }

        let delay = Duration::from_millis(delay_ms.load(Ordering::SeqCst));
        tokio::select! {
            () = shutdown.cancelled() => return Ok(()),
            () = tokio::time::sleep(delay) => {}
        }
    }
    Ok(())
}

/// Per-slice quantity: `floor(ordered / partials)`, minimum one share.
fn slice_quantity(ordered: Quantity, partials: u32) -> Quantity {
    let per_slice = (ordered.amount() / Decimal::from(partials)).floor();
    if per_slice < Decimal::ONE {
        Quantity::new(Decimal::ONE)
    } else {
        Quantity::new(per_slice)
    }
}
