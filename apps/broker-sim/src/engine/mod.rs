//! Order lifecycle engine and fulfillment worker.
//!
//! The engine applies every state transition and reports it; the worker
//! drains the fill queue in the background. Inbound requests are modeled
//! in [`requests`].

pub mod lifecycle;
pub mod requests;
pub mod worker;

pub use lifecycle::{EngineError, LifecycleEngine};
pub use requests::{CancelRequest, NewOrderRequest, ReplaceRequest, RequestError};
pub use worker::{FillWorker, WorkerError, WorkerEvent, WorkerState};
