// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::needless_pass_by_value
    )
)]

//! Broker Sim - Sell-Side Order Simulator Core
//!
//! Simulates the broker/counterparty side of a FIX 4.2 style order
//! session: accepts new-order, cancel, and replace requests, applies the
//! full order status lifecycle, emits execution reports and cancel
//! rejects, and works resting orders to completion with a paced
//! background fill executor.
//!
//! # Architecture (Hexagonal)
//!
//! - **Domain**: the order aggregate, execution reports, and FIX-style
//!   value objects (`domain`)
//! - **Registries**: in-memory order and execution registries plus the
//!   bounded activity log (`registry`)
//! - **Engine**: the lifecycle engine, inbound request types, and the
//!   fulfillment worker (`engine`)
//! - **Ports**: transport and reference-price interfaces the core is
//!   driven through (`ports`)
//! - **Adapters**: in-process transport and price feed implementations
//!   (`transport`, `feed`)
//! - **Config**: YAML configuration with env interpolation and the
//!   runtime settings handle (`config`)

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod domain;
pub mod engine;
pub mod feed;
pub mod ports;
pub mod registry;
pub mod transport;

// Domain re-exports
pub use domain::{
    ClientOrderId, DomainError, ExecTransType, ExecType, Execution, ExecutionId, Order, OrderId,
    OrderStatus, PendingRequest, Price, Quantity, SecurityReference, SessionId, Side, Timestamp,
};

// Engine re-exports
pub use engine::{
    CancelRequest, EngineError, FillWorker, LifecycleEngine, NewOrderRequest, ReplaceRequest,
    RequestError, WorkerError, WorkerEvent, WorkerState,
};

// Port and adapter re-exports
pub use feed::{FixedPriceFeed, SyntheticPriceFeed};
pub use ports::{
    CancelReject, DeliveryContext, OutboundMessage, PriceFeedError, PriceFeedPort, RequestKind,
    TransportError, TransportPort,
};
pub use registry::{ActivityEntry, ActivityLog, Direction, ExecutionRegistry, OrderRegistry};
pub use transport::{ChannelTransport, RecordingTransport};

// Config re-exports
pub use config::{ConfigError, Settings, SimulatorConfig, load_config, load_config_from_string};
