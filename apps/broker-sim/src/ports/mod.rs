//! Ports to the external collaborators.

pub mod price_feed;
pub mod transport;

pub use price_feed::{PriceFeedError, PriceFeedPort};
pub use transport::{
    CancelReject, DeliveryContext, OutboundMessage, RequestKind, TransportError, TransportPort,
};
