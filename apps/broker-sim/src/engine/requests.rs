//! Inbound request messages.
//!
//! Decoded new-order, cancel, and replace requests as handed over by the
//! protocol/session collaborator. Each request validates its own shape;
//! whether it is actionable against the registries is the engine's call.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ClientOrderId, Quantity, SecurityReference, Side};

/// Request validation errors.
#[derive(Debug, Error)]
pub enum RequestError {
    /// A required field is missing or carries an unusable value.
    #[error("malformed request field '{field}': {message}")]
    Malformed {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

impl RequestError {
    fn malformed(field: &'static str, message: impl Into<String>) -> Self {
        Self::Malformed {
            field,
            message: message.into(),
        }
    }
}

/// A new order as requested by the counterparty (FIX NewOrderSingle).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    /// Client order id (tag 11).
    pub client_order_id: ClientOrderId,
    /// Symbol.
    pub symbol: String,
    /// Side.
    pub side: Side,
    /// Ordered quantity.
    pub quantity: Quantity,
    /// Security identifier, when the request carried one.
    pub security: Option<SecurityReference>,
}

impl NewOrderRequest {
    /// Check the request shape.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Malformed`] naming the first bad field.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.client_order_id.as_str().is_empty() {
            return Err(RequestError::malformed("client_order_id", "must not be empty"));
        }
        if self.symbol.is_empty() {
            return Err(RequestError::malformed("symbol", "must not be empty"));
        }
        if !self.quantity.is_positive() {
            return Err(RequestError::malformed(
                "quantity",
                format!("must be positive, got {}", self.quantity),
            ));
        }
        if let Some(security) = &self.security {
            if security.id().is_empty() {
                return Err(RequestError::malformed("security.id", "must not be empty"));
            }
            if security.source().is_empty() {
                return Err(RequestError::malformed("security.source", "must not be empty"));
            }
        }
        Ok(())
    }
}

/// A request to cancel a working order (FIX OrderCancelRequest).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    /// Id of this request (tag 11); becomes the order's client id on a hit.
    pub client_order_id: ClientOrderId,
    /// Client id of the order to cancel (tag 41).
    pub orig_client_order_id: ClientOrderId,
    /// Symbol, as stated by the requester.
    pub symbol: String,
    /// Side, as stated by the requester.
    pub side: Side,
}

impl CancelRequest {
    /// Check the request shape.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Malformed`] naming the first bad field.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.client_order_id.as_str().is_empty() {
            return Err(RequestError::malformed("client_order_id", "must not be empty"));
        }
        if self.orig_client_order_id.as_str().is_empty() {
            return Err(RequestError::malformed(
                "orig_client_order_id",
                "must not be empty",
            ));
        }
        if self.symbol.is_empty() {
            return Err(RequestError::malformed("symbol", "must not be empty"));
        }
        Ok(())
    }
}

/// A request to replace a working order (FIX OrderCancelReplaceRequest).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceRequest {
    /// Id of this request (tag 11); becomes the order's client id on a hit.
    pub client_order_id: ClientOrderId,
    /// Client id of the order to replace (tag 41).
    pub orig_client_order_id: ClientOrderId,
    /// Symbol, as stated by the requester.
    pub symbol: String,
    /// Side, as stated by the requester.
    pub side: Side,
    /// Requested replacement quantity.
    pub new_quantity: Quantity,
}

impl ReplaceRequest {
    /// Check the request shape.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Malformed`] naming the first bad field.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.client_order_id.as_str().is_empty() {
            return Err(RequestError::malformed("client_order_id", "must not be empty"));
        }
        if self.orig_client_order_id.as_str().is_empty() {
            return Err(RequestError::malformed(
                "orig_client_order_id",
                "must not be empty",
            ));
        }
        if self.symbol.is_empty() {
            return Err(RequestError::malformed("symbol", "must not be empty"));
        }
        if !self.new_quantity.is_positive() {
            return Err(RequestError::malformed(
                "new_quantity",
                format!("must be positive, got {}", self.new_quantity),
            ));
        }
        Ok(())
    }
}
