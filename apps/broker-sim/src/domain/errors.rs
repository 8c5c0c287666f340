//! Domain errors.

use std::fmt;

/// Errors surfaced by registry lookups during lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// No order registered under the given id.
    OrderNotFound {
        /// Order id that missed.
        order_id: String,
    },

    /// No execution registered under the given id.
    ExecutionNotFound {
        /// Execution id that missed.
        execution_id: String,
    },
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrderNotFound { order_id } => {
                write!(f, "Order not found: {order_id}")
            }
            Self::ExecutionNotFound { execution_id } => {
                write!(f, "Execution not found: {execution_id}")
            }
        }
    }
}

impl std::error::Error for DomainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_not_found_display() {
        let err = DomainError::OrderNotFound {
            order_id: "ord-123".to_string(),
        };
        assert_eq!(format!("{err}"), "Order not found: ord-123");
    }

    #[test]
    fn execution_not_found_display() {
        let err = DomainError::ExecutionNotFound {
            execution_id: "exec-456".to_string(),
        };
        assert_eq!(format!("{err}"), "Execution not found: exec-456");
    }

    #[test]
    fn domain_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(DomainError::OrderNotFound {
            order_id: "test".to_string(),
        });
        assert!(!err.to_string().is_empty());
    }
}
