//! Domain model.
//!
//! Orders, executions, and the value objects they are built from.
//! Value objects are compared by value; the [`Order`] aggregate owns
//! every status transition and all fill/bust/correct arithmetic.

pub mod errors;
pub mod exec_type;
pub mod execution;
pub mod identifiers;
pub mod order;
pub mod order_status;
pub mod price;
pub mod quantity;
pub mod side;
pub mod timestamp;

pub use errors::DomainError;
pub use exec_type::{ExecTransType, ExecType};
pub use execution::Execution;
pub use identifiers::{ClientOrderId, ExecutionId, OrderId, SessionId};
pub use order::{Order, PendingRequest, SecurityReference};
pub use order_status::OrderStatus;
pub use price::Price;
pub use quantity::Quantity;
pub use side::Side;
pub use timestamp::Timestamp;
