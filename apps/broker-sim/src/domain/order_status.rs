//! Order lifecycle status (FIX tag 39).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an order as reported on execution reports.
///
/// Terminal statuses never transition again except through a full bust,
/// which restores the order to [`OrderStatus::New`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Acknowledged and open with no fills.
    New,
    /// Some quantity executed, some still open.
    PartiallyFilled,
    /// Entire ordered quantity executed.
    Filled,
    /// Closed for the trading day.
    DoneForDay,
    /// Canceled by counterparty action.
    Canceled,
    /// Superseded by an accepted replace request.
    Replaced,
    /// Cancel request received, not yet resolved.
    PendingCancel,
    /// Rejected at acceptance.
    Rejected,
    /// Replace request received, not yet resolved.
    PendingReplace,
    /// Initial state before acknowledgement.
    Unknown,
}

impl OrderStatus {
    /// Whether the order has reached a state that normal lifecycle
    /// operations never leave.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::DoneForDay | Self::Canceled | Self::Replaced | Self::Rejected
        )
    }

    /// Whether a cancel or replace request is awaiting resolution.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::PendingCancel | Self::PendingReplace)
    }

    /// Whether the order can still receive fills.
    #[must_use]
    pub const fn can_fill(&self) -> bool {
        !self.is_terminal()
    }

    /// Parse a FIX tag 39 character.
    #[must_use]
    pub const fn from_fix_char(value: char) -> Option<Self> {
        match value {
            '0' => Some(Self::New),
            '1' => Some(Self::PartiallyFilled),
            '2' => Some(Self::Filled),
            '3' => Some(Self::DoneForDay),
            '4' => Some(Self::Canceled),
            '5' => Some(Self::Replaced),
            '6' => Some(Self::PendingCancel),
            '8' => Some(Self::Rejected),
            'E' => Some(Self::PendingReplace),
            _ => None,
        }
    }

    /// Get the FIX tag 39 value.
    ///
    /// [`OrderStatus::Unknown`] has no wire representation and maps to `'?'`.
    #[must_use]
    pub const fn fix_tag_value(&self) -> char {
        match self {
            Self::New => '0',
            Self::PartiallyFilled => '1',
            Self::Filled => '2',
            Self::DoneForDay => '3',
            Self::Canceled => '4',
            Self::Replaced => '5',
            Self::PendingCancel => '6',
            Self::Rejected => '8',
            Self::PendingReplace => 'E',
            Self::Unknown => '?',
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            Self::Filled => write!(f, "FILLED"),
            Self::DoneForDay => write!(f, "DONE_FOR_DAY"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::Replaced => write!(f, "REPLACED"),
            Self::PendingCancel => write!(f, "PENDING_CANCEL"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::PendingReplace => write!(f, "PENDING_REPLACE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}
