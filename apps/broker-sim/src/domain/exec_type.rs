//! Execution report classification (FIX tags 150 and 20).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of event an execution report describes (FIX tag 150).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecType {
    /// Order acknowledged.
    New,
    /// Partial fill.
    PartialFill,
    /// Final fill.
    Fill,
    /// Done for day.
    DoneForDay,
    /// Order canceled.
    Canceled,
    /// Replace accepted.
    Replace,
    /// Cancel request pending.
    PendingCancel,
    /// Order rejected.
    Rejected,
    /// Replace request pending.
    PendingReplace,
}

impl ExecType {
    /// Get the FIX tag 150 value.
    #[must_use]
    pub const fn fix_tag_value(&self) -> char {
        match self {
            Self::New => '0',
            Self::PartialFill => '1',
            Self::Fill => '2',
            Self::DoneForDay => '3',
            Self::Canceled => '4',
            Self::Replace => '5',
            Self::PendingCancel => '6',
            Self::Rejected => '8',
            Self::PendingReplace => 'E',
        }
    }
}

impl fmt::Display for ExecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::PartialFill => write!(f, "PARTIAL_FILL"),
            Self::Fill => write!(f, "FILL"),
            Self::DoneForDay => write!(f, "DONE_FOR_DAY"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::Replace => write!(f, "REPLACE"),
            Self::PendingCancel => write!(f, "PENDING_CANCEL"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::PendingReplace => write!(f, "PENDING_REPLACE"),
        }
    }
}

/// Transaction type of an execution report (FIX tag 20).
///
/// [`ExecTransType::Cancel`] and [`ExecTransType::Correct`] reference an
/// earlier execution through its `ref_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecTransType {
    /// A fresh execution event.
    New,
    /// Busts a prior execution.
    Cancel,
    /// Corrects a prior execution.
    Correct,
}

impl ExecTransType {
    /// Get the FIX tag 20 value.
    #[must_use]
    pub const fn fix_tag_value(&self) -> char {
        match self {
            Self::New => '0',
            Self::Cancel => '1',
            Self::Correct => '2',
        }
    }
}

impl fmt::Display for ExecTransType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::Cancel => write!(f, "CANCEL"),
            Self::Correct => write!(f, "CORRECT"),
        }
    }
}
