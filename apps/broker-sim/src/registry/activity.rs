//! Bounded activity log.
//!
//! Fixed-capacity, insertion-ordered record of protocol traffic for
//! audit display. Strict FIFO eviction once capacity is exceeded; the
//! capacity is passed in per append so runtime settings changes take
//! effect immediately.

use std::collections::VecDeque;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

use crate::domain::{SessionId, Timestamp};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Direction of an observed protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Received from the counterparty.
    Inbound,
    /// Sent to the counterparty.
    Outbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inbound => write!(f, "INBOUND"),
            Self::Outbound => write!(f, "OUTBOUND"),
        }
    }
}

/// One observed message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Monotonically increasing position across the log's lifetime.
    pub index: u64,
    /// Message direction.
    pub direction: Direction,
    /// Session the message belongs to.
    pub session: SessionId,
    /// Human-readable message summary.
    pub summary: String,
    /// Observation time.
    pub at: Timestamp,
}

#[derive(Debug, Default)]
struct LogState {
    entries: VecDeque<ActivityEntry>,
    next_index: u64,
}

/// Fixed-capacity audit log of protocol traffic.
#[derive(Debug)]
pub struct ActivityLog {
    state: RwLock<LogState>,
    changes: broadcast::Sender<()>,
}

impl ActivityLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(LogState::default()),
            changes,
        }
    }

    /// Append an entry, evicting the oldest entries beyond `capacity`.
    pub fn append(
        &self,
        direction: Direction,
        session: &SessionId,
        summary: impl Into<String>,
        capacity: usize,
    ) {
        let mut state = self.state.write();
        let index = state.next_index;
        state.next_index += 1;
        state.entries.push_back(ActivityEntry {
            index,
            direction,
            session: session.clone(),
            summary: summary.into(),
            at: Timestamp::now(),
        });
        while state.entries.len() > capacity {
            state.entries.pop_front();
        }
    }

    /// Get the entry at `position` counted from the oldest retained one.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<ActivityEntry> {
        self.state.read().entries.get(position).cloned()
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Whether the log holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Clone the retained entries, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ActivityEntry> {
        self.state.read().entries.iter().cloned().collect()
    }

    /// Fire the change-notification hook. Never alters log contents.
    pub fn update(&self) {
        let _ = self.changes.send(());
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}
