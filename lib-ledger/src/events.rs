//! Ledger Events
//!
//! Exactly two event shapes exist, and both are emitted only on successful
//! state-changing paths. Failed operations emit nothing.

use lib_types::{Address, Amount};
use serde::{Deserialize, Serialize};

/// Event emitted by a successful state-changing operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    /// Value moved between two accounts
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },
    /// A spending allowance was granted
    Approval {
        owner: Address,
        spender: Address,
        amount: Amount,
    },
}

/// Sink for events emitted by ledger operations.
///
/// Hosts wire this to their transaction log; the ledger only pushes.
pub trait EventSink {
    /// Record an event
    fn emit(&mut self, event: LedgerEvent);
}

/// Recording sink for hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<LedgerEvent>,
}

impl EventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far, in emission order
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing has been emitted
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop all recorded events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }
}
