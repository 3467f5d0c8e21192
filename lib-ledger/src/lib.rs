//! Fungible Token Ledger Core
//!
//! The balance/allowance state machine of a fungible token running inside a
//! deterministic, metered execution environment. Storage and call
//! authorization are external collaborators injected as traits; the core owns
//! only the state-transition rules and their arithmetic and authorization
//! invariants.
//!
//! # Key Types
//!
//! - [`ContractStore`]: persistent key/value storage interface
//! - [`AuthorizationOracle`]: the host's witness check
//! - [`Operation`]: the closed set of ledger operations, decoded once at the
//!   boundary
//! - [`LedgerEvent`]: the two event shapes emitted on successful mutations
//!
//! # Execution
//!
//! Hosts call [`invoke`] with an operation name and argument list; library
//! users can call the typed operations in [`ops`] directly. Either way, every
//! invocation re-reads store state and performs all checks before its first
//! write, so a failing call leaves no partial state behind.

pub mod auth;
pub mod dispatch;
pub mod errors;
pub mod events;
pub mod ops;
pub mod store;

pub use auth::{AllowAll, AuthorizationOracle, WitnessSet};
pub use dispatch::{invoke, CallValue, InvokeValue, Operation};
pub use errors::{LedgerError, LedgerResult};
pub use events::{EventLog, EventSink, LedgerEvent};
pub use ops::{allowance, approve, balance_of, transfer, transfer_from};
pub use store::{read_or_zero, ContractStore, MemoryStore, StorageKey};
