//! Call Authorization
//!
//! The host verifies witnesses (signatures) cryptographically; the ledger
//! only ever asks a boolean question about the result.

use std::collections::HashSet;

use lib_types::Address;

/// Host-provided check: is the current call authorized to act as `address`?
///
/// Consulted exactly once per operation that requires it (a transfer's
/// sender, an approval's owner). Delegated transfers express authority
/// through allowances instead and never reach the oracle, and the allowance
/// query is a public read.
pub trait AuthorizationOracle {
    /// Whether the current call carries a verified witness for `address`.
    fn is_authorized(&self, address: &Address) -> bool;
}

/// Set of addresses whose witness verified for the current call.
///
/// Hosts populate one per invocation from their signature checks; tests
/// populate it directly.
#[derive(Debug, Clone, Default)]
pub struct WitnessSet {
    verified: HashSet<Address>,
}

impl WitnessSet {
    /// Create an empty witness set
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an address as carrying a verified witness
    pub fn grant(&mut self, address: Address) {
        self.verified.insert(address);
    }

    /// Withdraw an address's witness
    pub fn revoke(&mut self, address: &Address) {
        self.verified.remove(address);
    }
}

impl AuthorizationOracle for WitnessSet {
    fn is_authorized(&self, address: &Address) -> bool {
        self.verified.contains(address)
    }
}

/// Oracle that authorizes every address. For tests that are not about
/// authorization.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AuthorizationOracle for AllowAll {
    fn is_authorized(&self, _address: &Address) -> bool {
        true
    }
}
