//! Entry Dispatch
//!
//! Operation names and argument shapes are validated in exactly one place:
//! [`Operation::decode`]. Handlers receive strongly-typed arguments and never
//! inspect the operation name; malformed calls are refused before any handler
//! logic can run.

use std::fmt;

use lib_types::{Address, Amount};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::AuthorizationOracle;
use crate::errors::{LedgerError, LedgerResult};
use crate::events::EventSink;
use crate::ops;
use crate::store::ContractStore;

/// Dynamically-typed argument as supplied by the host call convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallValue {
    /// An account address
    Address(Address),
    /// A signed host integer; ledger policy decides whether non-positive
    /// values are acceptable
    Int(i128),
}

/// A ledger operation with strongly-typed arguments.
///
/// The closed set of operations this contract exposes. Decoded once at the
/// boundary by [`Operation::decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Direct transfer, authorized by the sender's witness
    Transfer {
        from: Address,
        to: Address,
        amount: i128,
    },
    /// Delegated transfer drawing on a prior allowance
    TransferFrom {
        from: Address,
        to: Address,
        amount: i128,
    },
    /// Grant a cumulative spending allowance
    Approve {
        owner: Address,
        spender: Address,
        amount: i128,
    },
    /// Read an (owner, spender) allowance
    Allowance { owner: Address, spender: Address },
}

impl Operation {
    /// Decode an operation name and raw argument list.
    ///
    /// The only place operation names are matched. Arity and argument types
    /// are validated here; a mismatch refuses the call with
    /// [`LedgerError::MalformedCall`], an unrecognized name with
    /// [`LedgerError::UnknownOperation`].
    pub fn decode(name: &str, args: &[CallValue]) -> LedgerResult<Self> {
        match name {
            "transfer" => {
                let (from, to, amount) = two_addresses_and_int(name, args)?;
                Ok(Operation::Transfer { from, to, amount })
            }
            "transferFrom" => {
                let (from, to, amount) = two_addresses_and_int(name, args)?;
                Ok(Operation::TransferFrom { from, to, amount })
            }
            "approve" => {
                let (owner, spender, amount) = two_addresses_and_int(name, args)?;
                Ok(Operation::Approve {
                    owner,
                    spender,
                    amount,
                })
            }
            "allowance" => {
                let (owner, spender) = two_addresses(name, args)?;
                Ok(Operation::Allowance { owner, spender })
            }
            other => Err(LedgerError::UnknownOperation(other.to_string())),
        }
    }
}

fn two_addresses_and_int(
    name: &str,
    args: &[CallValue],
) -> LedgerResult<(Address, Address, i128)> {
    match args {
        [CallValue::Address(a), CallValue::Address(b), CallValue::Int(n)] => Ok((*a, *b, *n)),
        _ => Err(malformed(name, "(address, address, int)", args)),
    }
}

fn two_addresses(name: &str, args: &[CallValue]) -> LedgerResult<(Address, Address)> {
    match args {
        [CallValue::Address(a), CallValue::Address(b)] => Ok((*a, *b)),
        _ => Err(malformed(name, "(address, address)", args)),
    }
}

fn malformed(name: &str, expected: &str, args: &[CallValue]) -> LedgerError {
    LedgerError::MalformedCall(format!(
        "{} takes {}, got {} argument(s)",
        name,
        expected,
        args.len()
    ))
}

/// Value returned to the host by [`invoke`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvokeValue {
    /// Success flag of a state-changing operation (or refusal of a malformed
    /// call)
    Bool(bool),
    /// Result of the allowance query
    Amount(Amount),
    /// The operation name was not recognized
    Unknown,
}

impl InvokeValue {
    /// Whether the call reported success
    pub fn is_success(&self) -> bool {
        matches!(self, InvokeValue::Bool(true) | InvokeValue::Amount(_))
    }
}

impl fmt::Display for InvokeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvokeValue::Bool(flag) => write!(f, "{}", flag),
            InvokeValue::Amount(amount) => write!(f, "{}", amount),
            InvokeValue::Unknown => write!(f, "unknown operation"),
        }
    }
}

/// Contract entry point.
///
/// Decodes the operation, runs it against the injected collaborators, and
/// folds the outcome into the host return convention: `true`/`false` for
/// state-changing operations, an integer for the allowance query, and the
/// `unknown operation` diagnostic for unrecognized names.
///
/// Ordinary precondition failures become `Ok(Bool(false))` with nothing
/// written and nothing emitted. Arithmetic and storage faults propagate as
/// `Err` and abort the invocation.
pub fn invoke(
    store: &dyn ContractStore,
    auth: &dyn AuthorizationOracle,
    events: &mut dyn EventSink,
    operation: &str,
    args: &[CallValue],
) -> LedgerResult<InvokeValue> {
    let decoded = match Operation::decode(operation, args) {
        Ok(decoded) => decoded,
        Err(LedgerError::UnknownOperation(name)) => {
            debug!("unknown operation: {}", name);
            return Ok(InvokeValue::Unknown);
        }
        Err(LedgerError::MalformedCall(reason)) => {
            debug!("malformed call refused: {}", reason);
            return Ok(InvokeValue::Bool(false));
        }
        Err(err) => return Err(err),
    };

    let result = match decoded {
        Operation::Transfer { from, to, amount } => {
            ops::transfer(store, auth, events, &from, &to, amount).map(|_| InvokeValue::Bool(true))
        }
        Operation::TransferFrom { from, to, amount } => {
            ops::transfer_from(store, events, &from, &to, amount).map(|_| InvokeValue::Bool(true))
        }
        Operation::Approve {
            owner,
            spender,
            amount,
        } => ops::approve(store, auth, events, &owner, &spender, amount)
            .map(|_| InvokeValue::Bool(true)),
        Operation::Allowance { owner, spender } => {
            ops::allowance(store, &owner, &spender).map(InvokeValue::Amount)
        }
    };

    match result {
        Ok(value) => Ok(value),
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => {
            debug!("{} refused: {}", operation, err);
            Ok(InvokeValue::Bool(false))
        }
    }
}
