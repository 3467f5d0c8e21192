//! Contract Storage
//!
//! The ledger persists balances and allowances through the [`ContractStore`]
//! interface: a flat mapping from opaque byte-string keys to [`Amount`]
//! values. The store holds the sole authority over state; the ledger never
//! caches values across invocations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use lib_types::{Address, Amount, ADDRESS_LEN};

use crate::errors::{LedgerError, LedgerResult};

// ============================================================================
// KEYS
// ============================================================================

/// Opaque byte-string storage key.
///
/// Balance records are keyed by the raw address bytes. Allowance records are
/// keyed by the owner and spender addresses concatenated with no separator,
/// owner first. Addresses are fixed-length, so the concatenation cannot
/// collide, and the two key families differ in length (32 vs 64 bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(Vec<u8>);

impl StorageKey {
    /// Balance key for an account: the address bytes themselves.
    pub fn balance(account: &Address) -> Self {
        Self(account.as_bytes().to_vec())
    }

    /// Allowance key for an (owner, spender) pair.
    pub fn allowance(owner: &Address, spender: &Address) -> Self {
        let mut bytes = Vec::with_capacity(2 * ADDRESS_LEN);
        bytes.extend_from_slice(owner.as_bytes());
        bytes.extend_from_slice(spender.as_bytes());
        Self(bytes)
    }

    /// Get the underlying bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for StorageKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// ============================================================================
// STORE INTERFACE
// ============================================================================

/// Persistent key/value store for ledger records.
///
/// All methods take `&self`; implementations use interior mutability (a
/// mutex-guarded map in [`MemoryStore`], the engine's own synchronization in
/// a persistent backend). Changes are durable only if the overall invocation
/// succeeds; the ledger upholds this by completing every check before its
/// first write.
pub trait ContractStore {
    /// Get a record. Absent keys are `None`; the missing-means-zero default
    /// belongs to the callers, not the store.
    fn get(&self, key: &StorageKey) -> LedgerResult<Option<Amount>>;

    /// Write a record, creating it if absent.
    fn put(&self, key: &StorageKey, value: Amount) -> LedgerResult<()>;

    /// Remove a record. Removing an absent key is not an error.
    fn delete(&self, key: &StorageKey) -> LedgerResult<()>;

    /// Check whether a record exists (distinguishes an explicit zero from an
    /// absent key).
    fn contains(&self, key: &StorageKey) -> LedgerResult<bool>;
}

/// Read a record, defaulting an absent key to zero.
pub fn read_or_zero(store: &dyn ContractStore, key: &StorageKey) -> LedgerResult<Amount> {
    Ok(store.get(key)?.unwrap_or(0))
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// In-memory store for hosts and tests.
///
/// Interior mutability via `Arc<Mutex<>>` allows `&self` methods while the
/// store stays cloneable between a host and its assertions.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<Vec<u8>, Amount>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account balance directly, bypassing ledger rules. Intended for
    /// genesis setup and tests.
    pub fn seed_balance(&self, account: &Address, amount: Amount) -> LedgerResult<()> {
        self.put(&StorageKey::balance(account), amount)
    }

    /// Sum of all balance records (keys of address length). Allowance records
    /// are excluded by their longer key.
    pub fn total_balance(&self) -> LedgerResult<Amount> {
        let records = self.lock()?;
        records
            .iter()
            .filter(|(key, _)| key.len() == ADDRESS_LEN)
            .try_fold(0u128, |sum, (_, value)| sum.checked_add(*value))
            .ok_or(LedgerError::Overflow)
    }

    /// Number of live records of any kind.
    pub fn len(&self) -> LedgerResult<usize> {
        Ok(self.lock()?.len())
    }

    /// Whether the store holds no records at all.
    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, HashMap<Vec<u8>, Amount>>> {
        self.records
            .lock()
            .map_err(|e| LedgerError::Storage(anyhow!("lock poisoned: {}", e)))
    }
}

impl ContractStore for MemoryStore {
    fn get(&self, key: &StorageKey) -> LedgerResult<Option<Amount>> {
        Ok(self.lock()?.get(key.as_bytes()).copied())
    }

    fn put(&self, key: &StorageKey, value: Amount) -> LedgerResult<()> {
        self.lock()?.insert(key.as_bytes().to_vec(), value);
        Ok(())
    }

    fn delete(&self, key: &StorageKey) -> LedgerResult<()> {
        self.lock()?.remove(key.as_bytes());
        Ok(())
    }

    fn contains(&self, key: &StorageKey) -> LedgerResult<bool> {
        Ok(self.lock()?.contains_key(key.as_bytes()))
    }
}
