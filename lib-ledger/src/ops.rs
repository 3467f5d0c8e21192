//! Ledger Operations
//!
//! The four state-machine operations, plus the `balance_of` read helper.
//! Handlers receive their collaborators explicitly and return typed errors;
//! the entry dispatcher folds ordinary refusals into the host's boolean
//! convention.
//!
//! # Atomicity
//!
//! Every precondition and every checked arithmetic step completes before a
//! handler's first store write, so a failing invocation leaves the store
//! untouched. Arithmetic never wraps: any overflow or underflow aborts the
//! invocation as a fatal error.

use lib_types::{Address, Amount};
use tracing::{debug, trace};

use crate::auth::AuthorizationOracle;
use crate::errors::{LedgerError, LedgerResult};
use crate::events::{EventSink, LedgerEvent};
use crate::store::{read_or_zero, ContractStore, StorageKey};

/// Convert a host integer into an `Amount`, rejecting zero and negatives.
fn positive_amount(raw: i128) -> LedgerResult<Amount> {
    if raw == 0 {
        return Err(LedgerError::ZeroAmount);
    }
    Amount::try_from(raw).map_err(|_| LedgerError::InvalidAmount(raw))
}

/// Balance of an account, zero if no record exists.
pub fn balance_of(store: &dyn ContractStore, account: &Address) -> LedgerResult<Amount> {
    read_or_zero(store, &StorageKey::balance(account))
}

/// Current allowance for an (owner, spender) pair, zero if none was granted.
///
/// Public read: no authorization check, no side effects.
pub fn allowance(
    store: &dyn ContractStore,
    owner: &Address,
    spender: &Address,
) -> LedgerResult<Amount> {
    read_or_zero(store, &StorageKey::allowance(owner, spender))
}

/// Direct transfer, authorized by the sender's witness.
///
/// Fails on non-positive amounts, a missing witness for `from`, or an
/// insufficient balance. A self-transfer succeeds without touching the store
/// and emits no event. A balance drained to exactly zero has its record
/// deleted rather than written as zero.
pub fn transfer(
    store: &dyn ContractStore,
    auth: &dyn AuthorizationOracle,
    events: &mut dyn EventSink,
    from: &Address,
    to: &Address,
    amount: i128,
) -> LedgerResult<()> {
    let amount = positive_amount(amount)?;

    if !auth.is_authorized(from) {
        debug!("transfer rejected: no witness for sender {}", from);
        return Err(LedgerError::Unauthorized);
    }

    // Self-transfer is a guaranteed-success no-op, whatever the balance.
    if from == to {
        trace!("transfer of {} from {} to itself, nothing to do", amount, from);
        return Ok(());
    }

    let from_key = StorageKey::balance(from);
    let from_balance = read_or_zero(store, &from_key)?;
    if from_balance < amount {
        debug!(
            "transfer rejected: {} has {} of {} required",
            from, from_balance, amount
        );
        return Err(LedgerError::InsufficientBalance {
            have: from_balance,
            need: amount,
        });
    }

    let to_key = StorageKey::balance(to);
    let to_balance = read_or_zero(store, &to_key)?;

    // Both results are computed before anything is persisted.
    let new_from_balance = from_balance
        .checked_sub(amount)
        .ok_or(LedgerError::Underflow)?;
    let new_to_balance = to_balance.checked_add(amount).ok_or(LedgerError::Overflow)?;

    if new_from_balance == 0 {
        // Drained exactly to zero: drop the record instead of storing a zero.
        store.delete(&from_key)?;
    } else {
        store.put(&from_key, new_from_balance)?;
    }
    store.put(&to_key, new_to_balance)?;

    trace!("transfer of {} from {} to {} applied", amount, from, to);
    events.emit(LedgerEvent::Transfer {
        from: *from,
        to: *to,
        amount,
    });
    Ok(())
}

/// Delegated transfer, drawing on a previously granted allowance.
///
/// No witness check happens here: authority is expressed entirely by the
/// allowance the owner granted. The allowance consumed is keyed
/// (`from`, `to`) — the destination account doubles as the spender, so a
/// delegate can only move an owner's funds into the very account the owner
/// approved.
///
/// Unlike [`transfer`], this path always writes: records drained to zero are
/// stored explicitly rather than deleted.
pub fn transfer_from(
    store: &dyn ContractStore,
    events: &mut dyn EventSink,
    from: &Address,
    to: &Address,
    amount: i128,
) -> LedgerResult<()> {
    let amount = positive_amount(amount)?;

    // =========================================================================
    // Check 1: Allowance covers the amount
    // =========================================================================
    let allowance_key = StorageKey::allowance(from, to);
    let approved = read_or_zero(store, &allowance_key)?;
    if approved < amount {
        debug!(
            "transferFrom rejected: allowance {} of {} covers {} of {}",
            from, to, approved, amount
        );
        return Err(LedgerError::InsufficientAllowance {
            have: approved,
            need: amount,
        });
    }

    // =========================================================================
    // Check 2: Owner balance covers the amount
    // =========================================================================
    let from_key = StorageKey::balance(from);
    let from_balance = read_or_zero(store, &from_key)?;
    if from_balance < amount {
        debug!(
            "transferFrom rejected: {} has {} of {} required",
            from, from_balance, amount
        );
        return Err(LedgerError::InsufficientBalance {
            have: from_balance,
            need: amount,
        });
    }

    let to_key = StorageKey::balance(to);
    let to_balance = read_or_zero(store, &to_key)?;

    // =========================================================================
    // Apply state transitions
    // =========================================================================
    // All three results are computed before anything is persisted.
    let new_allowance = approved.checked_sub(amount).ok_or(LedgerError::Underflow)?;
    let new_from_balance = from_balance
        .checked_sub(amount)
        .ok_or(LedgerError::Underflow)?;
    let new_to_balance = to_balance.checked_add(amount).ok_or(LedgerError::Overflow)?;

    if from == to {
        // Debit and credit land on the same record: the balance is unchanged
        // and only the allowance is consumed. Writing new_from_balance and
        // new_to_balance in sequence would instead destroy the amount.
        store.put(&allowance_key, new_allowance)?;
        store.put(&from_key, from_balance)?;
    } else {
        // The three keys are disjoint; zero results are stored, not deleted.
        store.put(&allowance_key, new_allowance)?;
        store.put(&to_key, new_to_balance)?;
        store.put(&from_key, new_from_balance)?;
    }

    trace!("transferFrom of {} from {} to {} applied", amount, from, to);
    events.emit(LedgerEvent::Transfer {
        from: *from,
        to: *to,
        amount,
    });
    Ok(())
}

/// Grant (accumulate) a spending allowance, capped by the owner's present
/// balance.
///
/// The cap is point-in-time: the owner's balance may later drop below the
/// approved total, and delegated transfers still honor the remaining
/// allowance up to whatever balance is left at spend time. Approvals add to
/// any existing allowance rather than overwriting it. A zero amount is
/// permitted: it leaves the allowance unchanged and still emits the approval
/// event.
pub fn approve(
    store: &dyn ContractStore,
    auth: &dyn AuthorizationOracle,
    events: &mut dyn EventSink,
    owner: &Address,
    spender: &Address,
    amount: i128,
) -> LedgerResult<()> {
    if !auth.is_authorized(owner) {
        debug!("approve rejected: no witness for owner {}", owner);
        return Err(LedgerError::Unauthorized);
    }

    // Negative grants are unrepresentable in the allowance model.
    let amount = Amount::try_from(amount).map_err(|_| LedgerError::InvalidAmount(amount))?;

    let owner_balance = balance_of(store, owner)?;
    if owner_balance < amount {
        debug!(
            "approve rejected: {} grants {} against balance {}",
            owner, amount, owner_balance
        );
        return Err(LedgerError::InsufficientBalance {
            have: owner_balance,
            need: amount,
        });
    }

    let key = StorageKey::allowance(owner, spender);
    let current = read_or_zero(store, &key)?;
    let new_allowance = current.checked_add(amount).ok_or(LedgerError::Overflow)?;
    store.put(&key, new_allowance)?;

    trace!(
        "approval of {} by {} for {} applied (total {})",
        amount,
        owner,
        spender,
        new_allowance
    );
    events.emit(LedgerEvent::Approval {
        owner: *owner,
        spender: *spender,
        amount,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AllowAll, WitnessSet};
    use crate::events::EventLog;
    use crate::store::MemoryStore;

    fn addr(id: u8) -> Address {
        Address::new([id; 32])
    }

    fn witnesses_for(address: Address) -> WitnessSet {
        let mut witnesses = WitnessSet::new();
        witnesses.grant(address);
        witnesses
    }

    // ------------------------------------------------------------------
    // transfer
    // ------------------------------------------------------------------

    #[test]
    fn test_transfer_moves_value_and_conserves_supply() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let (a, b) = (addr(1), addr(2));
        store.seed_balance(&a, 100).unwrap();

        transfer(&store, &witnesses_for(a), &mut events, &a, &b, 40).unwrap();

        assert_eq!(balance_of(&store, &a).unwrap(), 60);
        assert_eq!(balance_of(&store, &b).unwrap(), 40);
        assert_eq!(store.total_balance().unwrap(), 100);
        assert_eq!(
            events.events(),
            &[LedgerEvent::Transfer {
                from: a,
                to: b,
                amount: 40
            }]
        );
    }

    #[test]
    fn test_transfer_rejects_zero_and_negative_amounts() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let (a, b) = (addr(1), addr(2));
        store.seed_balance(&a, 100).unwrap();

        let zero = transfer(&store, &AllowAll, &mut events, &a, &b, 0);
        assert!(matches!(zero, Err(LedgerError::ZeroAmount)));

        let negative = transfer(&store, &AllowAll, &mut events, &a, &b, -5);
        assert!(matches!(negative, Err(LedgerError::InvalidAmount(-5))));

        assert_eq!(balance_of(&store, &a).unwrap(), 100);
        assert_eq!(store.len().unwrap(), 1);
        assert!(events.is_empty());
    }

    #[test]
    fn test_transfer_requires_witness() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let (a, b) = (addr(1), addr(2));
        store.seed_balance(&a, 100).unwrap();

        // A witness for the recipient does not authorize the sender.
        let result = transfer(&store, &witnesses_for(b), &mut events, &a, &b, 40);
        assert!(matches!(result, Err(LedgerError::Unauthorized)));
        assert_eq!(balance_of(&store, &a).unwrap(), 100);
        assert!(events.is_empty());
    }

    #[test]
    fn test_self_transfer_succeeds_without_touching_state() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let a = addr(1);
        store.seed_balance(&a, 10).unwrap();

        // Succeeds even though the balance could not cover the amount.
        transfer(&store, &witnesses_for(a), &mut events, &a, &a, 50).unwrap();

        assert_eq!(balance_of(&store, &a).unwrap(), 10);
        assert_eq!(store.len().unwrap(), 1);
        assert!(events.is_empty());
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let (a, b) = (addr(1), addr(2));
        store.seed_balance(&a, 30).unwrap();

        let result = transfer(&store, &witnesses_for(a), &mut events, &a, &b, 40);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { have: 30, need: 40 })
        ));
        assert_eq!(balance_of(&store, &a).unwrap(), 30);
        assert_eq!(balance_of(&store, &b).unwrap(), 0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_transfer_deletes_record_drained_to_zero() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let (a, b) = (addr(1), addr(2));
        store.seed_balance(&a, 40).unwrap();

        transfer(&store, &witnesses_for(a), &mut events, &a, &b, 40).unwrap();

        // The record is gone, not an explicit zero.
        assert!(!store.contains(&StorageKey::balance(&a)).unwrap());
        assert_eq!(balance_of(&store, &a).unwrap(), 0);
        assert_eq!(balance_of(&store, &b).unwrap(), 40);
    }

    #[test]
    fn test_transfer_partial_spend_keeps_record() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let (a, b) = (addr(1), addr(2));
        store.seed_balance(&a, 41).unwrap();

        transfer(&store, &witnesses_for(a), &mut events, &a, &b, 40).unwrap();

        assert!(store.contains(&StorageKey::balance(&a)).unwrap());
        assert_eq!(balance_of(&store, &a).unwrap(), 1);
    }

    #[test]
    fn test_transfer_credit_overflow_aborts_without_partial_debit() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let (a, b) = (addr(1), addr(2));
        store.seed_balance(&a, 5).unwrap();
        store.seed_balance(&b, Amount::MAX).unwrap();

        let result = transfer(&store, &witnesses_for(a), &mut events, &a, &b, 5);
        assert!(matches!(result, Err(LedgerError::Overflow)));

        // The debit must not have been applied.
        assert_eq!(balance_of(&store, &a).unwrap(), 5);
        assert_eq!(balance_of(&store, &b).unwrap(), Amount::MAX);
        assert!(events.is_empty());
    }

    // ------------------------------------------------------------------
    // approve
    // ------------------------------------------------------------------

    #[test]
    fn test_approve_grants_and_accumulates() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let (a, c) = (addr(1), addr(3));
        store.seed_balance(&a, 100).unwrap();

        approve(&store, &witnesses_for(a), &mut events, &a, &c, 5).unwrap();
        approve(&store, &witnesses_for(a), &mut events, &a, &c, 3).unwrap();

        // Approvals are cumulative, not overwrite.
        assert_eq!(allowance(&store, &a, &c).unwrap(), 8);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_approve_capped_by_present_balance() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let (a, c) = (addr(1), addr(3));
        store.seed_balance(&a, 100).unwrap();

        let result = approve(&store, &witnesses_for(a), &mut events, &a, &c, 101);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance {
                have: 100,
                need: 101
            })
        ));
        assert_eq!(allowance(&store, &a, &c).unwrap(), 0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_approve_requires_witness() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let (a, c) = (addr(1), addr(3));
        store.seed_balance(&a, 100).unwrap();

        let result = approve(&store, &witnesses_for(c), &mut events, &a, &c, 5);
        assert!(matches!(result, Err(LedgerError::Unauthorized)));
        assert_eq!(allowance(&store, &a, &c).unwrap(), 0);
    }

    #[test]
    fn test_approve_zero_is_a_no_op_that_still_emits() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let (a, c) = (addr(1), addr(3));
        store.seed_balance(&a, 100).unwrap();
        approve(&store, &witnesses_for(a), &mut events, &a, &c, 30).unwrap();

        approve(&store, &witnesses_for(a), &mut events, &a, &c, 0).unwrap();

        assert_eq!(allowance(&store, &a, &c).unwrap(), 30);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_approve_rejects_negative() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let (a, c) = (addr(1), addr(3));
        store.seed_balance(&a, 100).unwrap();

        let result = approve(&store, &witnesses_for(a), &mut events, &a, &c, -1);
        assert!(matches!(result, Err(LedgerError::InvalidAmount(-1))));
        assert_eq!(allowance(&store, &a, &c).unwrap(), 0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_approve_accumulation_overflow_aborts() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let (a, c) = (addr(1), addr(3));
        store.seed_balance(&a, Amount::MAX).unwrap();

        approve(&store, &witnesses_for(a), &mut events, &a, &c, i128::MAX).unwrap();
        // Push the stored allowance to the brink, then overflow it.
        store
            .put(&StorageKey::allowance(&a, &c), Amount::MAX)
            .unwrap();

        let result = approve(&store, &witnesses_for(a), &mut events, &a, &c, 1);
        assert!(matches!(result, Err(LedgerError::Overflow)));
        assert_eq!(allowance(&store, &a, &c).unwrap(), Amount::MAX);
    }

    // ------------------------------------------------------------------
    // transfer_from
    // ------------------------------------------------------------------

    #[test]
    fn test_transfer_from_draws_on_destination_allowance() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let (a, b) = (addr(1), addr(2));
        store.seed_balance(&a, 100).unwrap();
        approve(&store, &witnesses_for(a), &mut events, &a, &b, 30).unwrap();
        events.clear();

        transfer_from(&store, &mut events, &a, &b, 30).unwrap();

        assert_eq!(balance_of(&store, &a).unwrap(), 70);
        assert_eq!(balance_of(&store, &b).unwrap(), 30);
        assert_eq!(allowance(&store, &a, &b).unwrap(), 0);
        assert_eq!(
            events.events(),
            &[LedgerEvent::Transfer {
                from: a,
                to: b,
                amount: 30
            }]
        );
    }

    #[test]
    fn test_transfer_from_refuses_foreign_allowance() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let (a, b, c) = (addr(1), addr(2), addr(3));
        store.seed_balance(&a, 100).unwrap();
        // The grant names c as spender; moving funds to b is keyed (a, b)
        // and finds nothing.
        approve(&store, &witnesses_for(a), &mut events, &a, &c, 30).unwrap();
        events.clear();

        let result = transfer_from(&store, &mut events, &a, &b, 30);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientAllowance { have: 0, need: 30 })
        ));
        assert_eq!(balance_of(&store, &a).unwrap(), 100);
        assert_eq!(balance_of(&store, &b).unwrap(), 0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_transfer_from_never_exceeds_allowance_despite_balance() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let (a, b) = (addr(1), addr(2));
        store.seed_balance(&a, 1_000).unwrap();
        approve(&store, &witnesses_for(a), &mut events, &a, &b, 10).unwrap();
        events.clear();

        let result = transfer_from(&store, &mut events, &a, &b, 11);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientAllowance { have: 10, need: 11 })
        ));
        assert_eq!(balance_of(&store, &a).unwrap(), 1_000);
    }

    #[test]
    fn test_transfer_from_honors_stale_allowance_up_to_remaining_balance() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let (a, b) = (addr(1), addr(2));
        store.seed_balance(&a, 100).unwrap();
        approve(&store, &witnesses_for(a), &mut events, &a, &b, 80).unwrap();

        // The owner's balance drops below the approved total afterwards.
        transfer(&store, &witnesses_for(a), &mut events, &a, &addr(9), 50).unwrap();
        events.clear();

        // The stale allowance still stands, but only 50 remains to draw.
        let short = transfer_from(&store, &mut events, &a, &b, 60);
        assert!(matches!(
            short,
            Err(LedgerError::InsufficientBalance { have: 50, need: 60 })
        ));

        transfer_from(&store, &mut events, &a, &b, 50).unwrap();
        assert_eq!(balance_of(&store, &b).unwrap(), 50);
        assert_eq!(allowance(&store, &a, &b).unwrap(), 30);
    }

    #[test]
    fn test_transfer_from_rejects_zero_amount() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let (a, b) = (addr(1), addr(2));
        store.seed_balance(&a, 100).unwrap();
        approve(&store, &witnesses_for(a), &mut events, &a, &b, 30).unwrap();
        events.clear();

        let result = transfer_from(&store, &mut events, &a, &b, 0);
        assert!(matches!(result, Err(LedgerError::ZeroAmount)));
        assert!(events.is_empty());
    }

    #[test]
    fn test_transfer_from_writes_explicit_zeros() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let (a, b) = (addr(1), addr(2));
        store.seed_balance(&a, 30).unwrap();
        approve(&store, &witnesses_for(a), &mut events, &a, &b, 30).unwrap();

        transfer_from(&store, &mut events, &a, &b, 30).unwrap();

        // Drained records remain as explicit zeros on this path.
        assert_eq!(store.get(&StorageKey::balance(&a)).unwrap(), Some(0));
        assert_eq!(
            store.get(&StorageKey::allowance(&a, &b)).unwrap(),
            Some(0)
        );
    }

    #[test]
    fn test_transfer_from_to_self_consumes_allowance_only() {
        let store = MemoryStore::new();
        let mut events = EventLog::new();
        let a = addr(1);
        store.seed_balance(&a, 100).unwrap();
        approve(&store, &witnesses_for(a), &mut events, &a, &a, 40).unwrap();
        events.clear();

        transfer_from(&store, &mut events, &a, &a, 40).unwrap();

        // Debit and credit cancel out; supply is conserved.
        assert_eq!(balance_of(&store, &a).unwrap(), 100);
        assert_eq!(allowance(&store, &a, &a).unwrap(), 0);
        assert_eq!(store.total_balance().unwrap(), 100);
        assert_eq!(events.len(), 1);
    }

    // ------------------------------------------------------------------
    // queries
    // ------------------------------------------------------------------

    #[test]
    fn test_allowance_zero_for_unknown_pair() {
        let store = MemoryStore::new();
        assert_eq!(allowance(&store, &addr(1), &addr(2)).unwrap(), 0);
    }

    #[test]
    fn test_balance_zero_for_unknown_account() {
        let store = MemoryStore::new();
        assert_eq!(balance_of(&store, &addr(7)).unwrap(), 0);
    }
}
