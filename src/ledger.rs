use thiserror::Error;
use tracing::debug;

use crate::{
    account::{AccountId, BalanceKey, Drops},
    outcome::ExitCode,
};

/// Size of a stored balance record, a big endian `u64`.
pub const BALANCE_RECORD_LEN: usize = 8;

/// Failure reported by the host key/value store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct StoreError(pub String);

/// Durable key/value state owned by the host.
pub trait StateStore {
    /// `Ok(None)` when no record exists under `key`.
    fn state(&self, key: &BalanceKey) -> Result<Option<Vec<u8>>, StoreError>;

    fn state_set(&mut self, key: &BalanceKey, value: &[u8]) -> Result<(), StoreError>;
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("XApay: Failed to read account state.")]
    StateRead { key: BalanceKey, reason: String },
    #[error("XApay: Balance overflow.")]
    BalanceOverflow { balance: Drops, amount: Drops },
    #[error("XApay: Insufficient balance.")]
    InsufficientFunds { balance: Drops, amount: Drops },
    #[error("XApay: Failed to write account state.")]
    StateWrite { key: BalanceKey, reason: StoreError },
}

impl LedgerError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            LedgerError::StateRead { .. } => ExitCode::StateReadFailed,
            LedgerError::BalanceOverflow { .. } => ExitCode::BalanceOverflow,
            LedgerError::InsufficientFunds { .. } => ExitCode::InsufficientFunds,
            LedgerError::StateWrite { .. } => ExitCode::StateWriteFailed,
        }
    }
}

/// Per-account drops balances kept in host state under [`BalanceKey`]s.
///
/// A missing record reads as zero. Records are never deleted, a balance that
/// drops to zero is still written back.
pub struct BalanceLedger<'s, S: ?Sized> {
    store: &'s mut S,
}

impl<'s, S> BalanceLedger<'s, S>
where
    S: StateStore + ?Sized,
{
    pub fn new(store: &'s mut S) -> Self {
        Self { store }
    }

    pub fn balance_of(&self, account: &AccountId) -> Result<Drops, LedgerError> {
        self.get(&account.balance_key())
    }

    pub fn get(&self, key: &BalanceKey) -> Result<Drops, LedgerError> {
        let record = self.store.state(key).map_err(|err| LedgerError::StateRead {
            key: *key,
            reason: err.0,
        })?;
        let Some(record) = record else {
            return Ok(0);
        };
        let record: [u8; BALANCE_RECORD_LEN] =
            record
                .as_slice()
                .try_into()
                .map_err(|_| LedgerError::StateRead {
                    key: *key,
                    reason: format!("record has {} bytes", record.len()),
                })?;
        Ok(Drops::from_be_bytes(record))
    }

    /// Adds `amount` and returns the new balance.
    pub fn credit(&mut self, key: &BalanceKey, amount: Drops) -> Result<Drops, LedgerError> {
        let balance = self.get(key)?;
        let updated = balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow { balance, amount })?;
        self.write(key, updated)?;
        debug!(?key, balance, amount, updated, "credited");
        Ok(updated)
    }

    /// Subtracts `amount` and returns the new balance.
    pub fn debit(&mut self, key: &BalanceKey, amount: Drops) -> Result<Drops, LedgerError> {
        let balance = self.get(key)?;
        let updated = balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientFunds { balance, amount })?;
        self.write(key, updated)?;
        debug!(?key, balance, amount, updated, "debited");
        Ok(updated)
    }

    pub fn write(&mut self, key: &BalanceKey, value: Drops) -> Result<(), LedgerError> {
        self.store
            .state_set(key, &value.to_be_bytes())
            .map_err(|reason| LedgerError::StateWrite { key: *key, reason })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    impl StateStore for HashMap<BalanceKey, Vec<u8>> {
        fn state(&self, key: &BalanceKey) -> Result<Option<Vec<u8>>, StoreError> {
            Ok(self.get(key).cloned())
        }

        fn state_set(&mut self, key: &BalanceKey, value: &[u8]) -> Result<(), StoreError> {
            self.insert(*key, value.to_vec());
            Ok(())
        }
    }

    struct BrokenStore;

    impl StateStore for BrokenStore {
        fn state(&self, _key: &BalanceKey) -> Result<Option<Vec<u8>>, StoreError> {
            Err(StoreError("disk on fire".to_string()))
        }

        fn state_set(&mut self, _key: &BalanceKey, _value: &[u8]) -> Result<(), StoreError> {
            Err(StoreError("read only".to_string()))
        }
    }

    fn key(byte: u8) -> BalanceKey {
        AccountId::new([byte; 20]).balance_key()
    }

    #[test]
    fn missing_record_reads_zero() {
        let mut store: HashMap<BalanceKey, Vec<u8>> = HashMap::new();
        let ledger = BalanceLedger::new(&mut store);
        assert_eq!(ledger.get(&key(1)).unwrap(), 0);
        assert_eq!(ledger.balance_of(&AccountId::new([2; 20])).unwrap(), 0);
    }

    #[test]
    fn credit_and_debit() {
        let mut store: HashMap<BalanceKey, Vec<u8>> = HashMap::new();
        let mut ledger = BalanceLedger::new(&mut store);
        assert_eq!(ledger.credit(&key(1), 100).unwrap(), 100);
        assert_eq!(ledger.credit(&key(1), 20).unwrap(), 120);
        assert_eq!(ledger.debit(&key(1), 120).unwrap(), 0);
        // other accounts untouched
        assert_eq!(ledger.get(&key(2)).unwrap(), 0);

        // zero balance record stays in place
        assert_eq!(store.get(&key(1)), Some(&vec![0u8; 8]));
        assert!(!store.contains_key(&key(2)));
    }

    #[test]
    fn record_is_big_endian() {
        let mut store: HashMap<BalanceKey, Vec<u8>> = HashMap::new();
        BalanceLedger::new(&mut store).write(&key(1), 0x0102).unwrap();
        assert_eq!(store.get(&key(1)), Some(&vec![0, 0, 0, 0, 0, 0, 1, 2]));
    }

    #[test]
    fn overflow_leaves_balance() {
        let mut store: HashMap<BalanceKey, Vec<u8>> = HashMap::new();
        let mut ledger = BalanceLedger::new(&mut store);
        ledger.write(&key(1), u64::MAX - 5).unwrap();
        assert_eq!(ledger.credit(&key(1), 5).unwrap(), u64::MAX);

        let err = ledger.credit(&key(1), 1).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::BalanceOverflow {
                balance: u64::MAX,
                amount: 1
            }
        ));
        assert_eq!(err.exit_code(), ExitCode::BalanceOverflow);
        assert_eq!(ledger.get(&key(1)).unwrap(), u64::MAX);
    }

    #[test]
    fn insufficient_funds_leaves_balance() {
        let mut store: HashMap<BalanceKey, Vec<u8>> = HashMap::new();
        let mut ledger = BalanceLedger::new(&mut store);
        ledger.credit(&key(1), 60).unwrap();
        let err = ledger.debit(&key(1), 61).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds {
                balance: 60,
                amount: 61
            }
        ));
        assert_eq!(err.to_string(), "XApay: Insufficient balance.");
        assert_eq!(ledger.get(&key(1)).unwrap(), 60);

        // nothing to debit from a fresh account, but a zero debit is fine
        assert!(ledger.debit(&key(2), 1).is_err());
        assert_eq!(ledger.debit(&key(2), 0).unwrap(), 0);
    }

    #[test]
    fn malformed_record_is_read_error() {
        let mut store: HashMap<BalanceKey, Vec<u8>> = HashMap::new();
        store.insert(key(1), vec![1, 2, 3]);
        let ledger = BalanceLedger::new(&mut store);
        let err = ledger.get(&key(1)).unwrap_err();
        assert!(matches!(err, LedgerError::StateRead { .. }));
        assert_eq!(err.exit_code(), ExitCode::StateReadFailed);
    }

    #[test]
    fn store_failures() {
        let mut store = BrokenStore;
        let mut ledger = BalanceLedger::new(&mut store);
        assert!(matches!(
            ledger.credit(&key(1), 1),
            Err(LedgerError::StateRead { .. })
        ));
        let err = ledger.write(&key(1), 1).unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::StateWriteFailed);
        assert_eq!(err.to_string(), "XApay: Failed to write account state.");
    }
}
