use std::collections::HashMap;

use tracing::debug;

use crate::{
    account::{AccountId, BalanceKey, Drops, sha512_half},
    command::{AMOUNT_FIELD_LEN, TransactionType, encode_native_amount},
    ledger::{BalanceLedger, LedgerError, StateStore, StoreError},
    outcome::Outcome,
    settlement::{EmitHash, Emitter, EmitterError, OutgoingPayment},
};

use super::{Hook, TransactionProcessor, TransactionSource};

/// Triggering transaction assembled in memory.
#[derive(Debug, Clone)]
pub struct SimulatedTransaction {
    pub tx_type: TransactionType,
    pub originator: Option<Vec<u8>>,
    pub destination: Option<Vec<u8>>,
    pub amount: Option<Vec<u8>>,
    pub memo: Option<Vec<u8>>,
}

impl SimulatedTransaction {
    pub fn new(tx_type: TransactionType, originator: AccountId) -> Self {
        Self {
            tx_type,
            originator: Some(originator.as_bytes().to_vec()),
            destination: None,
            amount: None,
            memo: None,
        }
    }

    pub fn payment(originator: AccountId, amount: Drops) -> Self {
        Self::new(TransactionType::Payment, originator).with_amount(amount)
    }

    pub fn invoke(originator: AccountId, amount: Drops) -> Self {
        Self::new(TransactionType::Invoke, originator).with_amount(amount)
    }

    pub fn with_amount(mut self, amount: Drops) -> Self {
        self.amount = Some(encode_native_amount(amount).to_vec());
        self
    }

    /// Amount tagged as a non-native currency.
    pub fn with_issued_amount(mut self) -> Self {
        let mut field = [0u8; AMOUNT_FIELD_LEN];
        field[0] = 0xD4;
        self.amount = Some(field.to_vec());
        self
    }

    pub fn without_amount(mut self) -> Self {
        self.amount = None;
        self
    }

    pub fn with_destination(mut self, destination: AccountId) -> Self {
        self.destination = Some(destination.as_bytes().to_vec());
        self
    }

    pub fn with_raw_destination(mut self, destination: Vec<u8>) -> Self {
        self.destination = Some(destination);
        self
    }

    pub fn with_memo(mut self, memo: impl AsRef<[u8]>) -> Self {
        self.memo = Some(memo.as_ref().to_vec());
        self
    }

    pub fn without_originator(mut self) -> Self {
        self.originator = None;
        self
    }
}

impl TransactionSource for SimulatedTransaction {
    fn transaction_type(&self) -> TransactionType {
        self.tx_type
    }

    fn originator(&self) -> Option<&[u8]> {
        self.originator.as_deref()
    }

    fn first_memo_data(&self) -> Option<&[u8]> {
        self.memo.as_deref()
    }

    fn amount_field(&self) -> Option<&[u8]> {
        self.amount.as_deref()
    }

    fn destination_field(&self) -> Option<&[u8]> {
        self.destination.as_deref()
    }
}

/// Host failures to inject into every following invocation.
#[derive(Debug, Clone, Default)]
pub struct HostFaults {
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub refuse_reserve: bool,
    pub fail_emit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedTransaction {
    pub hash: EmitHash,
    pub payment: OutgoingPayment,
}

/// Committed key/value state.
#[derive(Debug, Default)]
pub struct MemoryState(HashMap<BalanceKey, Vec<u8>>);

impl MemoryState {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl StateStore for MemoryState {
    fn state(&self, key: &BalanceKey) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.0.get(key).cloned())
    }

    fn state_set(&mut self, key: &BalanceKey, value: &[u8]) -> Result<(), StoreError> {
        self.0.insert(*key, value.to_vec());
        Ok(())
    }
}

/// One invocation's view of the host. Writes and emissions are staged and
/// only committed by [`InMemoryTransactionProcessor`] on accept.
struct Invocation<'a> {
    committed: &'a MemoryState,
    faults: &'a HostFaults,
    pending: HashMap<BalanceKey, Vec<u8>>,
    emitted: Vec<EmittedTransaction>,
    reserved: u32,
    first_index: usize,
}

impl StateStore for Invocation<'_> {
    fn state(&self, key: &BalanceKey) -> Result<Option<Vec<u8>>, StoreError> {
        if self.faults.fail_reads {
            return Err(StoreError("state read failed".to_string()));
        }
        match self.pending.get(key) {
            Some(value) => Ok(Some(value.clone())),
            None => self.committed.state(key),
        }
    }

    fn state_set(&mut self, key: &BalanceKey, value: &[u8]) -> Result<(), StoreError> {
        if self.faults.fail_writes {
            return Err(StoreError("state write failed".to_string()));
        }
        self.pending.insert(*key, value.to_vec());
        Ok(())
    }
}

impl Emitter for Invocation<'_> {
    fn reserve(&mut self, count: u32) -> Result<(), EmitterError> {
        if self.faults.refuse_reserve {
            return Err(EmitterError("no emission slots available".to_string()));
        }
        self.reserved += count;
        Ok(())
    }

    fn emit(&mut self, payment: &OutgoingPayment) -> Result<EmitHash, EmitterError> {
        if self.faults.fail_emit {
            return Err(EmitterError("emission failed".to_string()));
        }
        if self.emitted.len() as u32 >= self.reserved {
            return Err(EmitterError("emission exceeds reserved slots".to_string()));
        }
        let index = (self.first_index + self.emitted.len()) as u64;
        let mut preimage = payment.to_bytes();
        preimage.extend_from_slice(&index.to_be_bytes());
        let hash = sha512_half(&preimage);
        self.emitted.push(EmittedTransaction {
            hash,
            payment: payment.clone(),
        });
        Ok(hash)
    }
}

/// Serializes invocations over shared in-memory state, committing each one
/// only if it is accepted.
pub struct InMemoryTransactionProcessor {
    hook: Hook,
    state: MemoryState,
    pub emitted: Vec<EmittedTransaction>,
    pub faults: HostFaults,
}

impl InMemoryTransactionProcessor {
    pub fn new(hook: Hook) -> Self {
        Self {
            hook,
            state: MemoryState::default(),
            emitted: Vec::new(),
            faults: HostFaults::default(),
        }
    }

    pub fn balance_of(&mut self, account: &AccountId) -> Result<Drops, LedgerError> {
        BalanceLedger::new(&mut self.state).balance_of(account)
    }

    pub fn state(&self) -> &MemoryState {
        &self.state
    }

    /// Writes a raw record, bypassing the hook.
    pub fn seed_state(&mut self, key: BalanceKey, value: Vec<u8>) {
        self.state.0.insert(key, value);
    }
}

impl TransactionProcessor for InMemoryTransactionProcessor {
    fn process_transaction<T>(&mut self, tx: &T) -> Outcome
    where
        T: TransactionSource + ?Sized,
    {
        let mut invocation = Invocation {
            committed: &self.state,
            faults: &self.faults,
            pending: HashMap::new(),
            emitted: Vec::new(),
            reserved: 0,
            first_index: self.emitted.len(),
        };
        let outcome = self.hook.process(tx, &mut invocation);
        let Invocation {
            pending, emitted, ..
        } = invocation;
        if outcome.is_accept() {
            // commit only when the hook accepted
            self.state.0.extend(pending);
            self.emitted.extend(emitted);
        } else {
            debug!(
                writes = pending.len(),
                emissions = emitted.len(),
                "rolled back rejected invocation"
            );
        }
        outcome
    }
}
