use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    account::AccountId,
    command::{CommandError, LedgerCommand, Memo, Operation, TransactionType},
    config::HookConfig,
    ledger::{BalanceLedger, LedgerError, StateStore},
    outcome::{ExitCode, Outcome},
    settlement::{Emitter, SettlementEmitter, SettlementError},
};

pub mod in_memory_processor;

#[derive(Debug, Error)]
pub enum HookError {
    #[error(transparent)]
    CommandErr(#[from] CommandError),
    #[error(transparent)]
    LedgerErr(#[from] LedgerError),
    #[error(transparent)]
    SettlementErr(#[from] SettlementError),
}

impl HookError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            HookError::CommandErr(err) => err.exit_code(),
            HookError::LedgerErr(err) => err.exit_code(),
            HookError::SettlementErr(err) => err.exit_code(),
        }
    }
}

/// Field accessors over the triggering transaction.
///
/// Fields are handed over raw; lengths and encodings are validated by the hook.
pub trait TransactionSource {
    fn transaction_type(&self) -> TransactionType;

    fn originator(&self) -> Option<&[u8]>;

    /// Data of the first memo entry, `None` if any part of the memo is missing.
    fn first_memo_data(&self) -> Option<&[u8]>;

    fn amount_field(&self) -> Option<&[u8]>;

    fn destination_field(&self) -> Option<&[u8]>;
}

/// Everything the hook may touch on the host during one invocation.
pub trait HookHost: StateStore + Emitter {}

impl<T> HookHost for T where T: StateStore + Emitter + ?Sized {}

/// Runs triggering transactions to a single terminal [`Outcome`].
///
/// NOTE: a reject is expected to discard every state write and emission the
/// same invocation made. Hosts must provide this, the hook does not undo a
/// debit when settlement fails.
pub trait TransactionProcessor {
    fn process_transaction<T>(&mut self, tx: &T) -> Outcome
    where
        T: TransactionSource + ?Sized;
}

#[derive(Debug, Clone)]
pub struct Hook {
    config: HookConfig,
}

impl Hook {
    pub fn new(config: HookConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HookConfig {
        &self.config
    }

    pub fn process<T, H>(&self, tx: &T, host: &mut H) -> Outcome
    where
        T: TransactionSource + ?Sized,
        H: HookHost + ?Sized,
    {
        match self.try_process(tx, host) {
            Ok(outcome) => outcome,
            Err(err) => {
                let code = err.exit_code();
                warn!(code = code.code(), reason = ?err, "{err}");
                Outcome::reject(err.to_string(), code)
            }
        }
    }

    fn try_process<T, H>(&self, tx: &T, host: &mut H) -> Result<Outcome, HookError>
    where
        T: TransactionSource + ?Sized,
        H: HookHost + ?Sized,
    {
        let originator = tx
            .originator()
            .and_then(|originator| AccountId::from_slice(originator).ok())
            .ok_or(CommandError::MissingOriginator)?;
        let memo = Memo::from_data(tx.first_memo_data());
        let operation = Operation::classify(&memo);
        debug!(%originator, ?memo, ?operation, "classified transaction");

        let Some(command) = LedgerCommand::parse_command(tx, originator, operation, &self.config)?
        else {
            return Ok(Outcome::unhandled());
        };

        match command {
            LedgerCommand::Recharge(command) => {
                let balance = BalanceLedger::new(&mut *host)
                    .credit(&command.account.balance_key(), command.amount)?;
                info!(
                    account = %command.account,
                    amount = command.amount,
                    balance,
                    "recharged"
                );
                Ok(Outcome::recharged())
            }
            LedgerCommand::Disburse(command) => {
                let balance = BalanceLedger::new(&mut *host)
                    .debit(&command.account.balance_key(), command.amount)?;
                info!(
                    action = ?command.action,
                    account = %command.account,
                    amount = command.amount,
                    balance,
                    "debited"
                );
                SettlementEmitter::new(&mut *host).settle(&command)?;
                Ok(Outcome::disbursed(command.action))
            }
        }
    }
}
