//! This module could be a separate crate on its own, to drive [`crate::processor::Hook`]
//! from a file, but for simplicity purposes it is included directly in the library.

use std::{
    collections::BTreeSet,
    io::{Read, Write},
};

use anyhow::Result;
use csv_parser::{AmountParseError, CsvTransactionParser};
use csv_printer::{Balance, print_balances};
use thiserror::Error;
use tracing::info;

use crate::{
    config::HookConfig,
    outcome::Outcome,
    processor::{
        Hook, TransactionProcessor, in_memory_processor::InMemoryTransactionProcessor,
    },
};

pub mod csv_parser;
pub mod csv_printer;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Malformed row: {0}")]
    Parse(#[from] csv::Error),
    #[error(transparent)]
    Amount(#[from] AmountParseError),
    #[error("{0}")]
    Rejected(Outcome),
}

pub struct Service<'w, R, W: 'w> {
    pub input: R,
    pub output: &'w mut W,
    pub config: HookConfig,
    pub error_printer: Box<dyn FnMut(u64, ReplayError)>,
}

impl<'w, R, W> Service<'w, R, W>
where
    R: Read,
    W: Write + 'w,
{
    /// Runs every row as its own invocation, then prints the balance of each
    /// account the input mentions.
    pub fn run(mut self) -> Result<()> {
        let parser = CsvTransactionParser::new(self.input);

        let mut processor = InMemoryTransactionProcessor::new(Hook::new(self.config));
        let mut accounts = BTreeSet::new();

        for (line, row) in parser {
            let row = match row {
                Ok(row) => row,
                Err(err) => {
                    (self.error_printer)(line, err.into());
                    continue;
                }
            };
            accounts.insert(row.account);
            accounts.extend(row.destination);

            let tx = match row.to_simulated() {
                Ok(tx) => tx,
                Err(err) => {
                    (self.error_printer)(line, err.into());
                    continue;
                }
            };
            let outcome = processor.process_transaction(&tx);
            if !outcome.is_accept() {
                (self.error_printer)(line, ReplayError::Rejected(outcome));
            }
        }

        info!(
            accounts = accounts.len(),
            emitted = processor.emitted.len(),
            "replay finished"
        );

        let balances = accounts
            .iter()
            .map(|account| {
                processor
                    .balance_of(account)
                    .map(|balance| Balance::new(account, balance))
            })
            .collect::<Result<Vec<_>, _>>()?;
        print_balances(self.output, balances.into_iter())
    }
}
