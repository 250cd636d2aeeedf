use std::io::Read;

use csv::{DeserializeRecordsIntoIter, Trim};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    account::{AccountId, Drops},
    command::TransactionType,
    processor::in_memory_processor::SimulatedTransaction,
};

#[derive(Debug, Deserialize)]
pub struct Transaction {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub account: AccountId,
    pub destination: Option<AccountId>,
    pub amount: Option<String>,
    pub memo: Option<String>,
}

#[derive(Debug, Error)]
pub enum AmountParseError {
    #[error("Invalid amount `{0}`")]
    Invalid(String),
}

impl Transaction {
    /// Plain integers are native drops, `<value>/<currency>` is an issued amount.
    pub fn to_simulated(&self) -> Result<SimulatedTransaction, AmountParseError> {
        let mut tx = SimulatedTransaction::new(self.kind, self.account);
        if let Some(destination) = self.destination {
            tx = tx.with_destination(destination);
        }
        if let Some(memo) = &self.memo {
            tx = tx.with_memo(memo);
        }
        match self.amount.as_deref().map(str::trim) {
            None | Some("") => Ok(tx),
            Some(amount) if amount.contains('/') => Ok(tx.with_issued_amount()),
            Some(amount) => amount
                .parse::<Drops>()
                .map(|drops| tx.with_amount(drops))
                .map_err(|_| AmountParseError::Invalid(amount.to_owned())),
        }
    }
}

/// Parses transaction list in CSV format, yielding each row with its line
pub struct CsvTransactionParser<R> {
    iter: DeserializeRecordsIntoIter<R, Transaction>,
}

impl<R> CsvTransactionParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            iter: reader.into_deserialize(),
        }
    }
}

impl<R> Iterator for CsvTransactionParser<R>
where
    R: Read,
{
    type Item = (u64, Result<Transaction, csv::Error>);

    fn next(&mut self) -> Option<Self::Item> {
        let curr_line = self.iter.reader().position().line();
        self.iter.next().map(|row| (curr_line, row))
    }
}
