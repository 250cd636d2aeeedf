use std::io::Write;

use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::account::{AccountId, Drops};

/// Drops per whole native currency unit.
const DROPS_SCALE: u32 = 6;

#[derive(Debug, Serialize)]
pub struct Balance {
    pub account: String,
    pub balance: Drops,
    pub xah: Decimal,
}

impl Balance {
    pub fn new(account: &AccountId, balance: Drops) -> Self {
        Self {
            account: account.to_string(),
            balance,
            xah: Decimal::from_i128_with_scale(i128::from(balance), DROPS_SCALE).normalize(),
        }
    }
}

pub fn print_balances<W>(
    output: &mut W,
    balances: impl Iterator<Item = Balance>,
) -> anyhow::Result<()>
where
    W: Write,
{
    let mut writer = Writer::from_writer(output);
    for balance in balances {
        if let Err(err) = writer.serialize(balance) {
            anyhow::bail!("Failed to write to CSV: {err}")
        }
    }
    // Ensure all data is flushed to the output
    if let Err(err) = writer.flush() {
        anyhow::bail!("Failed to flush CSV writer: {err}")
    }
    Ok(())
}
