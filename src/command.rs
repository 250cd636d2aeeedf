use std::{fmt, str::FromStr};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    account::{ACCOUNT_ID_LEN, AccountId, Drops},
    config::HookConfig,
    outcome::ExitCode,
    processor::TransactionSource,
};

/// Memo payloads longer than this are ignored.
pub const MEMO_CAPACITY: usize = 32;
pub const AMOUNT_FIELD_LEN: usize = 9;
/// Set on the first amount byte for anything that is not the native currency.
const NON_NATIVE_FLAG: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum TransactionType {
    Payment,
    Invoke,
    Other(u16),
}

impl TransactionType {
    pub const PAYMENT_CODE: u16 = 0;
    pub const INVOKE_CODE: u16 = 99;

    pub fn code(self) -> u16 {
        match self {
            TransactionType::Payment => Self::PAYMENT_CODE,
            TransactionType::Invoke => Self::INVOKE_CODE,
            TransactionType::Other(code) => code,
        }
    }
}

impl From<u16> for TransactionType {
    fn from(code: u16) -> Self {
        match code {
            Self::PAYMENT_CODE => TransactionType::Payment,
            Self::INVOKE_CODE => TransactionType::Invoke,
            other => TransactionType::Other(other),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown transaction type `{0}`")]
pub struct UnknownTransactionType(String);

impl FromStr for TransactionType {
    type Err = UnknownTransactionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "payment" => Ok(TransactionType::Payment),
            "invoke" => Ok(TransactionType::Invoke),
            other => other
                .parse::<u16>()
                .map(TransactionType::from)
                .map_err(|_| UnknownTransactionType(s.to_owned())),
        }
    }
}

impl TryFrom<String> for TransactionType {
    type Error = UnknownTransactionType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// First memo entry of the triggering transaction, held in a fixed buffer.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Memo {
    buf: [u8; MEMO_CAPACITY],
    len: usize,
}

impl Memo {
    pub fn empty() -> Self {
        Self {
            buf: [0; MEMO_CAPACITY],
            len: 0,
        }
    }

    /// Missing or oversized data degrades to an empty memo, never an error.
    pub fn from_data(data: Option<&[u8]>) -> Self {
        let mut memo = Self::empty();
        if let Some(data) = data.filter(|data| data.len() <= MEMO_CAPACITY) {
            memo.buf[..data.len()].copy_from_slice(data);
            memo.len = data.len();
        }
        memo
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for Memo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Memo({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Recharge,
    Withdraw,
    Debit,
    Unknown,
}

/// Recognised memo keywords, in match priority order.
const KEYWORDS: [(&[u8], Operation); 3] = [
    (b"recharge", Operation::Recharge),
    (b"withdraw", Operation::Withdraw),
    (b"debit", Operation::Debit),
];

impl Operation {
    /// Exact, case sensitive match against the keyword table. First match wins.
    pub fn classify(memo: &Memo) -> Self {
        KEYWORDS
            .iter()
            .find(|(keyword, _)| *keyword == memo.as_bytes())
            .map(|(_, operation)| *operation)
            .unwrap_or(Operation::Unknown)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisburseAction {
    /// Refund to the account that is debited.
    Withdraw,
    /// Payment to the operator out of the debited account.
    Debit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RechargeCommand {
    pub account: AccountId,
    pub amount: Drops,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisburseCommand {
    pub action: DisburseAction,
    pub operator: AccountId,
    pub account: AccountId,
    pub amount: Drops,
}

impl DisburseCommand {
    pub fn recipient(&self) -> AccountId {
        match self.action {
            DisburseAction::Withdraw => self.account,
            DisburseAction::Debit => self.operator,
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("XApay: Could not get originator.")]
    MissingOriginator,
    #[error("XApay: Invalid transaction type for this operation.")]
    InvalidTransactionType {
        operation: Operation,
        tx_type: TransactionType,
    },
    #[error("XApay: Invalid currency; only XAH is supported.")]
    InvalidCurrency,
    #[error("XApay: Unauthorized sender for this operation.")]
    Unauthorized { originator: AccountId },
    #[error("XApay: Operation requires a valid Destination account.")]
    InvalidDestination,
}

impl CommandError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CommandError::MissingOriginator => ExitCode::General,
            CommandError::InvalidTransactionType { .. } => ExitCode::InvalidTransactionType,
            CommandError::InvalidCurrency => ExitCode::InvalidCurrency,
            CommandError::Unauthorized { .. } => ExitCode::Unauthorized,
            CommandError::InvalidDestination => ExitCode::InvalidDestination,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCommand {
    Recharge(RechargeCommand),
    Disburse(DisburseCommand),
}

impl LedgerCommand {
    /// Applies the per-operation caller and shape rules.
    ///
    /// Returns `None` for [`Operation::Unknown`], which is not an error.
    pub fn parse_command<T>(
        tx: &T,
        originator: AccountId,
        operation: Operation,
        config: &HookConfig,
    ) -> Result<Option<Self>, CommandError>
    where
        T: TransactionSource + ?Sized,
    {
        match operation {
            Operation::Recharge => Ok(Some(Self::Recharge(Self::parse_recharge(
                tx, originator,
            )?))),
            Operation::Withdraw => Ok(Some(Self::Disburse(Self::parse_disburse(
                tx,
                originator,
                config,
                DisburseAction::Withdraw,
            )?))),
            Operation::Debit => Ok(Some(Self::Disburse(Self::parse_disburse(
                tx,
                originator,
                config,
                DisburseAction::Debit,
            )?))),
            Operation::Unknown => Ok(None),
        }
    }

    fn parse_recharge<T>(tx: &T, originator: AccountId) -> Result<RechargeCommand, CommandError>
    where
        T: TransactionSource + ?Sized,
    {
        let tx_type = tx.transaction_type();
        if tx_type != TransactionType::Payment {
            return Err(CommandError::InvalidTransactionType {
                operation: Operation::Recharge,
                tx_type,
            });
        }
        // self funding only: the payer is always the credited account
        Ok(RechargeCommand {
            account: originator,
            amount: decode_native_amount(tx.amount_field())?,
        })
    }

    fn parse_disburse<T>(
        tx: &T,
        originator: AccountId,
        config: &HookConfig,
        action: DisburseAction,
    ) -> Result<DisburseCommand, CommandError>
    where
        T: TransactionSource + ?Sized,
    {
        let tx_type = tx.transaction_type();
        if tx_type != TransactionType::Invoke {
            return Err(CommandError::InvalidTransactionType {
                operation: match action {
                    DisburseAction::Withdraw => Operation::Withdraw,
                    DisburseAction::Debit => Operation::Debit,
                },
                tx_type,
            });
        }
        if !config.is_operator(&originator) {
            return Err(CommandError::Unauthorized { originator });
        }
        let account = tx
            .destination_field()
            .filter(|dest| dest.len() == ACCOUNT_ID_LEN)
            .and_then(|dest| AccountId::from_slice(dest).ok())
            .ok_or(CommandError::InvalidDestination)?;
        Ok(DisburseCommand {
            action,
            operator: originator,
            account,
            amount: decode_native_amount(tx.amount_field())?,
        })
    }
}

/// Decodes a 9 byte amount field, accepting only the native currency.
pub fn decode_native_amount(field: Option<&[u8]>) -> Result<Drops, CommandError> {
    let field: &[u8; AMOUNT_FIELD_LEN] = field
        .and_then(|field| field.try_into().ok())
        .ok_or(CommandError::InvalidCurrency)?;
    if field[0] & NON_NATIVE_FLAG != 0 {
        return Err(CommandError::InvalidCurrency);
    }
    let mut value = [0u8; 8];
    value.copy_from_slice(&field[1..]);
    Ok(Drops::from_be_bytes(value))
}

/// Inverse of [`decode_native_amount`].
pub fn encode_native_amount(amount: Drops) -> [u8; AMOUNT_FIELD_LEN] {
    let mut field = [0u8; AMOUNT_FIELD_LEN];
    field[1..].copy_from_slice(&amount.to_be_bytes());
    field
}

#[cfg(test)]
mod tests {
    use crate::processor::in_memory_processor::SimulatedTransaction;

    use super::*;

    const OPERATOR: AccountId = AccountId::new([0xAA; 20]);
    const USER: AccountId = AccountId::new([0x11; 20]);

    fn classify(data: &[u8]) -> Operation {
        Operation::classify(&Memo::from_data(Some(data)))
    }

    #[test]
    fn classify_memo_keywords() {
        assert_eq!(classify(b"recharge"), Operation::Recharge);
        assert_eq!(classify(b"withdraw"), Operation::Withdraw);
        assert_eq!(classify(b"debit"), Operation::Debit);

        // exact match only
        assert_eq!(classify(b"Recharge"), Operation::Unknown);
        assert_eq!(classify(b"recharg"), Operation::Unknown);
        assert_eq!(classify(b"recharge "), Operation::Unknown);
        assert_eq!(classify(b"debitdebit"), Operation::Unknown);
        assert_eq!(classify(b""), Operation::Unknown);
        assert_eq!(
            Operation::classify(&Memo::from_data(None)),
            Operation::Unknown
        );
    }

    #[test]
    fn oversized_memo_is_empty() {
        let long = [b'a'; MEMO_CAPACITY + 1];
        assert!(Memo::from_data(Some(&long)).is_empty());

        let exact = [b'a'; MEMO_CAPACITY];
        assert_eq!(Memo::from_data(Some(&exact)).as_bytes(), &exact);
    }

    #[test]
    fn transaction_type_codes() {
        assert_eq!(TransactionType::from(0), TransactionType::Payment);
        assert_eq!(TransactionType::from(99), TransactionType::Invoke);
        assert_eq!(TransactionType::from(3), TransactionType::Other(3));
        assert_eq!(TransactionType::Other(3).code(), 3);
        assert_eq!("Invoke".parse::<TransactionType>().unwrap(), TransactionType::Invoke);
        assert_eq!("20".parse::<TransactionType>().unwrap(), TransactionType::Other(20));
        assert!("trustset".parse::<TransactionType>().is_err());
    }

    #[test]
    fn decode_amounts() {
        assert_eq!(decode_native_amount(Some(&encode_native_amount(100))).unwrap(), 100);
        assert_eq!(
            decode_native_amount(Some(&encode_native_amount(u64::MAX))).unwrap(),
            u64::MAX
        );

        let mut issued = encode_native_amount(100);
        issued[0] |= 0x80;
        assert!(matches!(
            decode_native_amount(Some(&issued)),
            Err(CommandError::InvalidCurrency)
        ));
        assert!(matches!(
            decode_native_amount(Some(&[0u8; 8])),
            Err(CommandError::InvalidCurrency)
        ));
        assert!(matches!(
            decode_native_amount(None),
            Err(CommandError::InvalidCurrency)
        ));
    }

    #[test]
    fn recharge_credits_originator() {
        let config = HookConfig::new(OPERATOR);
        // destination is never consulted for recharge
        let tx = SimulatedTransaction::payment(USER, 50).with_destination(OPERATOR);
        let cmd = LedgerCommand::parse_command(&tx, USER, Operation::Recharge, &config)
            .unwrap()
            .unwrap();
        assert_eq!(
            cmd,
            LedgerCommand::Recharge(RechargeCommand {
                account: USER,
                amount: 50
            })
        );

        let tx = SimulatedTransaction::invoke(USER, 50);
        let err = LedgerCommand::parse_command(&tx, USER, Operation::Recharge, &config)
            .unwrap_err();
        assert!(matches!(
            err,
            CommandError::InvalidTransactionType {
                operation: Operation::Recharge,
                tx_type: TransactionType::Invoke
            }
        ));
        assert_eq!(err.exit_code(), ExitCode::InvalidTransactionType);
    }

    #[test]
    fn disburse_rules() {
        let config = HookConfig::new(OPERATOR);

        let tx = SimulatedTransaction::invoke(OPERATOR, 40).with_destination(USER);
        let cmd = LedgerCommand::parse_command(&tx, OPERATOR, Operation::Debit, &config)
            .unwrap()
            .unwrap();
        let LedgerCommand::Disburse(cmd) = cmd else {
            panic!("expected disburse command");
        };
        assert_eq!(cmd.account, USER);
        assert_eq!(cmd.recipient(), OPERATOR);
        assert_eq!(
            DisburseCommand {
                action: DisburseAction::Withdraw,
                ..cmd
            }
            .recipient(),
            USER
        );

        // wrong transaction shape
        let tx = SimulatedTransaction::payment(OPERATOR, 40).with_destination(USER);
        let err = LedgerCommand::parse_command(&tx, OPERATOR, Operation::Withdraw, &config)
            .unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::InvalidTransactionType);

        // non operator
        let tx = SimulatedTransaction::invoke(USER, 40).with_destination(USER);
        let err =
            LedgerCommand::parse_command(&tx, USER, Operation::Debit, &config).unwrap_err();
        assert!(matches!(err, CommandError::Unauthorized { originator } if originator == USER));
        assert_eq!(err.to_string(), "XApay: Unauthorized sender for this operation.");

        // missing or malformed destination
        let tx = SimulatedTransaction::invoke(OPERATOR, 40);
        let err = LedgerCommand::parse_command(&tx, OPERATOR, Operation::Withdraw, &config)
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidDestination));
        let tx = SimulatedTransaction::invoke(OPERATOR, 40).with_raw_destination(vec![0x11; 19]);
        let err = LedgerCommand::parse_command(&tx, OPERATOR, Operation::Withdraw, &config)
            .unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::InvalidDestination);

        // destination is checked before the amount
        let tx = SimulatedTransaction::invoke(OPERATOR, 40).with_issued_amount();
        let err = LedgerCommand::parse_command(&tx, OPERATOR, Operation::Withdraw, &config)
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidDestination));
    }

    #[test]
    fn unknown_operation_yields_no_command() {
        let config = HookConfig::new(OPERATOR);
        let tx = SimulatedTransaction::invoke(USER, 0);
        assert!(
            LedgerCommand::parse_command(&tx, USER, Operation::Unknown, &config)
                .unwrap()
                .is_none()
        );
    }
}
