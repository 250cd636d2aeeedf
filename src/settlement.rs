use thiserror::Error;
use tracing::info;

use crate::{
    account::{AccountId, Drops},
    command::{DisburseCommand, TransactionType, encode_native_amount},
    outcome::ExitCode,
};

pub type EmitHash = [u8; 32];

/// Native currency payment emitted by the hook. No memo, no destination tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingPayment {
    pub amount: Drops,
    pub recipient: AccountId,
}

impl OutgoingPayment {
    pub fn native(amount: Drops, recipient: AccountId) -> Self {
        Self { amount, recipient }
    }

    /// Type code, amount field and recipient, in that order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(2 + 9 + 20);
        bytes.extend_from_slice(&TransactionType::Payment.code().to_be_bytes());
        bytes.extend_from_slice(&encode_native_amount(self.amount));
        bytes.extend_from_slice(self.recipient.as_bytes());
        bytes
    }
}

/// Failure reported by the host when reserving or emitting.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EmitterError(pub String);

/// Outgoing transaction facility of the host.
pub trait Emitter {
    fn reserve(&mut self, count: u32) -> Result<(), EmitterError>;

    fn emit(&mut self, payment: &OutgoingPayment) -> Result<EmitHash, EmitterError>;
}

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("XApay: Failed to emit transaction.")]
    Emit {
        payment: OutgoingPayment,
        reason: EmitterError,
    },
}

impl SettlementError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            SettlementError::Emit { .. } => ExitCode::EmitFailed,
        }
    }
}

pub struct SettlementEmitter<'e, E: ?Sized> {
    emitter: &'e mut E,
}

impl<'e, E> SettlementEmitter<'e, E>
where
    E: Emitter + ?Sized,
{
    pub fn new(emitter: &'e mut E) -> Self {
        Self { emitter }
    }

    /// Pays out an already debited disbursement. Exactly one payment is
    /// emitted; the debit is not undone here if this fails.
    pub fn settle(&mut self, command: &DisburseCommand) -> Result<EmitHash, SettlementError> {
        let payment = OutgoingPayment::native(command.amount, command.recipient());
        let emitted = self
            .emitter
            .reserve(1)
            .and_then(|_| self.emitter.emit(&payment));
        match emitted {
            Ok(hash) => {
                info!(
                    action = ?command.action,
                    recipient = %payment.recipient,
                    amount = payment.amount,
                    hash = %hex::encode_upper(hash),
                    "payment emitted"
                );
                Ok(hash)
            }
            Err(reason) => Err(SettlementError::Emit { payment, reason }),
        }
    }
}
