use std::fmt;

use crate::command::DisburseAction;

pub const MSG_ACCEPT_DEFAULT: &str = "XApay: Accepted (unhandled).";
pub const MSG_RECHARGE_SUCCESS: &str = "XApay: Recharge successful.";
pub const MSG_WITHDRAW_SUCCESS: &str = "XApay: Withdrawal (refund) successful.";
pub const MSG_DEBIT_SUCCESS: &str = "XApay: Debit (payment) successful.";
/// Reserved, nothing rejects with it yet.
pub const MSG_INVALID_MEMO: &str = "XApay: Invalid or missing memo.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum ExitCode {
    Success = 0,
    General = -1,
    InvalidTransactionType = -2,
    InvalidMemo = -3,
    InvalidCurrency = -4,
    Unauthorized = -5,
    StateReadFailed = -6,
    BalanceOverflow = -7,
    InsufficientFunds = -8,
    StateWriteFailed = -9,
    EmitFailed = -10,
    InvalidDestination = -11,
}

impl ExitCode {
    pub fn code(self) -> i64 {
        self as i64
    }
}

/// Terminal result of one invocation. Exactly one is produced per transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accept { message: String, code: ExitCode },
    Reject { message: String, code: ExitCode },
}

impl Outcome {
    pub fn accept(message: impl Into<String>) -> Self {
        Outcome::Accept {
            message: message.into(),
            code: ExitCode::Success,
        }
    }

    pub fn reject(message: impl Into<String>, code: ExitCode) -> Self {
        Outcome::Reject {
            message: message.into(),
            code,
        }
    }

    pub fn unhandled() -> Self {
        Self::accept(MSG_ACCEPT_DEFAULT)
    }

    pub fn recharged() -> Self {
        Self::accept(MSG_RECHARGE_SUCCESS)
    }

    pub fn disbursed(action: DisburseAction) -> Self {
        match action {
            DisburseAction::Withdraw => Self::accept(MSG_WITHDRAW_SUCCESS),
            DisburseAction::Debit => Self::accept(MSG_DEBIT_SUCCESS),
        }
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, Outcome::Accept { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Accept { message, .. } | Outcome::Reject { message, .. } => message,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            Outcome::Accept { code, .. } | Outcome::Reject { code, .. } => *code,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Accept { message, code } => write!(f, "accept({}): {message}", code.code()),
            Outcome::Reject { message, code } => write!(f, "reject({}): {message}", code.code()),
        }
    }
}
