use std::env;

use serde::Deserialize;
use thiserror::Error;

use crate::account::{AccountId, AccountIdError};

pub const OPERATOR_ENV: &str = "XAPAY_OPERATOR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Operator is not configured, set {OPERATOR_ENV}")]
    MissingOperator,
    #[error("Invalid operator account: {0}")]
    InvalidOperator(#[from] AccountIdError),
}

/// Deployment time settings injected into [`crate::processor::Hook`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HookConfig {
    /// The only identity allowed to withdraw or debit user balances.
    pub operator: AccountId,
}

impl HookConfig {
    pub fn new(operator: AccountId) -> Self {
        Self { operator }
    }

    /// Reads the operator from [`OPERATOR_ENV`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let operator = env::var(OPERATOR_ENV).map_err(|_| ConfigError::MissingOperator)?;
        Ok(Self::new(operator.parse()?))
    }

    pub fn is_operator(&self, account: &AccountId) -> bool {
        self.operator == *account
    }
}
