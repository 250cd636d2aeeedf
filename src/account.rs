use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, de};
use sha2::{Digest, Sha512};
use thiserror::Error;

/// Smallest indivisible unit of the native currency.
pub type Drops = u64;

pub const ACCOUNT_ID_LEN: usize = 20;
pub const BALANCE_KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum AccountIdError {
    #[error("Account id must be {ACCOUNT_ID_LEN} bytes, got {0}")]
    InvalidLength(usize),
    #[error("Account id is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Opaque 20 byte account identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId([u8; ACCOUNT_ID_LEN]);

impl AccountId {
    pub const fn new(bytes: [u8; ACCOUNT_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, AccountIdError> {
        let bytes: [u8; ACCOUNT_ID_LEN] = bytes
            .try_into()
            .map_err(|_| AccountIdError::InvalidLength(bytes.len()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; ACCOUNT_ID_LEN] {
        &self.0
    }

    /// Ledger key under which this account's balance is stored.
    pub fn balance_key(&self) -> BalanceKey {
        BalanceKey::derive(self)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({self})")
    }
}

impl FromStr for AccountId {
    type Err = AccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim())?;
        Self::from_slice(&bytes)
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// One-way hash of an [`AccountId`], the only key balances are stored under.
///
/// Computed as the first half of SHA-512 over the raw account bytes, so stored
/// keys never expose the identity they belong to.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BalanceKey([u8; BALANCE_KEY_LEN]);

impl BalanceKey {
    pub fn derive(account: &AccountId) -> Self {
        Self(sha512_half(account.as_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8; BALANCE_KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for BalanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BalanceKey({})", hex::encode_upper(self.0))
    }
}

pub(crate) fn sha512_half(data: &[u8]) -> [u8; 32] {
    let digest = Sha512::digest(data);
    let mut half = [0u8; 32];
    half.copy_from_slice(&digest[..32]);
    half
}
