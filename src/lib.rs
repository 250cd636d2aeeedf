/// Account identities and the one-way keys balances are stored under.
pub mod account;

/// Memo classification and the per-operation authorization rules that turn
/// a triggering transaction into a [`command::LedgerCommand`].
pub mod command;

/// Operator identity and other deployment settings.
pub mod config;

/// Drops balances over the host's key/value state.
pub mod ledger;

/// Terminal accept/reject results and their stable codes.
pub mod outcome;

/// Hook entry point, host interfaces, plus "in memory" host implementation.
/// Coordinates classification, authorization, ledger updates and settlement
pub mod processor;

/// Outgoing payment emitted for withdraw and debit.
pub mod settlement;

/// Replays transaction files against the in memory host. Used by the binary
/// and by integration tests.
pub mod bin_utils;
