// ⚠️ Error taxonomy - Every failure the core can return
// Business failures are values, not panics; the boundary maps each kind
// to its own HTTP status

use thiserror::Error;

use crate::money::Money;

/// Failures surfaced by the ledger and the gacha engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PaymentError {
    /// Input could not be converted to a non-negative two-decimal amount,
    /// or a debit was requested with a zero amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A debit exceeded the wallet balance. Expected business outcome, not
    /// a system fault; the wallet and its history are untouched.
    #[error("insufficient funds: {required} required but only {available} available")]
    InsufficientFunds { required: Money, available: Money },

    /// Referenced gacha pool is not configured.
    #[error("unknown gacha pool '{0}'")]
    PoolNotFound(String),

    /// Draw count outside the accepted window, or not an integer at the
    /// boundary. Checked before any ledger call.
    #[error("draw count must be an integer between 1 and 50, got {0}")]
    InvalidDrawCount(String),
}
