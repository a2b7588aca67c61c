// Umbra Payments - Core Library
// Wallet ledger + gacha draw engine, exposed for the CLI demo, the API
// server, and tests

pub mod error;
pub mod gacha;
pub mod ledger;
pub mod money;

// Re-export commonly used types
pub use error::PaymentError;
pub use gacha::{
    DrawOutcome, DrawnItem, GachaEngine, Pool, PoolItem, Rarity, MAX_DRAWS, MIN_DRAWS,
};
pub use ledger::{Ledger, Transaction, TransactionKind, Wallet, CURRENCY};
pub use money::Money;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
