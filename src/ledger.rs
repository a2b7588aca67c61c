// 📒 Ledger - Wallets and append-only transaction history
// Every balance change is traceable to exactly one immutable record

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PaymentError;
use crate::money::Money;

/// Currency code carried by every wallet (Umbra Coins).
pub const CURRENCY: &str = "UMBC";

// ============================================================================
// TRANSACTION KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Balance increase (credit).
    Topup,

    /// Balance decrease (debit).
    Spend,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Topup => "topup",
            TransactionKind::Spend => "spend",
        }
    }
}

// ============================================================================
// WALLET
// ============================================================================

/// Per-user currency balance. Created lazily with a zero balance on first
/// access, never deleted, and only ever mutated through [`Ledger`] credit
/// and debit operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: String,
    pub balance: Money,
    pub currency: String,
}

impl Wallet {
    fn new(user_id: &str) -> Self {
        Wallet {
            user_id: user_id.to_string(),
            balance: Money::ZERO,
            currency: CURRENCY.to_string(),
        }
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

/// Immutable audit record of one balance change.
///
/// `amount` is always the positive magnitude of the change; `balance_after`
/// is the wallet balance immediately after applying it. Replaying a user's
/// records from zero (add on topup, subtract on spend) reproduces every
/// `balance_after` and the final wallet balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Stable identity (UUID v4) - never changes.
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Money,
    pub balance_after: Money,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    fn new(
        user_id: &str,
        kind: TransactionKind,
        amount: Money,
        balance_after: Money,
        metadata: Map<String, Value>,
    ) -> Self {
        Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind,
            amount,
            balance_after,
            metadata,
            created_at: Utc::now(),
        }
    }
}

/// Metadata is always a map, defaulting to empty. The system tag
/// (`source` / `reason`) is inserted first, so caller-supplied keys
/// overwrite it on collision (last-write-wins).
fn merge_metadata(
    tag_key: &str,
    tag: Option<&str>,
    extra: Option<Map<String, Value>>,
) -> Map<String, Value> {
    let mut metadata = Map::new();
    if let Some(tag) = tag {
        metadata.insert(tag_key.to_string(), Value::String(tag.to_string()));
    }
    if let Some(extra) = extra {
        for (key, value) in extra {
            metadata.insert(key, value);
        }
    }
    metadata
}

// ============================================================================
// LEDGER
// ============================================================================

/// A wallet plus its history, guarded by one mutex so the balance check,
/// the balance mutation, and the history append are indivisible.
#[derive(Debug)]
struct UserAccount {
    wallet: Wallet,
    transactions: Vec<Transaction>,
}

impl UserAccount {
    fn new(user_id: &str) -> Self {
        UserAccount {
            wallet: Wallet::new(user_id),
            transactions: Vec::new(),
        }
    }
}

/// In-memory store of all wallets and transaction history.
///
/// Locking discipline: the outer map lock is only held long enough to
/// resolve a user's account handle; the per-user mutex is then held for the
/// whole check-then-act sequence of a credit or debit. Operations on
/// different users proceed concurrently, operations on the same user
/// serialize, and at most one wallet lock is ever held at a time.
#[derive(Debug, Default)]
pub struct Ledger {
    accounts: RwLock<HashMap<String, Arc<Mutex<UserAccount>>>>,
}

impl Ledger {
    pub fn new() -> Self {
        Ledger::default()
    }

    /// Resolve (or lazily create) the account handle for a user.
    fn account(&self, user_id: &str) -> Arc<Mutex<UserAccount>> {
        {
            let accounts = self.accounts.read().unwrap();
            if let Some(account) = accounts.get(user_id) {
                return Arc::clone(account);
            }
        }
        let mut accounts = self.accounts.write().unwrap();
        let account = accounts
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(UserAccount::new(user_id))));
        Arc::clone(account)
    }

    /// Current wallet for a user, created with a zero balance if absent.
    /// Never fails.
    pub fn get_wallet(&self, user_id: &str) -> Wallet {
        let account = self.account(user_id);
        let account = account.lock().unwrap();
        account.wallet.clone()
    }

    /// Credit a wallet and append the matching `topup` record.
    ///
    /// A zero amount is permitted and records a zero-magnitude topup; a
    /// `Money` cannot be negative, so the operation cannot fail.
    pub fn credit(
        &self,
        user_id: &str,
        amount: Money,
        source: Option<&str>,
        metadata: Option<Map<String, Value>>,
    ) -> Transaction {
        let account = self.account(user_id);
        let mut account = account.lock().unwrap();

        let balance = account.wallet.balance.plus(amount);
        account.wallet.balance = balance;

        let transaction = Transaction::new(
            user_id,
            TransactionKind::Topup,
            amount,
            balance,
            merge_metadata("source", source, metadata),
        );
        account.transactions.push(transaction.clone());
        transaction
    }

    /// Debit a wallet and append the matching `spend` record.
    ///
    /// The amount must be strictly positive. When the balance is too low the
    /// call fails with [`PaymentError::InsufficientFunds`] and leaves the
    /// wallet and its history untouched; there is no partial effect.
    pub fn debit(
        &self,
        user_id: &str,
        amount: Money,
        reason: Option<&str>,
        metadata: Option<Map<String, Value>>,
    ) -> Result<Transaction, PaymentError> {
        if amount.is_zero() {
            return Err(PaymentError::InvalidAmount(
                "debit amount must be positive".to_string(),
            ));
        }

        let account = self.account(user_id);
        let mut account = account.lock().unwrap();

        let balance = account.wallet.balance.minus(amount).ok_or_else(|| {
            PaymentError::InsufficientFunds {
                required: amount,
                available: account.wallet.balance,
            }
        })?;
        account.wallet.balance = balance;

        let transaction = Transaction::new(
            user_id,
            TransactionKind::Spend,
            amount,
            balance,
            merge_metadata("reason", reason, metadata),
        );
        account.transactions.push(transaction.clone());
        Ok(transaction)
    }

    /// Transaction history for a user in insertion order, empty if the user
    /// has none. Read-only.
    pub fn list_transactions(&self, user_id: &str) -> Vec<Transaction> {
        let account = self.account(user_id);
        let account = account.lock().unwrap();
        account.transactions.clone()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::thread;

    fn money(value: &str) -> Money {
        Money::parse(value).unwrap()
    }

    #[test]
    fn test_wallet_created_lazily_with_zero_balance() {
        let ledger = Ledger::new();

        let wallet = ledger.get_wallet("u1");
        assert_eq!(wallet.user_id, "u1");
        assert_eq!(wallet.balance, Money::ZERO);
        assert_eq!(wallet.currency, CURRENCY);
        assert!(ledger.list_transactions("u1").is_empty());
    }

    #[test]
    fn test_topup_then_spend_flow() {
        let ledger = Ledger::new();

        let topup = ledger.credit("u1", money("100.00"), None, None);
        assert_eq!(topup.kind, TransactionKind::Topup);
        assert_eq!(topup.amount, money("100.00"));
        assert_eq!(topup.balance_after, money("100.00"));
        assert_eq!(ledger.get_wallet("u1").balance, money("100.00"));

        let spend = ledger
            .debit("u1", money("12.50"), Some("purchase"), None)
            .unwrap();
        assert_eq!(spend.kind, TransactionKind::Spend);
        assert_eq!(spend.amount, money("12.50"));
        assert_eq!(spend.balance_after, money("87.50"));
        assert_eq!(spend.metadata.get("reason"), Some(&json!("purchase")));
        assert_eq!(ledger.get_wallet("u1").balance, money("87.50"));

        let history = ledger.list_transactions("u1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, topup.id);
        assert_eq!(history[1].id, spend.id);
    }

    #[test]
    fn test_zero_credit_records_zero_magnitude_topup() {
        let ledger = Ledger::new();

        let transaction = ledger.credit("u1", Money::ZERO, Some("promo"), None);
        assert_eq!(transaction.amount, Money::ZERO);
        assert_eq!(transaction.balance_after, Money::ZERO);
        assert_eq!(ledger.list_transactions("u1").len(), 1);
    }

    #[test]
    fn test_zero_debit_is_rejected() {
        let ledger = Ledger::new();
        ledger.credit("u1", money("10.00"), None, None);

        let result = ledger.debit("u1", Money::ZERO, None, None);
        assert!(matches!(result, Err(PaymentError::InvalidAmount(_))));
        assert_eq!(ledger.list_transactions("u1").len(), 1);
    }

    #[test]
    fn test_metadata_merges_tag_with_caller_keys() {
        let ledger = Ledger::new();

        let mut extra = Map::new();
        extra.insert("item".to_string(), json!("skin"));
        let transaction = ledger.credit("u1", money("5.00"), Some("shop"), Some(extra));
        assert_eq!(transaction.metadata.get("source"), Some(&json!("shop")));
        assert_eq!(transaction.metadata.get("item"), Some(&json!("skin")));

        // Caller-supplied keys win over the system tag
        let mut clashing = Map::new();
        clashing.insert("source".to_string(), json!("override"));
        let transaction = ledger.credit("u1", money("5.00"), Some("shop"), Some(clashing));
        assert_eq!(transaction.metadata.get("source"), Some(&json!("override")));

        // No tag and no caller metadata still yields an (empty) map
        let transaction = ledger.credit("u1", money("5.00"), None, None);
        assert!(transaction.metadata.is_empty());
    }

    #[test]
    fn test_insufficient_funds_leaves_state_unchanged() {
        let ledger = Ledger::new();
        ledger.credit("u1", money("10.00"), None, None);

        let result = ledger.debit("u1", money("10.01"), None, None);
        match result {
            Err(PaymentError::InsufficientFunds {
                required,
                available,
            }) => {
                assert_eq!(required, money("10.01"));
                assert_eq!(available, money("10.00"));
            }
            other => panic!("expected InsufficientFunds, got {:?}", other),
        }

        assert_eq!(ledger.get_wallet("u1").balance, money("10.00"));
        assert_eq!(ledger.list_transactions("u1").len(), 1);
    }

    #[test]
    fn test_debit_of_entire_balance_succeeds() {
        let ledger = Ledger::new();
        ledger.credit("u1", money("10.00"), None, None);

        let spend = ledger.debit("u1", money("10.00"), None, None).unwrap();
        assert_eq!(spend.balance_after, Money::ZERO);
        assert_eq!(ledger.get_wallet("u1").balance, Money::ZERO);
    }

    #[test]
    fn test_replaying_history_reproduces_every_balance() {
        let ledger = Ledger::new();
        ledger.credit("u1", money("100.00"), None, None);
        ledger.debit("u1", money("12.50"), None, None).unwrap();
        ledger.credit("u1", money("0.05"), None, None);
        ledger.debit("u1", money("30.00"), None, None).unwrap();
        ledger.debit("u1", money("200.00"), None, None).unwrap_err();
        ledger.credit("u1", money("42.45"), None, None);

        let mut replayed = Money::ZERO;
        for transaction in ledger.list_transactions("u1") {
            replayed = match transaction.kind {
                TransactionKind::Topup => replayed.plus(transaction.amount),
                TransactionKind::Spend => replayed.minus(transaction.amount).unwrap(),
            };
            assert_eq!(replayed, transaction.balance_after);
        }
        assert_eq!(replayed, ledger.get_wallet("u1").balance);
        assert_eq!(replayed, Money::new(dec!(100.00)).unwrap());
    }

    #[test]
    fn test_concurrent_debits_exactly_one_succeeds() {
        // Balance covers exactly one of the two debits; the per-user lock
        // must make the loser observe the post-debit balance.
        let ledger = Arc::new(Ledger::new());
        ledger.credit("u1", money("50.00"), None, None);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || ledger.debit("u1", money("50.00"), None, None).is_ok())
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|&ok| ok)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(ledger.get_wallet("u1").balance, Money::ZERO);
        // One topup plus the single successful spend
        assert_eq!(ledger.list_transactions("u1").len(), 2);
    }

    #[test]
    fn test_users_are_isolated() {
        let ledger = Ledger::new();
        ledger.credit("u1", money("100.00"), None, None);
        ledger.credit("u2", money("7.00"), None, None);
        ledger.debit("u1", money("40.00"), None, None).unwrap();

        assert_eq!(ledger.get_wallet("u1").balance, money("60.00"));
        assert_eq!(ledger.get_wallet("u2").balance, money("7.00"));
        assert_eq!(ledger.list_transactions("u2").len(), 1);
    }

    #[test]
    fn test_transaction_serializes_with_lowercase_type() {
        let ledger = Ledger::new();
        let transaction = ledger.credit("u1", money("100.00"), Some("shop"), None);

        let value = serde_json::to_value(&transaction).unwrap();
        assert_eq!(value["type"], json!("topup"));
        assert_eq!(value["amount"], json!("100.00"));
        assert_eq!(value["balance_after"], json!("100.00"));
        assert_eq!(value["metadata"]["source"], json!("shop"));
        // RFC 3339 / ISO-8601 UTC timestamp
        assert!(value["created_at"].as_str().unwrap().ends_with('Z')
            || value["created_at"].as_str().unwrap().contains("+00:00"));
    }
}
