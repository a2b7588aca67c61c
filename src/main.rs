// Umbra Payments - CLI demo
// Runs a scripted scenario against a fresh in-memory core

use std::env;

use anyhow::{Context, Result};
use umbra_payments::{GachaEngine, Ledger, Money};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    // Explicit argv seed wins over the environment
    let seed = match args.get(1) {
        Some(raw) => Some(
            raw.parse::<u64>()
                .with_context(|| format!("seed '{}' is not an integer", raw))?,
        ),
        None => match env::var("GACHA_RANDOM_SEED") {
            Ok(raw) => Some(
                raw.parse::<u64>()
                    .context("GACHA_RANDOM_SEED must be an integer")?,
            ),
            Err(_) => None,
        },
    };

    run_demo(seed)
}

fn run_demo(seed: Option<u64>) -> Result<()> {
    println!("🎰 Umbra Payments - Demo Scenario");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    match seed {
        Some(seed) => println!("Random seed: {}", seed),
        None => println!("Random seed: entropy"),
    }

    let ledger = Ledger::new();
    let engine = GachaEngine::new(seed);
    let user_id = "demo-player";

    // 1. Fund the wallet
    let topup = ledger.credit(user_id, Money::parse("150.00")?, Some("demo"), None);
    println!("\n💳 Topped up {} {}", topup.amount, ledger.get_wallet(user_id).currency);

    // 2. A plain purchase
    let spend = ledger.debit(user_id, Money::parse("12.50")?, Some("purchase"), None)?;
    println!("🛒 Spent {} (balance {})", spend.amount, spend.balance_after);

    // 3. Draws from both pools
    for (pool_name, draws) in [("standard", 3), ("premium", 1)] {
        let outcome = engine.draw(&ledger, user_id, pool_name, draws, None)?;
        println!(
            "\n🎲 {} draw(s) from '{}' (balance {}):",
            outcome.draw_count, outcome.pool_name, outcome.remaining_balance
        );
        for item in &outcome.items {
            println!("   ✓ {} [{}]", item.name, item.rarity.as_str());
        }
    }

    // 4. Closing history
    println!("\n📒 Transaction history:");
    for transaction in ledger.list_transactions(user_id) {
        println!(
            "   {} {:>8} → balance {}",
            transaction.kind.as_str(),
            transaction.amount.to_string(),
            transaction.balance_after
        );
    }

    Ok(())
}
